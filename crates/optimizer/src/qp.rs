//! Convex quadratic subproblems.
//!
//! Solves `min ½ xᵀGx + cᵀx` subject to `aᵢ·x = bᵢ` and `aⱼ·x ≥ bⱼ` with the
//! Clarabel interior-point solver. Every row is handed over as
//! `-aₖ·x + s = -bₖ`, with `s` in the zero cone for equalities and the
//! nonnegative cone for inequalities, so the returned duals are the
//! multipliers of `∇(½xᵀGx + cᵀx) = Σ λₖ aₖ`.

use crate::error::SolverError;
use nalgebra::{DMatrix, DVector};

/// Entries below this magnitude are left out of the sparse matrices.
const SPARSITY: f64 = 1e-14;
const ACCURACY: f64 = 1e-10;
const MAX_ITERATIONS: u32 = 200;

/// One linear constraint row: `normal · x (= or ≥) bound`.
#[derive(Debug, Clone)]
pub(crate) struct LinearConstraint {
    pub normal: DVector<f64>,
    pub bound: f64,
}

impl LinearConstraint {
    pub fn new(normal: DVector<f64>, bound: f64) -> Self {
        Self { normal, bound }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct QpSolution {
    pub x: DVector<f64>,
    /// Lagrange multipliers, equalities first, then inequalities.
    pub multipliers: Vec<f64>,
}

pub(crate) fn solve(
    g: &DMatrix<f64>,
    c: &DVector<f64>,
    equalities: &[LinearConstraint],
    inequalities: &[LinearConstraint],
) -> Result<QpSolution, SolverError> {
    use clarabel::algebra::*;
    use clarabel::solver::*;
    use crate::error::SolverError;

    let n = c.len();
    if equalities.is_empty() && inequalities.is_empty() {
        let x = g.clone().cholesky().ok_or(SolverError::Singular)?.solve(&(-c));
        return Ok(QpSolution {
            x,
            multipliers: Vec::new(),
        });
    }

    // P: upper triangle of G, column by column (CSC format)
    let mut p_data = Vec::new();
    let mut p_indices = Vec::new();
    let mut p_indptr = vec![0];
    for j in 0..n {
        for i in 0..=j {
            let val = g[(i, j)];
            if i == j || val.abs() > SPARSITY {
                p_data.push(val);
                p_indices.push(i);
            }
        }
        p_indptr.push(p_data.len());
    }
    let p = CscMatrix::new(n, n, p_indptr, p_indices, p_data);

    // A: equality rows first, then inequality rows, each negated
    let rows: Vec<&LinearConstraint> = equalities.iter().chain(inequalities).collect();
    let mut a_data = Vec::new();
    let mut a_indices = Vec::new();
    let mut a_indptr = vec![0];
    for j in 0..n {
        for (i, row) in rows.iter().enumerate() {
            let val = row.normal[j];
            if val.abs() > SPARSITY {
                a_data.push(-val);
                a_indices.push(i);
            }
        }
        a_indptr.push(a_data.len());
    }
    let a = CscMatrix::new(rows.len(), n, a_indptr, a_indices, a_data);
    let b: Vec<f64> = rows.iter().map(|row| -row.bound).collect();

    let mut cones = Vec::with_capacity(2);
    if !equalities.is_empty() {
        cones.push(ZeroConeT(equalities.len()));
    }
    if !inequalities.is_empty() {
        cones.push(NonnegativeConeT(inequalities.len()));
    }

    let settings = DefaultSettingsBuilder::default()
        .max_iter(MAX_ITERATIONS)
        .tol_gap_abs(ACCURACY)
        .tol_gap_rel(ACCURACY)
        .tol_feas(ACCURACY)
        .verbose(false)
        .build()
        .map_err(|e| SolverError::Subproblem(format!("invalid settings: {}", e)))?;

    let mut solver = DefaultSolver::new(&p, c.as_slice(), &a, &b, &cones, settings)
        .map_err(|e| SolverError::Subproblem(format!("{:?}", e)))?;
    solver.solve();

    match solver.solution.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => Ok(QpSolution {
            x: DVector::from_column_slice(&solver.solution.x),
            multipliers: solver.solution.z.clone(),
        }),
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => Err(SolverError::Infeasible(
            "linearized constraints have no common solution".to_string(),
        )),
        SolverStatus::NumericalError | SolverStatus::InsufficientProgress => Err(SolverError::Singular),
        status => Err(SolverError::Subproblem(format!("{:?}", status))),
    }
}
