//! Sequential quadratic programming for small, box-bounded problems.
//!
//! Each iteration linearizes the constraints around the current point and
//! solves a quadratic model of the Lagrangian with [`crate::qp`]. Gradients are
//! forward differences, the Hessian is a damped BFGS approximation and steps
//! are accepted by backtracking on an L1 merit function.

use crate::error::SolverError;
use crate::qp::{self, LinearConstraint};
use nalgebra::{DMatrix, DVector};

/// Forward-difference step, `sqrt(f64::EPSILON)`.
const DIFF_STEP: f64 = 1.490_116_119_384_765_6e-8;
const MAX_BACKTRACKS: usize = 20;
const ARMIJO: f64 = 0.1;
const CURVATURE_EPS: f64 = 1e-12;

pub type ScalarFn<'a> = Box<dyn Fn(&[f64]) -> f64 + 'a>;

/// `min f(x)` subject to `g_i(x) = 0`, `h_j(x) ≥ 0` and `lower ≤ x_k ≤ upper`.
pub struct Problem<'a> {
    objective: ScalarFn<'a>,
    equalities: Vec<ScalarFn<'a>>,
    inequalities: Vec<ScalarFn<'a>>,
    lower: f64,
    upper: f64,
}

impl<'a> Problem<'a> {
    pub fn new(objective: impl Fn(&[f64]) -> f64 + 'a, lower: f64, upper: f64) -> Self {
        Self {
            objective: Box::new(objective),
            equalities: Vec::new(),
            inequalities: Vec::new(),
            lower,
            upper,
        }
    }

    /// Adds `g(x) = 0`.
    pub fn equality(mut self, g: impl Fn(&[f64]) -> f64 + 'a) -> Self {
        self.equalities.push(Box::new(g));
        self
    }

    /// Adds `h(x) ≥ 0`.
    pub fn inequality(mut self, h: impl Fn(&[f64]) -> f64 + 'a) -> Self {
        self.inequalities.push(Box::new(h));
        self
    }

    pub fn constraint_count(&self) -> usize {
        self.equalities.len() + self.inequalities.len()
    }

    fn clamp(&self, x: &mut [f64]) {
        for v in x.iter_mut() {
            *v = v.clamp(self.lower, self.upper);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Convergence threshold on objective change, step length and constraint violation.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

impl SolverSettings {
    /// Default settings with an optional tolerance override.
    pub fn with_tolerance(tolerance: Option<f64>) -> Self {
        let mut settings = Self::default();
        if let Some(tol) = tolerance {
            settings.tolerance = tol;
        }
        settings
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub x: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

/// Function values and first derivatives at one point.
struct Point {
    x: Vec<f64>,
    f: f64,
    grad: DVector<f64>,
    eq: Vec<f64>,
    eq_jac: Vec<DVector<f64>>,
    ineq: Vec<f64>,
    ineq_jac: Vec<DVector<f64>>,
}

impl Point {
    fn evaluate(problem: &Problem<'_>, x: Vec<f64>) -> Result<Self, SolverError> {
        let (f, grad) = value_and_gradient(&problem.objective, &x, "objective")?;

        let mut eq = Vec::with_capacity(problem.equalities.len());
        let mut eq_jac = Vec::with_capacity(problem.equalities.len());
        for g in &problem.equalities {
            let (v, d) = value_and_gradient(g, &x, "equality constraint")?;
            eq.push(v);
            eq_jac.push(d);
        }

        let mut ineq = Vec::with_capacity(problem.inequalities.len());
        let mut ineq_jac = Vec::with_capacity(problem.inequalities.len());
        for h in &problem.inequalities {
            let (v, d) = value_and_gradient(h, &x, "inequality constraint")?;
            ineq.push(v);
            ineq_jac.push(d);
        }

        Ok(Self {
            x,
            f,
            grad,
            eq,
            eq_jac,
            ineq,
            ineq_jac,
        })
    }

    fn violation(&self) -> f64 {
        violation(&self.eq, &self.ineq)
    }

    /// Gradient of `f - Σ λ_i c_i(x)`.
    fn lagrangian_gradient(&self, multipliers: &[f64]) -> DVector<f64> {
        let mut g = self.grad.clone();
        for (lambda, jac) in multipliers.iter().zip(self.eq_jac.iter().chain(&self.ineq_jac)) {
            g -= jac * *lambda;
        }
        g
    }
}

fn value_and_gradient(
    fun: &ScalarFn<'_>,
    x: &[f64],
    what: &str,
) -> Result<(f64, DVector<f64>), SolverError> {
    let f0 = fun(x);
    if !f0.is_finite() {
        return Err(SolverError::NonFinite(what.to_string()));
    }
    let mut shifted = x.to_vec();
    let mut grad = DVector::zeros(x.len());
    for i in 0..x.len() {
        shifted[i] = x[i] + DIFF_STEP;
        let g = (fun(&shifted) - f0) / DIFF_STEP;
        shifted[i] = x[i];
        if !g.is_finite() {
            return Err(SolverError::NonFinite(format!("{} gradient", what)));
        }
        grad[i] = g;
    }
    Ok((f0, grad))
}

fn violation(eq: &[f64], ineq: &[f64]) -> f64 {
    eq.iter().map(|c| c.abs()).sum::<f64>() + ineq.iter().map(|c| (-c).max(0.0)).sum::<f64>()
}

/// L1 merit with one penalty weight per constraint (equalities first).
fn merit(f: f64, eq: &[f64], ineq: &[f64], penalties: &[f64]) -> f64 {
    let (pe, pi) = penalties.split_at(eq.len());
    f + eq.iter().zip(pe).map(|(c, mu)| mu * c.abs()).sum::<f64>()
        + ineq.iter().zip(pi).map(|(c, mu)| mu * (-c).max(0.0)).sum::<f64>()
}

/// Linearized constraints of the QP subproblem in the step `d`.
fn subproblem_constraints(
    problem: &Problem<'_>,
    point: &Point,
) -> (Vec<LinearConstraint>, Vec<LinearConstraint>) {
    let n = point.x.len();
    let equalities = point
        .eq
        .iter()
        .zip(&point.eq_jac)
        .map(|(c, jac)| LinearConstraint::new(jac.clone(), -c))
        .collect();

    let mut inequalities: Vec<LinearConstraint> = point
        .ineq
        .iter()
        .zip(&point.ineq_jac)
        .map(|(c, jac)| LinearConstraint::new(jac.clone(), -c))
        .collect();

    for (k, xk) in point.x.iter().enumerate() {
        let mut unit = DVector::zeros(n);
        unit[k] = 1.0;
        inequalities.push(LinearConstraint::new(unit.clone(), problem.lower - xk));
        inequalities.push(LinearConstraint::new(-unit, xk - problem.upper));
    }

    (equalities, inequalities)
}

/// Powell-damped BFGS update, keeping `b` positive definite.
fn bfgs_update(b: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
    let bs = &*b * s;
    let s_bs = s.dot(&bs);
    if s_bs <= CURVATURE_EPS {
        return;
    }
    let mut y = y.clone();
    let mut sy = s.dot(&y);
    if sy < 0.2 * s_bs {
        let theta = 0.8 * s_bs / (s_bs - sy);
        y = &y * theta + &bs * (1.0 - theta);
        sy = s.dot(&y);
    }
    if sy <= CURVATURE_EPS {
        return;
    }
    *b += (&y * y.transpose()) / sy - (&bs * bs.transpose()) / s_bs;
}

/// Minimizes `problem` starting from `x0`.
pub fn minimize(
    problem: &Problem<'_>,
    x0: &[f64],
    settings: &SolverSettings,
) -> Result<Solution, SolverError> {
    let n = x0.len();
    if n == 0 {
        return Err(SolverError::Empty);
    }
    let tol = settings.tolerance;

    let mut start = x0.to_vec();
    problem.clamp(&mut start);
    let mut point = Point::evaluate(problem, start)?;
    let mut hessian = DMatrix::identity(n, n);
    let mut penalties = vec![0.0; problem.constraint_count()];

    for iteration in 1..=settings.max_iterations {
        let (equalities, inequalities) = subproblem_constraints(problem, &point);
        let step = match qp::solve(&hessian, &point.grad, &equalities, &inequalities) {
            Err(SolverError::Singular) => {
                tracing::debug!(iteration, "Resetting Hessian approximation.");
                hessian = DMatrix::identity(n, n);
                qp::solve(&hessian, &point.grad, &equalities, &inequalities)?
            }
            other => other?,
        };
        let d = step.x;
        // Bound multipliers only enter the QP; the Lagrangian uses the nonlinear ones.
        let multipliers = &step.multipliers[..problem.constraint_count()];

        for (mu, lambda) in penalties.iter_mut().zip(multipliers) {
            *mu = lambda.abs().max(0.5 * (*mu + lambda.abs()));
        }

        let phi0 = merit(point.f, &point.eq, &point.ineq, &penalties);
        let infeasibility = phi0 - point.f;
        let slope = (point.grad.dot(&d) - infeasibility).min(0.0);

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let mut trial: Vec<f64> = point.x.iter().zip(d.iter()).map(|(x, d)| x + alpha * d).collect();
            problem.clamp(&mut trial);

            let f = (problem.objective)(&trial);
            let eq: Vec<f64> = problem.equalities.iter().map(|g| g(&trial)).collect();
            let ineq: Vec<f64> = problem.inequalities.iter().map(|h| h(&trial)).collect();
            let phi = merit(f, &eq, &ineq, &penalties);

            if phi.is_finite() && phi <= phi0 + ARMIJO * alpha * slope {
                accepted = Some(trial);
                break;
            }
            alpha *= 0.5;
        }

        let Some(trial) = accepted else {
            // No descent left at a feasible point: the model has nothing more to offer.
            if point.violation() < tol && point.grad.dot(&d).abs() < tol {
                return Ok(Solution {
                    x: point.x,
                    objective: point.f,
                    iterations: iteration,
                });
            }
            return Err(SolverError::LineSearch(iteration));
        };

        let next = Point::evaluate(problem, trial)?;
        let step_norm = next
            .x
            .iter()
            .zip(&point.x)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();

        if ((next.f - point.f).abs() < tol || step_norm < tol) && next.violation() < tol {
            tracing::debug!(iteration, objective = next.f, "SQP converged.");
            return Ok(Solution {
                x: next.x,
                objective: next.f,
                iterations: iteration,
            });
        }

        let s = DVector::from_iterator(n, next.x.iter().zip(&point.x).map(|(a, b)| a - b));
        let y = next.lagrangian_gradient(multipliers) - point.lagrangian_gradient(multipliers);
        bfgs_update(&mut hessian, &s, &y);

        point = next;
    }

    Err(SolverError::IterationLimit(settings.max_iterations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tight() -> SolverSettings {
        SolverSettings::with_tolerance(Some(1e-8))
    }

    #[test]
    fn test_unconstrained_quadratic() {
        let problem = Problem::new(|x| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2), -10.0, 10.0);
        let sol = minimize(&problem, &[0.0, 0.0], &tight()).unwrap();
        assert_relative_eq!(sol.x[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(sol.x[1], 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_two_asset_minimum_variance_matches_closed_form() {
        let (s11, s22, s12) = (0.04, 0.09, 0.01);
        let problem = Problem::new(
            move |w| s11 * w[0] * w[0] + s22 * w[1] * w[1] + 2.0 * s12 * w[0] * w[1],
            0.0,
            1.0,
        )
        .equality(|w| w[0] + w[1] - 1.0);

        let sol = minimize(&problem, &[0.5, 0.5], &tight()).unwrap();
        let expected = (s22 - s12) / (s11 + s22 - 2.0 * s12);
        assert_relative_eq!(sol.x[0], expected, epsilon = 1e-4);
        assert_relative_eq!(sol.x[0] + sol.x[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_linear_objective_stops_at_upper_bound() {
        let problem = Problem::new(|w| -(w[0] + 2.0 * w[1]), 0.0, 0.7).equality(|w| w[0] + w[1] - 1.0);
        let sol = minimize(&problem, &[0.5, 0.5], &SolverSettings::default()).unwrap();
        assert_relative_eq!(sol.x[1], 0.7, epsilon = 1e-6);
        assert_relative_eq!(sol.x[0], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_nonlinear_inequality_is_respected() {
        // Closest point to the origin with x0 * x1 >= 1, x in [0, 5].
        let problem = Problem::new(|x| x[0] * x[0] + x[1] * x[1], 0.0, 5.0).inequality(|x| x[0] * x[1] - 1.0);
        let sol = minimize(&problem, &[2.0, 3.0], &tight()).unwrap();
        assert_relative_eq!(sol.x[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(sol.x[1], 1.0, epsilon = 1e-4);
        assert!(sol.x[0] * sol.x[1] >= 1.0 - 1e-6);
    }

    #[test]
    fn test_budget_outside_bounds_is_infeasible() {
        let problem = Problem::new(|w| w[0] * w[0] + w[1] * w[1], 0.0, 0.3).equality(|w| w[0] + w[1] - 1.0);
        let result = minimize(&problem, &[0.5, 0.5], &SolverSettings::default());
        assert!(matches!(result, Err(SolverError::Infeasible(_))));
    }

    #[test]
    fn test_nan_objective_is_reported() {
        let problem = Problem::new(|_| f64::NAN, 0.0, 1.0);
        let result = minimize(&problem, &[0.5], &SolverSettings::default());
        assert!(matches!(result, Err(SolverError::NonFinite(_))));
    }

    #[test]
    fn test_empty_problem_is_rejected() {
        let problem = Problem::new(|_| 0.0, 0.0, 1.0);
        assert_eq!(minimize(&problem, &[], &SolverSettings::default()), Err(SolverError::Empty));
    }
}
