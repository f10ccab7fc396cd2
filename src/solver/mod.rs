use clarabel::algebra::CscMatrix;
use clarabel::solver::*;
use log::{debug, warn};
use crate::config::SolverParameters;

pub mod errors;
pub mod expressions;

pub use errors::SolveError;

/// Sparse affine row, pairs of (variable index, coefficient)
pub type Terms = Vec<(usize, f64)>;

/// A contiguous block of scalar variables in a problem
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Variable {
    offset: usize,
    len: usize,
}

impl Variable {
    /// Problem-wide index of the i:th element
    pub fn at(&self, i: usize) -> usize {
        self.offset + i
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Problem-wide indices of all elements
    pub fn indices(&self) -> Vec<usize> {
        (self.offset..self.offset + self.len).collect()
    }
}

/// Problem dimensions, mostly for logging
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProblemSize {
    pub variables: usize,
    pub equalities: usize,
    pub inequalities: usize,
    pub cones: usize,
}

/// Optimal point of a solved problem
#[derive(Debug, Clone)]
pub struct Solution {
    pub x: Vec<f64>,
    pub objective: f64,
    pub status: String,
}

impl Solution {
    /// Values of a variable at the optimum
    ///
    /// # Arguments
    ///
    /// * 'var' - the variable to read
    pub fn value(&self, var: Variable) -> Vec<f64> {
        self.x[var.offset..var.offset + var.len].to_vec()
    }
}

/// Convex program under construction.
///
/// Cost atoms are lowered to conic form as they are added: squared norms
/// become a diagonal quadratic over auxiliary variables, absolute values and
/// pinball losses become epigraph variables with linear rows, and 2-norms
/// become second-order cones. Constraint rows follow the `A x + s = b`
/// convention with `s` in the zero cone for equalities and in the
/// non-negative cone for `A x <= b`.
#[derive(Debug, Default)]
pub struct ConvexProblem {
    num_vars: usize,
    quadratic: Vec<(usize, f64)>,
    linear: Vec<f64>,
    equalities: Vec<(Terms, f64)>,
    inequalities: Vec<(Terms, f64)>,
    cones: Vec<Vec<(Terms, f64)>>,
}

impl ConvexProblem {
    pub fn new() -> ConvexProblem {
        ConvexProblem::default()
    }

    /// Adds a block of free scalar variables
    ///
    /// # Arguments
    ///
    /// * 'len' - number of scalars
    pub fn variable(&mut self, len: usize) -> Variable {
        let var = Variable { offset: self.num_vars, len };
        self.num_vars += len;
        self.linear.resize(self.num_vars, 0.0);
        var
    }

    /// Adds `coefficient * x[index]` to the cost
    pub fn add_linear(&mut self, index: usize, coefficient: f64) {
        self.linear[index] += coefficient;
    }

    /// Adds the constraint `terms . x == rhs`
    pub fn equal(&mut self, terms: Terms, rhs: f64) {
        self.equalities.push((terms, rhs));
    }

    /// Adds the constraint `terms . x <= rhs`
    pub fn less_equal(&mut self, terms: Terms, rhs: f64) {
        self.inequalities.push((terms, rhs));
    }

    /// Constrains every element of a variable to be non-negative
    pub fn non_negative(&mut self, var: Variable) {
        (0..var.len).for_each(|i| self.less_equal(vec![(var.at(i), -1.0)], 0.0));
    }

    /// Adds `weight * sum(row^2)` to the cost
    ///
    /// # Arguments
    ///
    /// * 'weight' - non-negative weight
    /// * 'rows' - affine rows, squared and summed
    pub fn sum_squares(&mut self, weight: f64, rows: Vec<Terms>) {
        if rows.is_empty() {
            return;
        }
        let z = self.variable(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            row.push((z.at(i), -1.0));
            self.equal(row, 0.0);
            // 1/2 x'Px convention
            self.quadratic.push((z.at(i), 2.0 * weight));
        }
    }

    /// Adds `weight * sum(|w_i * row_i|)` to the cost
    ///
    /// # Arguments
    ///
    /// * 'weight' - non-negative weight
    /// * 'rows' - affine rows
    /// * 'row_weights' - optional non-negative per-row weights, all ones if None
    pub fn norm1(&mut self, weight: f64, rows: Vec<Terms>, row_weights: Option<&[f64]>) {
        if rows.is_empty() {
            return;
        }
        let t = self.variable(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            // |w * row| == w * |row| for w >= 0, which keeps large weights out of the constraint matrix
            let w = row_weights.map_or(1.0, |w| w[i]);
            let mut lower = row.iter().map(|&(j, c)| (j, -c)).collect::<Terms>();
            let mut upper = row;
            upper.push((t.at(i), -1.0));
            lower.push((t.at(i), -1.0));
            self.less_equal(upper, 0.0);
            self.less_equal(lower, 0.0);
            self.add_linear(t.at(i), weight * w);
        }
    }

    /// Adds `weight * ||rows||_2` to the cost
    ///
    /// # Arguments
    ///
    /// * 'weight' - non-negative weight
    /// * 'rows' - affine rows forming the vector
    pub fn norm2(&mut self, weight: f64, rows: Vec<Terms>) {
        if rows.is_empty() {
            return;
        }
        let t = self.variable(1);
        let mut cone = Vec::with_capacity(rows.len() + 1);
        // s = b - A x = (t, rows)
        cone.push((vec![(t.at(0), -1.0)], 0.0));
        for row in rows {
            cone.push((row.into_iter().map(|(j, c)| (j, -c)).collect(), 0.0));
        }
        self.cones.push(cone);
        self.add_linear(t.at(0), weight);
    }

    /// Adds `weight * sum(tau * pos(row) + (1 - tau) * neg(row))` to the cost
    ///
    /// # Arguments
    ///
    /// * 'weight' - non-negative weight
    /// * 'tau' - quantile in (0, 1)
    /// * 'rows' - affine rows
    pub fn pinball(&mut self, weight: f64, tau: f64, rows: Vec<Terms>) {
        if rows.is_empty() {
            return;
        }
        let pos = self.variable(rows.len());
        let neg = self.variable(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            row.push((pos.at(i), -1.0));
            row.push((neg.at(i), 1.0));
            self.equal(row, 0.0);
            self.add_linear(pos.at(i), weight * tau);
            self.add_linear(neg.at(i), weight * (1.0 - tau));
        }
        self.non_negative(pos);
        self.non_negative(neg);
    }

    pub fn size(&self) -> ProblemSize {
        ProblemSize {
            variables: self.num_vars,
            equalities: self.equalities.len(),
            inequalities: self.inequalities.len(),
            cones: self.cones.len(),
        }
    }

    /// Solves the problem, blocking until the solver returns
    ///
    /// # Arguments
    ///
    /// * 'params' - solver settings
    pub fn solve(&self, params: &SolverParameters) -> Result<Solution, SolveError> {
        let n = self.num_vars;

        let p_triplets = self.quadratic.iter()
            .map(|&(i, v)| (i, i, v))
            .collect::<Vec<(usize, usize, f64)>>();
        let p = to_csc(n, n, p_triplets);

        let mut a_triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut b: Vec<f64> = Vec::new();
        let mut cones = Vec::new();

        let mut push_rows = |rows: &[(Terms, f64)]| {
            for (terms, rhs) in rows {
                let r = b.len();
                terms.iter().for_each(|&(j, c)| a_triplets.push((r, j, c)));
                b.push(*rhs);
            }
        };

        if !self.equalities.is_empty() {
            push_rows(self.equalities.as_slice());
            cones.push(ZeroConeT(self.equalities.len()));
        }
        if !self.inequalities.is_empty() {
            push_rows(self.inequalities.as_slice());
            cones.push(NonnegativeConeT(self.inequalities.len()));
        }
        for cone in self.cones.iter() {
            push_rows(cone.as_slice());
            cones.push(SecondOrderConeT(cone.len()));
        }

        let a = to_csc(b.len(), n, a_triplets);

        let settings = DefaultSettings::<f64> {
            max_iter: params.max_iter,
            time_limit: params.time_limit,
            tol_gap_abs: params.tol_gap_abs,
            tol_gap_rel: params.tol_gap_rel,
            tol_feas: params.tol_feas,
            verbose: params.verbose,
            ..DefaultSettings::default()
        };

        debug!("solving problem: {:?}", self.size());
        let mut solver = DefaultSolver::new(&p, &self.linear, &a, &b, &cones, settings);
        solver.solve();

        let status = format!("{:?}", solver.solution.status);
        match solver.solution.status {
            SolverStatus::Solved => (),
            SolverStatus::AlmostSolved => warn!("solver reached reduced accuracy only: {}", status),
            _ => return Err(SolveError { status }),
        }

        Ok(Solution {
            x: solver.solution.x.clone(),
            objective: solver.solution.obj_val,
            status,
        })
    }
}

/// Builds a compressed sparse column matrix from triplets, summing duplicates
///
/// # Arguments
///
/// * 'm' - number of rows
/// * 'n' - number of columns
/// * 'triplets' - (row, column, value)
fn to_csc(m: usize, n: usize, mut triplets: Vec<(usize, usize, f64)>) -> CscMatrix<f64> {
    triplets.retain(|t| t.2 != 0.0);
    triplets.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));

    let mut colptr = vec![0usize; n + 1];
    let mut rowval: Vec<usize> = Vec::with_capacity(triplets.len());
    let mut nzval: Vec<f64> = Vec::with_capacity(triplets.len());
    let mut last: Option<(usize, usize)> = None;

    for (r, c, v) in triplets {
        if last == Some((r, c)) {
            if let Some(prev) = nzval.last_mut() {
                *prev += v;
            }
            continue;
        }
        rowval.push(r);
        nzval.push(v);
        colptr[c + 1] += 1;
        last = Some((r, c));
    }
    for c in 0..n {
        colptr[c + 1] += colptr[c];
    }

    CscMatrix::new(m, n, colptr, rowval, nzval)
}
