use ndarray::Axis;
use crate::solver::{Terms, Variable};

/// Coefficients of the k-th order forward difference, oldest sample first
///
/// # Arguments
///
/// * 'order' - difference order
fn stencil(order: usize) -> Vec<f64> {
    let mut coefficients = vec![1.0];
    for _ in 0..order {
        let mut next = vec![0.0; coefficients.len() + 1];
        for (j, c) in coefficients.iter().enumerate() {
            next[j] -= c;
            next[j + 1] += c;
        }
        coefficients = next;
    }
    coefficients
}

/// Returns one affine row per k-th order difference along a line of variable indices.
/// A line shorter than order + 1 has no differences.
///
/// # Arguments
///
/// * 'line' - variable indices in line order
/// * 'order' - difference order
pub fn diff(line: &[usize], order: usize) -> Vec<Terms> {
    if line.len() <= order {
        return Vec::new();
    }
    let coefficients = stencil(order);

    line.windows(order + 1)
        .map(|w| w.iter().copied().zip(coefficients.iter().copied()).collect::<Terms>())
        .collect()
}

/// Returns k-th order differences of a row-major 2-D variable along an axis,
/// like differencing each column (axis 0) or each row (axis 1) of the matrix
///
/// # Arguments
///
/// * 'var' - variable holding the matrix
/// * 'shape' - (rows, columns)
/// * 'order' - difference order
/// * 'axis' - axis to difference along
pub fn diff_2d(var: Variable, shape: (usize, usize), order: usize, axis: Axis) -> Vec<Terms> {
    let (rows, cols) = shape;
    let mut out = Vec::new();

    match axis.index() {
        0 => for c in 0..cols {
            let line = (0..rows).map(|r| var.at(r * cols + c)).collect::<Vec<usize>>();
            out.extend(diff(&line, order));
        },
        _ => for r in 0..rows {
            let line = (0..cols).map(|c| var.at(r * cols + c)).collect::<Vec<usize>>();
            out.extend(diff(&line, order));
        },
    }

    out
}

/// Returns the k-th order differences of a 1-D variable
///
/// # Arguments
///
/// * 'var' - the variable
/// * 'order' - difference order
pub fn diff_1d(var: Variable, order: usize) -> Vec<Terms> {
    diff(&var.indices(), order)
}
