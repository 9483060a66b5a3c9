//! Amplitude kernels used by the state-vector representation.
//!
//! Gates are applied in place by gathering the amplitudes that differ only on
//! the target sites and multiplying that small block by the gate matrix.

use std::ops::IndexMut;

use ndarray::Array2;
use num_complex::Complex64;

use crate::index::{iter_basis, iter_basis_fixed, strides};
use crate::state::State;

/// Apply a d x d matrix to the d amplitudes at `indices`.
///
/// # Example
/// ```
/// use ndarray::array;
/// use num_complex::Complex64;
/// use yao_sim::instruct::udrows;
///
/// let zero = Complex64::new(0.0, 0.0);
/// let one = Complex64::new(1.0, 0.0);
/// let mut amps = vec![one, zero];
/// udrows(&mut amps[..], &[0, 1], &array![[zero, one], [one, zero]]);
/// assert_eq!(amps, vec![zero, one]);
/// ```
pub fn udrows<S>(state: &mut S, indices: &[usize], gate: &Array2<Complex64>)
where
    S: IndexMut<usize, Output = Complex64> + ?Sized,
{
    debug_assert_eq!(gate.nrows(), indices.len());
    debug_assert_eq!(gate.ncols(), indices.len());

    let old_amps: Vec<Complex64> = indices.iter().map(|&idx| state[idx]).collect();
    for (i, &out_idx) in indices.iter().enumerate() {
        state[out_idx] = old_amps
            .iter()
            .enumerate()
            .map(|(j, &amp)| gate[[i, j]] * amp)
            .sum();
    }
}

/// Apply `matrix` on `target_locs`, conditioned on `control_locs` holding
/// `control_configs` (`true` means |1>).
///
/// `matrix` is expressed in the row-major basis of `target_locs` in the
/// order given, so `[1, 0]` applies a two-site gate with its sites swapped.
///
/// # Example
/// ```
/// use yao_sim::{Gate, State};
/// use yao_sim::instruct::instruct_controlled;
///
/// // CNOT on |10> gives |11>
/// let mut state = State::product_state(&[2, 2], &[1, 0]);
/// instruct_controlled(&mut state, &Gate::X.matrix(2).unwrap(), &[1], &[0], &[true]);
/// assert!((state.data[3].norm() - 1.0).abs() < 1e-12);
/// ```
pub fn instruct_controlled(
    state: &mut State,
    matrix: &Array2<Complex64>,
    target_locs: &[usize],
    control_locs: &[usize],
    control_configs: &[bool],
) {
    debug_assert_eq!(control_locs.len(), control_configs.len());

    let site_strides = strides(&state.dims);
    let target_dims: Vec<usize> = target_locs.iter().map(|&loc| state.dims[loc]).collect();
    let offsets: Vec<usize> = iter_basis(&target_dims)
        .map(|(_, values)| {
            values
                .iter()
                .zip(target_locs.iter())
                .map(|(&v, &loc)| v * site_strides[loc])
                .sum()
        })
        .collect();
    debug_assert_eq!(offsets.len(), matrix.nrows());

    let fixed_locs: Vec<usize> = target_locs.iter().chain(control_locs.iter()).copied().collect();
    let fixed_vals: Vec<usize> = std::iter::repeat(0)
        .take(target_locs.len())
        .chain(control_configs.iter().map(|&c| usize::from(c)))
        .collect();
    let bases: Vec<usize> = iter_basis_fixed(&state.dims, &fixed_locs, &fixed_vals).collect();

    if is_diagonal(matrix) {
        let phases: Vec<Complex64> = (0..offsets.len()).map(|k| matrix[[k, k]]).collect();
        for base in bases {
            for (offset, phase) in offsets.iter().zip(phases.iter()) {
                state.data[base + offset] *= *phase;
            }
        }
        return;
    }

    let mut indices = vec![0usize; offsets.len()];
    for base in bases {
        for (slot, offset) in indices.iter_mut().zip(offsets.iter()) {
            *slot = base + offset;
        }
        udrows(&mut state.data, &indices, matrix);
    }
}

fn is_diagonal(matrix: &Array2<Complex64>) -> bool {
    matrix
        .indexed_iter()
        .all(|((i, j), v)| i == j || v.norm_sqr() == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::Gate;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    #[test]
    fn test_hadamard_beside_qutrit() {
        // dims [2, 3]: H acts on the qubit, the qutrit stays at 2
        let mut state = State::product_state(&[2, 3], &[0, 2]);
        instruct_controlled(&mut state, &Gate::H.matrix(2).unwrap(), &[0], &[], &[]);
        let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
        assert!(approx_eq(state.data[2], s));
        assert!(approx_eq(state.data[5], s));
    }

    #[test]
    fn test_inactive_control_is_identity() {
        let mut state = State::product_state(&[2, 2], &[0, 0]);
        instruct_controlled(&mut state, &Gate::X.matrix(2).unwrap(), &[1], &[0], &[true]);
        assert!(approx_eq(state.data[0], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_reversed_target_order_for_two_site_gate() {
        // CNOT matrix with control as first target site, applied as [1, 0]
        let zero = Complex64::new(0.0, 0.0);
        let one = Complex64::new(1.0, 0.0);
        let mut cnot = Array2::from_elem((4, 4), zero);
        cnot[[0, 0]] = one;
        cnot[[1, 1]] = one;
        cnot[[2, 3]] = one;
        cnot[[3, 2]] = one;
        // |01>: site 1 is the control here
        let mut state = State::product_state(&[2, 2], &[0, 1]);
        instruct_controlled(&mut state, &cnot, &[1, 0], &[], &[]);
        assert!(approx_eq(state.data[3], one));
    }

    #[test]
    fn test_diagonal_path_applies_phase() {
        let mut state = State::product_state(&[2], &[1]);
        instruct_controlled(&mut state, &Gate::Z.matrix(2).unwrap(), &[0], &[], &[]);
        assert!(approx_eq(state.data[1], Complex64::new(-1.0, 0.0)));
    }
}
