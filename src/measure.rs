//! Computational basis measurement of a [`State`].
//!
//! Outcomes are per-site values, so a qutrit can read 0, 1 or 2. Sampling
//! draws from the caller's `Rng`, which makes seeded runs reproducible.
//!
//! # Overview
//!
//! - [`probs`] - probability distribution, optionally marginalized
//! - [`measure`] - sample outcomes without touching the state
//! - [`measure_and_collapse`] - sample one outcome and project onto it
//! - [`collapse_to`] - project onto a given outcome (post-selection)

use num_complex::Complex64;
use rand::Rng;

use crate::index::{iter_basis, linear_to_indices, mixed_radix_index};
use crate::state::State;

/// Probability of every basis state, marginalized onto `locs` when given.
///
/// If `locs` is `None`, returns `|amplitude|²` for every flat index.
/// If `locs` is `Some(&[...])`, returns the marginal distribution over the
/// values of those sites, indexed row-major in the order `locs` lists them.
///
/// # Example
/// ```
/// use yao_sim::{State, measure::probs};
///
/// let state = State::product_state(&[2, 2], &[1, 0]);
/// assert_eq!(probs(&state, Some(&[0])), vec![0.0, 1.0]);
///
/// // |+⟩ has 50% probability for |0⟩ and |1⟩
/// let h = num_complex::Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
/// let plus = State::new(vec![2], ndarray::array![h, h]);
/// let p = probs(&plus, None);
/// assert!((p[0] - 0.5).abs() < 1e-10);
/// assert!((p[1] - 0.5).abs() < 1e-10);
/// ```
pub fn probs(state: &State, locs: Option<&[usize]>) -> Vec<f64> {
    match locs {
        None => state.data.iter().map(|c| c.norm_sqr()).collect(),
        Some(locs) => marginal_probs(state, locs),
    }
}

/// Sum `|amplitude|²` over the sites not in `locs`.
fn marginal_probs(state: &State, locs: &[usize]) -> Vec<f64> {
    let marginal_dims: Vec<usize> = locs.iter().map(|&i| state.dims[i]).collect();
    let mut prob_vec = vec![0.0; marginal_dims.iter().product()];

    for (flat_idx, indices) in iter_basis(&state.dims) {
        let marginal: Vec<usize> = locs.iter().map(|&i| indices[i]).collect();
        prob_vec[mixed_radix_index(&marginal, &marginal_dims)] += state.data[flat_idx].norm_sqr();
    }
    prob_vec
}

/// Inverse-CDF sampling; rounding slack at the top goes to the last index.
fn sample_from_probs(probs: &[f64], rng: &mut impl Rng) -> usize {
    let r: f64 = rng.r#gen();
    let mut cumsum = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}

/// Sample `nshots` outcomes of the sites `locs` (all sites for `None`).
///
/// The state is left untouched, so every shot draws from the same
/// distribution.
///
/// # Arguments
/// * `state` - The quantum state to measure
/// * `locs` - Which sites to measure (`None` for all)
/// * `nshots` - Number of measurement samples
/// * `rng` - Random number generator
///
/// # Returns
/// One vector of site values per shot, in the order of `locs`.
///
/// # Example
/// ```
/// use rand::SeedableRng;
/// use yao_sim::{State, measure::measure};
///
/// let state = State::product_state(&[2, 3], &[1, 2]);
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// for shot in measure(&state, None, 5, &mut rng) {
///     assert_eq!(shot, vec![1, 2]);
/// }
/// ```
pub fn measure(
    state: &State,
    locs: Option<&[usize]>,
    nshots: usize,
    rng: &mut impl Rng,
) -> Vec<Vec<usize>> {
    let p = probs(state, locs);
    let dims: Vec<usize> = match locs {
        None => state.dims.clone(),
        Some(locs) => locs.iter().map(|&i| state.dims[i]).collect(),
    };

    (0..nshots)
        .map(|_| linear_to_indices(sample_from_probs(&p, rng), &dims))
        .collect()
}

/// Sample one outcome of `locs` and collapse the state onto it.
///
/// This modifies the state in-place, projecting it onto the measured values
/// and renormalizing.
///
/// # Arguments
/// * `state` - The quantum state to measure (modified in-place)
/// * `locs` - Which sites to measure (`None` for all)
/// * `rng` - Random number generator
///
/// # Returns
/// The measurement result as a vector of site values.
///
/// # Example
/// ```
/// use rand::SeedableRng;
/// use yao_sim::{State, measure::{measure_and_collapse, probs}};
///
/// // |+⟩ ⊗ |0⟩
/// let h = num_complex::Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
/// let zero = num_complex::Complex64::new(0.0, 0.0);
/// let mut state = State::new(vec![2, 2], ndarray::array![h, zero, h, zero]);
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(42);
/// let result = measure_and_collapse(&mut state, Some(&[0]), &mut rng);
///
/// // the state is now |00⟩ or |10⟩
/// assert!(result == vec![0] || result == vec![1]);
/// assert!((probs(&state, Some(&[0]))[result[0]] - 1.0).abs() < 1e-10);
/// ```
pub fn measure_and_collapse(
    state: &mut State,
    locs: Option<&[usize]>,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let locs_vec: Vec<usize> = match locs {
        None => (0..state.num_sites()).collect(),
        Some(l) => l.to_vec(),
    };
    let p = probs(state, Some(&locs_vec));
    let dims: Vec<usize> = locs_vec.iter().map(|&i| state.dims[i]).collect();
    let result = linear_to_indices(sample_from_probs(&p, rng), &dims);

    collapse_to(state, &locs_vec, &result);
    result
}

/// Collapse the state to a specific outcome (post-selection).
///
/// Zeroes every amplitude not matching `values` on `locs`, then renormalizes
/// what is left. An outcome with zero probability leaves the zero vector.
///
/// # Arguments
/// * `state` - The quantum state to collapse (modified in-place)
/// * `locs` - Which sites to fix
/// * `values` - The values to fix them to
///
/// # Panics
/// Panics if `locs` and `values` have different lengths.
///
/// # Example
/// ```
/// use yao_sim::{State, measure::{collapse_to, probs}};
///
/// // (|00⟩ + |11⟩)/√2
/// let h = num_complex::Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
/// let zero = num_complex::Complex64::new(0.0, 0.0);
/// let mut state = State::new(vec![2, 2], ndarray::array![h, zero, zero, h]);
///
/// collapse_to(&mut state, &[0], &[0]);
/// // the second qubit follows the first
/// assert!((probs(&state, None)[0] - 1.0).abs() < 1e-10);
/// ```
pub fn collapse_to(state: &mut State, locs: &[usize], values: &[usize]) {
    assert_eq!(locs.len(), values.len(), "locs and values must have the same length");

    let mut norm_sq = 0.0;
    for flat_idx in 0..state.total_dim() {
        let indices = linear_to_indices(flat_idx, &state.dims);
        let matches = locs
            .iter()
            .zip(values.iter())
            .all(|(&loc, &val)| indices[loc] == val);

        if matches {
            norm_sq += state.data[flat_idx].norm_sqr();
        } else {
            state.data[flat_idx] = Complex64::new(0.0, 0.0);
        }
    }

    let norm = norm_sq.sqrt();
    if norm > 1e-15 {
        state.data.mapv_inplace(|amp| amp / norm);
    }
}
