//! Mixed-radix indexing over site dimensions.
//!
//! A state on sites with dimensions `dims` is stored as a flat vector in
//! row-major order: the last site varies fastest. Sites may have different
//! dimensions, so a flat index is a number in a mixed radix whose digits are
//! the per-site values.

/// Row-major stride of every site.
///
/// `strides(dims)[i]` is the product of the dimensions after site `i`, i.e.
/// how far the flat index moves when site `i` goes up by one. The last site
/// always has stride 1.
///
/// # Example
/// ```
/// use yao_sim::index::strides;
/// // qubit-qutrit-qubit: [3×2, 2, 1]
/// assert_eq!(strides(&[2, 3, 2]), vec![6, 2, 1]);
/// ```
pub fn strides(dims: &[usize]) -> Vec<usize> {
    let mut out = vec![1usize; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        out[i] = out[i + 1] * dims[i + 1];
    }
    out
}

/// Convert per-site values to a flat index.
///
/// The index is computed as:
/// index = indices[0]*d_1*d_2*... + indices[1]*d_2*... + ... + indices[n-1]
///
/// # Arguments
/// * `indices` - Value held by each site, `indices[i] < dims[i]`
/// * `dims` - Dimension of each site
///
/// # Example
/// ```
/// use yao_sim::index::mixed_radix_index;
/// // dims=[2,3,2], indices=[1,2,0] → 1×(3×2) + 2×2 + 0 = 6 + 4 + 0 = 10
/// assert_eq!(mixed_radix_index(&[1, 2, 0], &[2, 3, 2]), 10);
/// ```
pub fn mixed_radix_index(indices: &[usize], dims: &[usize]) -> usize {
    debug_assert_eq!(indices.len(), dims.len(), "indices and dims must have the same length");
    indices
        .iter()
        .zip(dims.iter())
        .fold(0usize, |acc, (&idx, &dim)| acc * dim + idx)
}

/// Decompose a flat index into per-site values.
///
/// Inverse of [`mixed_radix_index`]: the last site is `index % d_{n-1}`, and
/// the quotient carries on to the site before it.
///
/// # Example
/// ```
/// use yao_sim::index::linear_to_indices;
/// // dims=[2,3,2]: 10 = 5×2 + 0, 5 = 1×3 + 2, 1 = 0×2 + 1 → [1, 2, 0]
/// assert_eq!(linear_to_indices(10, &[2, 3, 2]), vec![1, 2, 0]);
/// ```
pub fn linear_to_indices(mut index: usize, dims: &[usize]) -> Vec<usize> {
    let mut multi = vec![0usize; dims.len()];
    for i in (0..dims.len()).rev() {
        multi[i] = index % dims[i];
        index /= dims[i];
    }
    multi
}

/// Iterate `(flat_index, site_values)` over every basis state.
///
/// Yields `dims.iter().product()` pairs in increasing flat index order.
///
/// # Example
/// ```
/// use yao_sim::index::iter_basis;
/// let states: Vec<_> = iter_basis(&[2, 3]).collect();
/// assert_eq!(states.len(), 6);
/// assert_eq!(states[1], (1, vec![0, 1]));
/// assert_eq!(states[3], (3, vec![1, 0]));
/// ```
pub fn iter_basis(dims: &[usize]) -> impl Iterator<Item = (usize, Vec<usize>)> + '_ {
    let total: usize = dims.iter().product();
    (0..total).map(move |i| (i, linear_to_indices(i, dims)))
}

/// Flat indices of the basis states whose sites `fixed_locs` hold `fixed_vals`.
///
/// Used for controlled gates and post-selection: only the amplitudes where
/// the controls (or measured sites) have the given values are visited.
///
/// # Arguments
/// * `dims` - Dimensions of all sites
/// * `fixed_locs` - Sites that must hold a fixed value
/// * `fixed_vals` - The value each of those sites must hold
///
/// # Example
/// ```
/// use yao_sim::index::iter_basis_fixed;
/// // dims=[2,2], fix site 0 to 1: only |10⟩ and |11⟩ (flat 2 and 3) match
/// let indices: Vec<_> = iter_basis_fixed(&[2, 2], &[0], &[1]).collect();
/// assert_eq!(indices, vec![2, 3]);
/// ```
pub fn iter_basis_fixed<'a>(
    dims: &'a [usize],
    fixed_locs: &'a [usize],
    fixed_vals: &'a [usize],
) -> impl Iterator<Item = usize> + 'a {
    debug_assert_eq!(fixed_locs.len(), fixed_vals.len(), "fixed_locs and fixed_vals must have the same length");
    let total: usize = dims.iter().product();
    (0..total).filter(move |&i| {
        let indices = linear_to_indices(i, dims);
        fixed_locs
            .iter()
            .zip(fixed_vals.iter())
            .all(|(&loc, &val)| indices[loc] == val)
    })
}
