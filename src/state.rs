use ndarray::Array1;
use num_complex::Complex64;

use crate::index::mixed_radix_index;

/// Dense state vector over sites of arbitrary local dimension.
#[derive(Debug, Clone)]
pub struct State {
    pub dims: Vec<usize>,
    pub data: Array1<Complex64>,
}

impl State {
    /// Wrap amplitudes for sites `dims`.
    ///
    /// # Panics
    /// Panics if `data.len()` differs from the product of `dims`.
    pub fn new(dims: Vec<usize>, data: Array1<Complex64>) -> Self {
        let total: usize = dims.iter().product();
        assert_eq!(
            data.len(),
            total,
            "data length {} does not match product of dims {}",
            data.len(),
            total
        );
        State { dims, data }
    }

    /// Creates |0,0,...,0> state (first basis element = 1, rest = 0)
    pub fn zero_state(dims: &[usize]) -> Self {
        let levels = vec![0; dims.len()];
        Self::product_state(dims, &levels)
    }

    /// Creates |i_0, i_1, ..., i_{n-1}> state.
    /// Index computation uses row-major ordering:
    /// index = levels[0]*d_1*d_2*... + levels[1]*d_2*... + ... + levels[n-1]
    ///
    /// # Panics
    /// Panics if `levels` has a different length than `dims` or a level is
    /// not below its site's dimension.
    pub fn product_state(dims: &[usize], levels: &[usize]) -> Self {
        assert_eq!(dims.len(), levels.len(), "dims and levels must have the same length");
        for (i, (&level, &dim)) in levels.iter().zip(dims.iter()).enumerate() {
            assert!(level < dim, "level[{}] = {} is out of range for dim = {}", i, level, dim);
        }

        let total: usize = dims.iter().product();
        let mut data = Array1::zeros(total);
        data[mixed_radix_index(levels, dims)] = Complex64::new(1.0, 0.0);
        State {
            dims: dims.to_vec(),
            data,
        }
    }

    /// L2 norm of the state vector
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt()
    }

    /// Length of the data vector
    pub fn total_dim(&self) -> usize {
        self.data.len()
    }

    /// Number of sites, i.e. `dims.len()`
    pub fn num_sites(&self) -> usize {
        self.dims.len()
    }
}
