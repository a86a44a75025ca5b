#![doc = include_str!("../README.md")]

mod bitreverse;
mod builder;

mod error;
pub use error::{Error, Result};

mod wavelet_matrix;
pub use wavelet_matrix::WaveletMatrix;

mod wavelet_tree;
pub use wavelet_tree::WaveletTree;

mod factory;
pub use factory::{build_wavelet_tree, build_wavelet_matrix};
