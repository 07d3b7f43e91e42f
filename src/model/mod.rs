//! Linear modelling: design matrices, per-feature fits, contrasts

mod contrast;
mod design;
mod fitting;

pub use contrast::{evaluate_contrast, Contrast, ContrastFit};
pub use design::{build_design, check_full_rank, Design};
pub use fitting::{fit_linear_models, FitResult};
