//! Statistical testing support: p-values and multiple-testing correction

mod fdr;
mod pvalue;

pub use fdr::{benjamini_hochberg, bonferroni};
pub use pvalue::two_sided_t_pvalue;
