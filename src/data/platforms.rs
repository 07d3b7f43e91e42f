//! Candidate platform selection for retrieved series

use super::{ExpressionMatrix, FeatureAnnotation};
use crate::error::{ExpressionError, Result};

/// One platform's worth of data from a retrieved series
#[derive(Debug, Clone)]
pub struct Platform {
    /// Platform accession (e.g. "GPL570")
    pub accession: String,
    /// Expression matrix measured on this platform
    pub matrix: ExpressionMatrix,
    /// Probe annotation for this platform, if provided
    pub annotation: Option<FeatureAnnotation>,
}

/// Ordered collection of candidate platforms from a single retrieved series.
///
/// Retrieval hands back every platform the series was measured on; callers
/// select one by index. An out-of-range index is an explicit error rather
/// than an implicit default.
#[derive(Debug, Clone)]
pub struct PlatformSet {
    platforms: Vec<Platform>,
}

impl PlatformSet {
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self { platforms }
    }

    /// Number of candidate platforms
    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Iterate over platforms in retrieval order
    pub fn iter(&self) -> impl Iterator<Item = &Platform> {
        self.platforms.iter()
    }

    /// Select a platform by index
    pub fn select(&self, index: usize) -> Result<&Platform> {
        self.platforms
            .get(index)
            .ok_or(ExpressionError::NoSuchPlatform {
                index,
                available: self.platforms.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn platform(accession: &str) -> Platform {
        let matrix = ExpressionMatrix::new(
            array![[1.0, 2.0]],
            vec!["f1".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();
        Platform {
            accession: accession.to_string(),
            matrix,
            annotation: None,
        }
    }

    #[test]
    fn test_select_in_order() {
        let set = PlatformSet::new(vec![platform("GPL96"), platform("GPL570")]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.select(0).unwrap().accession, "GPL96");
        assert_eq!(set.select(1).unwrap().accession, "GPL570");
    }

    #[test]
    fn test_out_of_range_is_explicit() {
        let set = PlatformSet::new(vec![platform("GPL96")]);
        match set.select(3).unwrap_err() {
            ExpressionError::NoSuchPlatform { index, available } => {
                assert_eq!(index, 3);
                assert_eq!(available, 1);
            }
            other => panic!("expected NoSuchPlatform, got {:?}", other),
        }
    }
}
