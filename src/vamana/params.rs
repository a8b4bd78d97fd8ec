use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Configuration for Vamana graph construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildParams {
    /// Maximum degree (R) - neighbors per node
    pub max_degree: usize,
    /// Search list size (L) - candidate pool bound during construction
    pub search_list: usize,
    /// Pruning factor for the final pass (1.0 = sparsest graph)
    pub alpha: f32,
    /// Number of passes over all points
    pub num_passes: usize,
    /// 0 = prefix-doubling batches, >0 = every point in one parallel round
    pub single_batch: usize,
    /// Seed for the per-pass insertion order
    pub seed: u64,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            max_degree: 64,
            search_list: 128,
            alpha: 1.2,
            num_passes: 2,
            single_batch: 0,
            seed: 0x5eed,
        }
    }
}

impl BuildParams {
    pub fn new(max_degree: usize, search_list: usize, alpha: f32, num_passes: usize) -> Self {
        Self {
            max_degree,
            search_list,
            alpha,
            num_passes,
            ..Self::default()
        }
    }

    /// Fast config (lower quality, faster build)
    pub fn fast() -> Self {
        Self {
            max_degree: 32,
            search_list: 64,
            alpha: 1.0,
            num_passes: 1,
            ..Self::default()
        }
    }

    /// High quality config
    pub fn high_quality() -> Self {
        Self {
            max_degree: 96,
            search_list: 256,
            alpha: 1.5,
            num_passes: 3,
            ..Self::default()
        }
    }

    /// Reject configurations before any build work starts.
    pub fn validate(&self) -> Result<()> {
        if self.max_degree == 0 {
            return Err(IndexError::InvalidParameter("R (max degree) must be > 0".into()));
        }
        if self.max_degree > u32::MAX as usize - 1 {
            return Err(IndexError::InvalidParameter(format!(
                "R = {} does not fit the graph file format",
                self.max_degree
            )));
        }
        if self.search_list == 0 {
            return Err(IndexError::InvalidParameter("L (search list) must be > 0".into()));
        }
        if !self.alpha.is_finite() || self.alpha < 1.0 {
            return Err(IndexError::InvalidParameter(format!(
                "alpha must be a finite value >= 1.0, got {}",
                self.alpha
            )));
        }
        if self.num_passes == 0 {
            return Err(IndexError::InvalidParameter("num_passes must be >= 1".into()));
        }
        Ok(())
    }

    /// Alpha used by pass `pass` (0-based): every pass but the last prunes with
    /// 1.0, the last one with the configured value.
    pub fn alpha_for_pass(&self, pass: usize) -> f32 {
        if pass + 1 == self.num_passes {
            self.alpha
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        let default = BuildParams::default();
        assert_eq!(default.max_degree, 64);
        assert!(default.validate().is_ok());

        let fast = BuildParams::fast();
        assert!(fast.max_degree < default.max_degree);
        assert!(fast.validate().is_ok());

        let hq = BuildParams::high_quality();
        assert!(hq.max_degree > default.max_degree);
        assert!(hq.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let base = BuildParams::new(8, 16, 1.2, 1);
        assert!(base.validate().is_ok());
        for bad in [
            BuildParams { max_degree: 0, ..base.clone() },
            BuildParams { search_list: 0, ..base.clone() },
            BuildParams { alpha: 0.0, ..base.clone() },
            BuildParams { alpha: -1.0, ..base.clone() },
            BuildParams { alpha: f32::NAN, ..base.clone() },
            BuildParams { num_passes: 0, ..base.clone() },
        ] {
            assert!(matches!(bad.validate(), Err(IndexError::InvalidParameter(_))), "{bad:?}");
        }
    }

    #[test]
    fn only_last_pass_uses_alpha() {
        let p = BuildParams::new(8, 16, 1.3, 3);
        assert_eq!(p.alpha_for_pass(0), 1.0);
        assert_eq!(p.alpha_for_pass(1), 1.0);
        assert_eq!(p.alpha_for_pass(2), 1.3);
    }
}
