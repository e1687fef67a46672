//! `omnia.toml`: optional file-based tuning for every pipeline stage.
//!
//! Every section and key is optional; anything missing keeps its default.
//! CLI flags are applied on top of the loaded file.

use omnia_cas::{CertificateConfig, DiffConfig};
use omnia_kernel::{
    GeneratorConfig, KernelConfig, LensConfig, LensSet, OmegaConfig, OmegaEstimator, OmniaError,
    SuperpositionKernel, Zea, ZeaConfig,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OmniaConfig {
    pub lenses: LensConfig,
    pub kernel: KernelConfig,
    pub omega: OmegaConfig,
    pub zea: ZeaConfig,
    pub generator: GeneratorConfig,
    pub certificate: CertificateConfig,
    pub diff: DiffConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("{path}: {message}")]
    Parse { path: String, message: String },
}

impl OmniaConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Estimator over the configured kernel and lens set.
    pub fn omega(&self) -> Result<OmegaEstimator, OmniaError> {
        let kernel = SuperpositionKernel::from_config(&self.kernel)?;
        Ok(OmegaEstimator::new(kernel, self.omega)?
            .with_lens_set(LensSet::from_config(&self.lenses)))
    }

    /// Classifier over [`omega`](Self::omega) with `zea` thresholds.
    pub fn zea(&self, zea: ZeaConfig) -> Result<Zea, OmniaError> {
        Zea::new(self.omega()?, zea)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnia_kernel::SnrcAggregation;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: OmniaConfig = toml::from_str("").expect("empty config parses");
        assert_eq!(config, OmniaConfig::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: OmniaConfig = toml::from_str(
            r#"
            [zea]
            snrc_agg = "mean"
            saturated_margin_max = 0.2

            [generator]
            rounds = 1

            [lenses]
            permutation_seed = 7
            "#,
        )
        .expect("partial config parses");

        assert_eq!(config.zea.snrc_agg, SnrcAggregation::Mean);
        assert_eq!(config.zea.saturated_margin_max, 0.2);
        assert_eq!(config.zea.eps, ZeaConfig::default().eps);
        assert_eq!(config.generator.rounds, 1);
        assert_eq!(config.generator.top_k, 8);
        assert_eq!(config.lenses.permutation_seed, 7);
        assert_eq!(config.lenses.summary_k, 128);
        assert_eq!(config.certificate.max_items_per_bucket, 25);
    }

    #[test]
    fn unknown_sections_and_modes_are_rejected() {
        assert!(toml::from_str::<OmniaConfig>("[lens]\nsummary_k = 4").is_err());
        assert!(toml::from_str::<OmniaConfig>("[zea]\nsnrc_agg = \"median\"").is_err());
    }

    #[test]
    fn invalid_kernel_values_fail_at_construction() {
        let config: OmniaConfig =
            toml::from_str("[kernel]\nfracture_threshold = 1.5").expect("config parses");
        assert!(config.omega().is_err());

        let config: OmniaConfig =
            toml::from_str("[kernel]\nnested_weight = -0.1").expect("config parses");
        assert!(config.omega().is_err());
    }
}
