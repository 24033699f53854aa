use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Detector geometry parameters (idealized cylindrical shell).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DetectorConfig {
    pub radius_mm: f64,
    pub half_length_mm: f64,
}

// Energy axis shared by the deposited-energy histograms.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HistogramConfig {
    #[serde(default = "default_n_bins")]
    pub n_bins: usize,
    #[serde(default = "default_e_max")]
    pub e_max_mev: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SmearingConfig {
    #[serde(default = "default_resolution_coeff")]
    pub resolution_coeff: f64,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ThresholdConfig {
    pub energy_mev: f64,
}

// What to do with a malformed event record: abort the whole run or skip the
// record with a warning. The core never makes this call, the config does.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    Abort,
    Skip,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InputConfig {
    pub events_file: String,
    #[serde(default = "default_malformed_policy")]
    pub on_malformed: MalformedPolicy,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_histograms: bool,
    #[serde(default = "default_true")]
    pub save_curves: bool,
    #[serde(default = "default_true")]
    pub save_summary: bool,
}

// Main analysis configuration, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AnalysisConfig {
    pub detector: DetectorConfig,
    #[serde(default)]
    pub histogram: HistogramConfig,
    #[serde(default)]
    pub smearing: SmearingConfig,
    pub threshold: ThresholdConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self { n_bins: default_n_bins(), e_max_mev: default_e_max() }
    }
}

impl Default for SmearingConfig {
    fn default() -> Self {
        Self { resolution_coeff: default_resolution_coeff(), seed: 0 }
    }
}

impl AnalysisConfig {
    /// Loads the analysis configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config: AnalysisConfig = toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.detector.radius_mm <= 0.0 {
            anyhow::bail!("detector.radius_mm must be positive.");
        }
        if self.detector.half_length_mm <= 0.0 {
            anyhow::bail!("detector.half_length_mm must be positive.");
        }
        if self.histogram.n_bins == 0 {
            anyhow::bail!("histogram.n_bins must be greater than 0.");
        }
        if self.histogram.e_max_mev <= 0.0 {
            anyhow::bail!("histogram.e_max_mev must be positive.");
        }
        if self.smearing.resolution_coeff < 0.0 {
            anyhow::bail!("smearing.resolution_coeff must not be negative.");
        }
        if self.threshold.energy_mev < 0.0 {
            anyhow::bail!("threshold.energy_mev must not be negative.");
        }
        Ok(())
    }
}

fn default_n_bins() -> usize { 200 }

fn default_e_max() -> f64 {
    2.0 // MeV, comfortably above the 1.157 MeV prompt line
}

fn default_resolution_coeff() -> f64 {
    0.044 // fractional resolution * sqrt(E/MeV) of the scintillator readout
}

fn default_malformed_policy() -> MalformedPolicy {
    MalformedPolicy::Abort
}

fn default_true() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [detector]
            radius_mm = 437.3
            half_length_mm = 250.0

            [threshold]
            energy_mev = 0.354

            [input]
            events_file = "events.csv"

            [output]
            base_filename = "gamma_analysis"
        "#
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config: AnalysisConfig = toml::from_str(minimal_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.histogram.n_bins, 200);
        assert_eq!(config.input.on_malformed, MalformedPolicy::Abort);
        assert!(config.output.save_curves);
    }

    #[test]
    fn rejects_non_positive_detector() {
        let mut config: AnalysisConfig = toml::from_str(minimal_toml()).unwrap();
        config.detector.radius_mm = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_skip_policy() {
        let toml_str = minimal_toml().replace(
            "events_file = \"events.csv\"",
            "events_file = \"events.csv\"\non_malformed = \"skip\"",
        );
        let config: AnalysisConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.input.on_malformed, MalformedPolicy::Skip);
    }
}
