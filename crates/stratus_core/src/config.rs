//! Stratus configuration.
//!
//! Loaded from `stratus.toml` or `stratus.yaml`; every field has a default
//! so an empty file (or no file) is valid.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use stratus_arch::CloudProvider;

use crate::error::{CoreError, CoreResult};
use crate::pricing::{Currency, PricingEstimator};

/// File names searched by [`StratusConfig::discover`].
pub const CONFIG_FILES: &[&str] = &["stratus.toml", "stratus.yaml", "stratus.yml"];

/// Diagram validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Restrict node types to the recognised set. Empty means no restriction.
    pub known_types: BTreeSet<String>,
    /// Reject node types the selected provider cannot map.
    pub strict_types: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            known_types: BTreeSet::new(),
            strict_types: true,
        }
    }
}

/// Pricing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub currency: Currency,
    /// Hourly rate overrides keyed by resource type.
    pub rates: HashMap<String, f64>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StratusConfig {
    pub default_provider: CloudProvider,
    pub default_engine: String,
    /// Root of the file project store.
    pub workspace: PathBuf,
    pub validation: ValidationConfig,
    pub pricing: PricingConfig,
}

impl Default for StratusConfig {
    fn default() -> Self {
        Self {
            default_provider: CloudProvider::Aws,
            default_engine: "terraform".to_string(),
            workspace: PathBuf::from("."),
            validation: ValidationConfig::default(),
            pricing: PricingConfig::default(),
        }
    }
}

impl StratusConfig {
    /// Load configuration, picking the format from the file extension.
    pub fn load(path: &Path) -> CoreResult<Self> {
        debug!("Loading configuration from {:?}", path);
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Err(CoreError::Config(format!(
                "unsupported configuration format: {}",
                path.display()
            ))),
        }
    }

    /// Load the first config file found in `dir`, or the defaults.
    pub fn discover(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if path.is_file() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        serde_yaml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn with_default_provider(mut self, provider: CloudProvider) -> Self {
        self.default_provider = provider;
        self
    }

    pub fn with_default_engine(mut self, engine: impl Into<String>) -> Self {
        self.default_engine = engine.into();
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn with_strict_types(mut self, strict: bool) -> Self {
        self.validation.strict_types = strict;
        self
    }

    /// Build the pricing estimator described by this configuration.
    pub fn pricing_estimator(&self) -> PricingEstimator {
        PricingEstimator::new()
            .with_currency(self.pricing.currency)
            .with_rates(self.pricing.rates.clone())
    }
}
