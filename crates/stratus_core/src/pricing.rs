//! Static cost estimation for architectures.
//!
//! Estimates are rough: each resource type has a flat hourly rate and the
//! total is the sum over all resources for the requested duration. Types
//! without a rate cost nothing (networks, subnets, security groups).

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stratus_arch::Architecture;

/// Supported currencies for estimates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    USD,
    EUR,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::USD => write!(f, "$"),
            Currency::EUR => write!(f, "€"),
        }
    }
}

/// Hourly on-demand rates for the built-in resource types.
const DEFAULT_RATES: &[(&str, f64)] = &[
    ("aws_instance", 0.0416),
    ("aws_lb", 0.0225),
    ("aws_db_instance", 0.034),
    ("aws_eks_cluster", 0.10),
    ("aws_s3_bucket", 0.0032),
    ("azurerm_linux_virtual_machine", 0.0416),
    ("azurerm_lb", 0.025),
    ("azurerm_postgresql_flexible_server", 0.034),
    ("azurerm_kubernetes_cluster", 0.10),
    ("azurerm_storage_account", 0.0028),
    ("google_compute_instance", 0.0335),
    ("google_compute_forwarding_rule", 0.025),
    ("google_sql_database_instance", 0.0413),
    ("google_container_cluster", 0.10),
    ("google_storage_bucket", 0.0027),
];

/// Cost of one resource over the estimate's duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingItem {
    pub resource_id: String,
    pub resource_type: String,
    pub hourly_rate: f64,
    pub cost: f64,
}

/// A priced architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingEstimate {
    pub id: String,
    pub currency: Currency,
    pub duration_hours: f64,
    pub total: f64,
    pub items: Vec<PricingItem>,
    pub created_at: DateTime<Utc>,
}

impl PricingEstimate {
    /// Format the total for display, e.g. `$12.34 over 720h`.
    pub fn format_total(&self) -> String {
        format!("{}{:.2} over {}h", self.currency, self.total, self.duration_hours)
    }
}

/// Prices architectures from a rate table.
#[derive(Debug, Clone)]
pub struct PricingEstimator {
    currency: Currency,
    rates: HashMap<String, f64>,
}

impl Default for PricingEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingEstimator {
    /// Create an estimator with the built-in rate table.
    pub fn new() -> Self {
        Self {
            currency: Currency::default(),
            rates: DEFAULT_RATES
                .iter()
                .map(|(ty, rate)| (ty.to_string(), *rate))
                .collect(),
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Set or override the hourly rate for a resource type.
    pub fn with_rate(mut self, resource_type: impl Into<String>, hourly: f64) -> Self {
        self.rates.insert(resource_type.into(), hourly);
        self
    }

    pub fn with_rates<I>(mut self, rates: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        self.rates.extend(rates);
        self
    }

    pub fn rate(&self, resource_type: &str) -> f64 {
        self.rates.get(resource_type).copied().unwrap_or(0.0)
    }

    /// Price every resource of `architecture` for `duration`.
    pub fn estimate(&self, architecture: &Architecture, duration: Duration) -> PricingEstimate {
        let hours = duration.as_secs_f64() / 3600.0;

        let items: Vec<PricingItem> = architecture
            .resources
            .iter()
            .map(|resource| {
                let hourly_rate = self.rate(&resource.resource_type);
                PricingItem {
                    resource_id: resource.id.clone(),
                    resource_type: resource.resource_type.clone(),
                    hourly_rate,
                    cost: round_cents(hourly_rate * hours),
                }
            })
            .collect();
        let total = round_cents(items.iter().map(|i| i.cost).sum());

        PricingEstimate {
            id: Uuid::new_v4().to_string(),
            currency: self.currency,
            duration_hours: hours,
            total,
            items,
            created_at: Utc::now(),
        }
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
