//! Cloud provider definitions.

use serde::{Deserialize, Serialize};

use crate::error::ArchError;

/// Supported cloud providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

impl CloudProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Gcp => "gcp",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![CloudProvider::Aws, CloudProvider::Azure, CloudProvider::Gcp]
    }

    /// Get the Terraform provider name.
    pub fn terraform_provider(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azurerm",
            CloudProvider::Gcp => "google",
        }
    }

    /// Get the Terraform registry source for the provider.
    pub fn terraform_source(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "hashicorp/aws",
            CloudProvider::Azure => "hashicorp/azurerm",
            CloudProvider::Gcp => "hashicorp/google",
        }
    }

    /// Get the Pulumi package name.
    pub fn pulumi_package(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "@pulumi/aws",
            CloudProvider::Azure => "@pulumi/azure",
            CloudProvider::Gcp => "@pulumi/gcp",
        }
    }

    /// Get default region for the provider.
    pub fn default_region(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "us-east-1",
            CloudProvider::Azure => "eastus",
            CloudProvider::Gcp => "us-central1",
        }
    }
}

impl std::str::FromStr for CloudProvider {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" | "amazon" => Ok(CloudProvider::Aws),
            "azure" | "azurerm" => Ok(CloudProvider::Azure),
            "gcp" | "google" => Ok(CloudProvider::Gcp),
            _ => Err(ArchError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
