//! Terraform engine.

use std::sync::Arc;

use tracing::{debug, info};

use stratus_arch::{Architecture, CloudProvider, Resource};

use crate::engine::Engine;
use crate::error::CodegenResult;
use crate::output::Output;
use crate::render::{ensure_unique_names, to_identifier, HclRenderer, RenderContext, ResourceRenderer};

const FILE_TYPE: &str = "terraform";

/// Generates a Terraform configuration.
///
/// Produces `versions.tf`, `provider.tf`, `variables.tf`, `main.tf` and
/// `outputs.tf`. Resource blocks in `main.tf` follow the supplied order.
pub struct TerraformEngine {
    renderer: Arc<dyn ResourceRenderer>,
}

impl TerraformEngine {
    pub fn new() -> Self {
        Self {
            renderer: Arc::new(HclRenderer::new()),
        }
    }

    /// Replace the per-resource renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ResourceRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    fn provider_version(provider: CloudProvider) -> &'static str {
        match provider {
            CloudProvider::Aws => "~> 5.0",
            CloudProvider::Azure => "~> 3.0",
            CloudProvider::Gcp => "~> 5.0",
        }
    }

    fn versions_tf(&self, provider: CloudProvider) -> String {
        format!(
            r#"# Terraform and provider version constraints

terraform {{
  required_version = ">= 1.6.0"

  required_providers {{
    {name} = {{
      source  = "{source}"
      version = "{version}"
    }}
  }}
}}
"#,
            name = provider.terraform_provider(),
            source = provider.terraform_source(),
            version = Self::provider_version(provider),
        )
    }

    fn provider_tf(&self, provider: CloudProvider) -> String {
        let body = match provider {
            CloudProvider::Azure => "  features {}",
            CloudProvider::Aws | CloudProvider::Gcp => "  region = var.region",
        };
        format!(
            "# Provider configuration\n\nprovider \"{}\" {{\n{}\n}}\n",
            provider.terraform_provider(),
            body
        )
    }

    fn variables_tf(&self, architecture: &Architecture) -> String {
        let region = if architecture.region.is_empty() {
            architecture.provider.default_region()
        } else {
            architecture.region.as_str()
        };
        format!(
            r#"# Input variables

variable "region" {{
  description = "Cloud provider region"
  type        = string
  default     = "{}"
}}
"#,
            region
        )
    }

    fn main_tf(&self, architecture: &Architecture, sorted: &[Resource]) -> CodegenResult<String> {
        let ctx = RenderContext::new(architecture);
        let mut blocks = Vec::with_capacity(sorted.len());
        for resource in sorted {
            debug!("Rendering {} as {}", resource.id, resource.resource_type);
            blocks.push(self.renderer.render(resource, &ctx)?);
        }

        let mut content = String::from("# Resources in dependency order\n");
        for block in blocks {
            content.push('\n');
            content.push_str(&block);
            content.push('\n');
        }
        Ok(content)
    }

    fn outputs_tf(&self, sorted: &[Resource]) -> String {
        let mut content = String::from("# Output values\n");
        for resource in sorted {
            content.push_str(&format!(
                "\noutput \"{ident}_id\" {{\n  description = \"ID of {id}\"\n  value       = {address}.id\n}}\n",
                ident = to_identifier(&resource.id),
                id = resource.id,
                address = HclRenderer::address(resource),
            ));
        }
        content
    }
}

impl Default for TerraformEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for TerraformEngine {
    fn name(&self) -> &str {
        "terraform"
    }

    fn description(&self) -> &str {
        "HashiCorp Terraform (HCL)"
    }

    fn generate(&self, architecture: &Architecture, sorted: &[Resource]) -> CodegenResult<Output> {
        info!("Generating Terraform for {} resources", sorted.len());
        // Outputs are named after the identifier alone, so it must be unique
        // across resource types.
        ensure_unique_names(sorted, "Terraform identifier", |r| vec![to_identifier(&r.id)])?;

        let provider = architecture.provider;
        let mut output = Output::new();
        output.add_file("versions.tf", self.versions_tf(provider), FILE_TYPE)?;
        output.add_file("provider.tf", self.provider_tf(provider), FILE_TYPE)?;
        output.add_file("variables.tf", self.variables_tf(architecture), FILE_TYPE)?;
        output.add_file("main.tf", self.main_tf(architecture, sorted)?, FILE_TYPE)?;
        output.add_file("outputs.tf", self.outputs_tf(sorted), FILE_TYPE)?;
        Ok(output)
    }
}
