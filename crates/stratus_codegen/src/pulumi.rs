//! Pulumi (TypeScript) engine.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use stratus_arch::{Architecture, CloudProvider, Resource};

use crate::engine::Engine;
use crate::error::{CodegenError, CodegenResult};
use crate::output::Output;
use crate::render::{ensure_unique_names, RenderContext, ResourceRenderer, TypeScriptRenderer};

/// Generates a Pulumi TypeScript program.
///
/// TypeScript `const` declarations cannot refer forward, so the engine
/// rejects an order in which a resource appears before its container or one
/// of its dependencies. Property references (`subnet_id: "subnet"`) are not
/// edges; the engine moves a resource after the resources it references,
/// keeping the supplied order otherwise.
pub struct PulumiEngine {
    project_name: String,
    renderer: Arc<dyn ResourceRenderer>,
}

impl PulumiEngine {
    pub fn new() -> Self {
        Self {
            project_name: "stratus-infra".to_string(),
            renderer: Arc::new(TypeScriptRenderer::new()),
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    /// Replace the per-resource renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ResourceRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    fn region_key(provider: CloudProvider) -> &'static str {
        match provider {
            CloudProvider::Aws => "aws:region",
            CloudProvider::Azure => "azure:location",
            CloudProvider::Gcp => "gcp:region",
        }
    }

    fn package_version(provider: CloudProvider) -> &'static str {
        match provider {
            CloudProvider::Aws => "^6.0.0",
            CloudProvider::Azure => "^5.0.0",
            CloudProvider::Gcp => "^7.0.0",
        }
    }

    fn project_yaml(&self) -> String {
        format!(
            "name: {}\nruntime:\n  name: nodejs\n  options:\n    typescript: true\ndescription: Generated by Stratus\n",
            self.project_name
        )
    }

    fn stack_yaml(&self, architecture: &Architecture) -> String {
        let region = if architecture.region.is_empty() {
            architecture.provider.default_region()
        } else {
            architecture.region.as_str()
        };
        format!(
            "config:\n  {}: {}\n",
            Self::region_key(architecture.provider),
            region
        )
    }

    fn package_json(&self, provider: CloudProvider) -> CodegenResult<String> {
        let mut dependencies = serde_json::Map::new();
        dependencies.insert("@pulumi/pulumi".to_string(), json!("^3.0.0"));
        dependencies.insert(
            provider.pulumi_package().to_string(),
            json!(Self::package_version(provider)),
        );

        let package = json!({
            "name": self.project_name,
            "main": "index.ts",
            "devDependencies": {
                "@types/node": "^20.0.0",
                "typescript": "^5.0.0"
            },
            "dependencies": dependencies,
        });
        Ok(serde_json::to_string_pretty(&package)? + "\n")
    }

    /// Declaration order: the supplied order, with each resource delayed
    /// until everything it references is declared.
    fn declaration_order<'r>(
        ctx: &RenderContext<'_>,
        sorted: &'r [Resource],
    ) -> CodegenResult<Vec<&'r Resource>> {
        let position: HashMap<&str, usize> = sorted
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut declared: HashSet<&str> = HashSet::with_capacity(sorted.len());
        let mut waiting: Vec<usize> = vec![0; sorted.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); sorted.len()];

        for (i, resource) in sorted.iter().enumerate() {
            if let Some(missing) = ctx
                .predecessors(resource)
                .into_iter()
                .find(|p| !declared.contains(p.id.as_str()))
            {
                return Err(CodegenError::OrderViolation {
                    resource: resource.id.clone(),
                    missing: missing.id.clone(),
                });
            }
            declared.insert(resource.id.as_str());

            let mut required = ctx.predecessors(resource);
            required.extend(ctx.references(resource));
            for target in required {
                match position.get(target.id.as_str()) {
                    Some(&j) => {
                        waiting[i] += 1;
                        dependents[j].push(i);
                    }
                    None => {
                        return Err(CodegenError::OrderViolation {
                            resource: resource.id.clone(),
                            missing: target.id.clone(),
                        })
                    }
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..sorted.len()).filter(|&i| waiting[i] == 0).collect();
        let mut order = Vec::with_capacity(sorted.len());
        while let Some(i) = ready.pop_first() {
            order.push(&sorted[i]);
            for &d in &dependents[i] {
                waiting[d] -= 1;
                if waiting[d] == 0 {
                    ready.insert(d);
                }
            }
        }

        if order.len() < sorted.len() {
            let stuck: Vec<&str> = (0..sorted.len())
                .filter(|&i| waiting[i] > 0)
                .map(|i| sorted[i].id.as_str())
                .collect();
            return Err(CodegenError::Render {
                resource: stuck.first().map(|id| id.to_string()).unwrap_or_default(),
                message: format!("property references form a cycle among {}", stuck.join(", ")),
            });
        }
        Ok(order)
    }

    fn index_ts(&self, architecture: &Architecture, sorted: &[Resource]) -> CodegenResult<String> {
        let ctx = RenderContext::new(architecture);
        ensure_unique_names(sorted, "TypeScript name", |r| {
            vec![TypeScriptRenderer::variable(r), TypeScriptRenderer::export_name(r)]
        })?;

        let order = Self::declaration_order(&ctx, sorted)?;
        let mut declarations = Vec::with_capacity(order.len());
        for resource in &order {
            debug!("Declaring {} as {}", resource.id, TypeScriptRenderer::class_name(resource));
            declarations.push(self.renderer.render(resource, &ctx)?);
        }

        let provider = architecture.provider;
        let mut content = format!(
            "import * as pulumi from \"@pulumi/pulumi\";\nimport * as {} from \"{}\";\n",
            provider.as_str(),
            provider.pulumi_package()
        );
        for declaration in declarations {
            content.push('\n');
            content.push_str(&declaration);
            content.push('\n');
        }
        if !order.is_empty() {
            content.push('\n');
            for resource in &order {
                content.push_str(&format!(
                    "export const {} = {}.id;\n",
                    TypeScriptRenderer::export_name(resource),
                    TypeScriptRenderer::variable(resource)
                ));
            }
        }
        Ok(content)
    }
}

impl Default for PulumiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for PulumiEngine {
    fn name(&self) -> &str {
        "pulumi"
    }

    fn description(&self) -> &str {
        "Pulumi TypeScript program"
    }

    fn generate(&self, architecture: &Architecture, sorted: &[Resource]) -> CodegenResult<Output> {
        info!("Generating Pulumi program for {} resources", sorted.len());

        let index = self.index_ts(architecture, sorted)?;
        let mut output = Output::new();
        output.add_file("Pulumi.yaml", self.project_yaml(), "yaml")?;
        output.add_file("Pulumi.dev.yaml", self.stack_yaml(architecture), "yaml")?;
        output.add_file("package.json", self.package_json(architecture.provider)?, "json")?;
        output.add_file("index.ts", index, "typescript")?;
        Ok(output)
    }
}
