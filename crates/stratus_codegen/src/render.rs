//! Per-resource rendering.
//!
//! Renderers turn one resource into a declaration in the target language.
//! The renderers here are generic: they write the resource's properties as
//! attributes and turn reference-like properties (see [`is_reference_key`])
//! whose string value names another resource into references. Other
//! properties are written verbatim, even when they happen to match an id.
//! Provider-aware renderers can replace them through [`ResourceRenderer`].

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use stratus_arch::{Architecture, Resource};

use crate::error::{CodegenError, CodegenResult};

/// Context handed to renderers.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub architecture: &'a Architecture,
}

impl<'a> RenderContext<'a> {
    pub fn new(architecture: &'a Architecture) -> Self {
        Self { architecture }
    }

    /// Resources that must exist before `resource`: its container, then its
    /// dependencies in id order.
    pub fn predecessors(&self, resource: &Resource) -> Vec<&'a Resource> {
        let arch = self.architecture;
        let mut ids: Vec<&str> = Vec::new();
        if let Some(parent) = arch.container_of(&resource.id) {
            ids.push(parent);
        }
        for dep in arch.dependencies_of(&resource.id) {
            if !ids.contains(&dep) {
                ids.push(dep);
            }
        }
        ids.into_iter().filter_map(|id| arch.resource(id)).collect()
    }

    /// The resource a string value under `key` refers to, if any.
    pub fn referenced(&self, resource: &Resource, key: &str, value: &Value) -> Option<&'a Resource> {
        if !is_reference_key(key) {
            return None;
        }
        value
            .as_str()
            .filter(|id| *id != resource.id)
            .and_then(|id| self.architecture.resource(id))
    }

    /// Every resource named by a reference in `resource`'s properties,
    /// including inside arrays and nested objects, in id order.
    pub fn references(&self, resource: &Resource) -> Vec<&'a Resource> {
        let mut found = BTreeMap::new();
        for (key, value) in &resource.properties {
            self.collect_references(resource, key, value, &mut found);
        }
        found.into_values().collect()
    }

    fn collect_references(
        &self,
        resource: &Resource,
        key: &str,
        value: &Value,
        found: &mut BTreeMap<&'a str, &'a Resource>,
    ) {
        match value {
            Value::String(_) => {
                if let Some(target) = self.referenced(resource, key, value) {
                    found.insert(target.id.as_str(), target);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.collect_references(resource, key, item, found);
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    self.collect_references(resource, k, v, found);
                }
            }
            _ => {}
        }
    }
}

const REFERENCE_KEYS: &[&str] = &[
    "subnet",
    "subnets",
    "vpc",
    "network",
    "security_group",
    "security_groups",
    "target_group",
    "load_balancer",
    "cluster",
    "role",
];

/// Whether a property key holds resource references, e.g. `subnet_id`,
/// `security_group_ids` or `target_group`.
pub fn is_reference_key(key: &str) -> bool {
    key.ends_with("_id") || key.ends_with("_ids") || REFERENCE_KEYS.contains(&key)
}

/// Fail when two resources would be given the same generated name.
///
/// `names` lists every top-level name generated for one resource.
pub fn ensure_unique_names<'r, F>(resources: &'r [Resource], kind: &str, names: F) -> CodegenResult<()>
where
    F: Fn(&Resource) -> Vec<String>,
{
    let mut seen: HashMap<String, &'r str> = HashMap::with_capacity(resources.len());
    for resource in resources {
        for name in names(resource) {
            if let Some(other) = seen.insert(name.clone(), resource.id.as_str()) {
                return Err(CodegenError::Render {
                    resource: resource.id.clone(),
                    message: format!("{} '{}' is also generated for resource '{}'", kind, name, other),
                });
            }
        }
    }
    Ok(())
}

/// Renders a single resource declaration.
pub trait ResourceRenderer: Send + Sync {
    fn render(&self, resource: &Resource, ctx: &RenderContext<'_>) -> CodegenResult<String>;
}

/// Convert an id into a lower snake case identifier.
pub fn to_identifier(id: &str) -> String {
    let ident = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    match ident.chars().next() {
        None => "resource".to_string(),
        Some(c) if c.is_ascii_digit() => format!("r_{}", ident),
        Some(_) => ident,
    }
}

/// Convert an id or property key into lower camel case.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(&to_identifier(s));
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Convert a snake case string into PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Generic HCL renderer for Terraform.
#[derive(Debug, Clone, Default)]
pub struct HclRenderer;

impl HclRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Terraform address of a resource, e.g. `aws_vpc.main`.
    pub fn address(resource: &Resource) -> String {
        format!("{}.{}", resource.resource_type, to_identifier(&resource.id))
    }

    fn value(
        &self,
        resource: &Resource,
        key: &str,
        value: &Value,
        ctx: &RenderContext<'_>,
        indent: usize,
    ) -> String {
        if let Some(target) = ctx.referenced(resource, key, value) {
            return format!("{}.id", Self::address(target));
        }

        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("\"{}\"", escape(s)),
            Value::Array(items) => {
                let items: Vec<String> = items
                    .iter()
                    .map(|v| self.value(resource, key, v, ctx, indent))
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Value::Object(map) => {
                if map.is_empty() {
                    return "{}".to_string();
                }
                let pad = "  ".repeat(indent + 1);
                let lines: Vec<String> = map
                    .iter()
                    .map(|(k, v)| {
                        let name = if is_bare_key(k) { k.clone() } else { format!("\"{}\"", escape(k)) };
                        format!("{}{} = {}", pad, name, self.value(resource, k, v, ctx, indent + 1))
                    })
                    .collect();
                format!("{{\n{}\n{}}}", lines.join("\n"), "  ".repeat(indent))
            }
        }
    }
}

impl ResourceRenderer for HclRenderer {
    fn render(&self, resource: &Resource, ctx: &RenderContext<'_>) -> CodegenResult<String> {
        if resource.resource_type.trim().is_empty() {
            return Err(CodegenError::Render {
                resource: resource.id.clone(),
                message: "resource type is empty".to_string(),
            });
        }

        let mut lines = vec![format!(
            "resource \"{}\" \"{}\" {{",
            resource.resource_type,
            to_identifier(&resource.id)
        )];

        for (key, value) in &resource.properties {
            if !is_bare_key(key) {
                return Err(CodegenError::Render {
                    resource: resource.id.clone(),
                    message: format!("property name '{}' is not a valid HCL identifier", key),
                });
            }
            lines.push(format!("  {} = {}", key, self.value(resource, key, value, ctx, 1)));
        }

        // The container and dependencies go to depends_on unless a
        // reference already orders them.
        let referenced = ctx.references(resource);
        let depends_on: Vec<String> = ctx
            .predecessors(resource)
            .into_iter()
            .filter(|r| !referenced.iter().any(|t| t.id == r.id))
            .map(Self::address)
            .collect();
        if !depends_on.is_empty() {
            if !resource.properties.is_empty() {
                lines.push(String::new());
            }
            lines.push(format!("  depends_on = [{}]", depends_on.join(", ")));
        }

        lines.push("}".to_string());
        Ok(lines.join("\n"))
    }
}

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "default", "delete", "do", "else",
    "enum", "export", "extends", "false", "finally", "for", "function", "if", "import", "in",
    "instanceof", "interface", "let", "new", "null", "package", "private", "protected", "public",
    "return", "static", "super", "switch", "this", "throw", "true", "try", "typeof", "var",
    "void", "while", "with", "yield",
];

/// Generic TypeScript renderer for Pulumi.
#[derive(Debug, Clone, Default)]
pub struct TypeScriptRenderer;

impl TypeScriptRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Variable name holding a resource.
    pub fn variable(resource: &Resource) -> String {
        let name = to_camel_case(&resource.id);
        if RESERVED_WORDS.contains(&name.as_str()) {
            format!("{}_", name)
        } else {
            name
        }
    }

    /// Pulumi class for a Terraform-style type, e.g. `aws_s3_bucket` under
    /// namespace `aws` becomes `aws.s3.Bucket`.
    pub fn class_name(resource: &Resource) -> String {
        let namespace = resource.provider.as_str();
        let segments: Vec<&str> = resource.resource_type.split('_').collect();
        match segments.as_slice() {
            [_, module, rest @ ..] if !rest.is_empty() => {
                format!("{}.{}.{}", namespace, module, to_pascal_case(&rest.join("_")))
            }
            [_, name] => format!("{}.{}", namespace, to_pascal_case(name)),
            _ => format!("{}.{}", namespace, to_pascal_case(&resource.resource_type)),
        }
    }

    /// Name of the exported id of a resource, e.g. `export const webId`.
    pub fn export_name(resource: &Resource) -> String {
        format!("{}Id", Self::variable(resource).trim_end_matches('_'))
    }

    fn value(
        &self,
        resource: &Resource,
        key: &str,
        value: &Value,
        ctx: &RenderContext<'_>,
        indent: usize,
    ) -> String {
        if let Some(target) = ctx.referenced(resource, key, value) {
            return format!("{}.id", Self::variable(target));
        }

        match value {
            Value::Null => "undefined".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("\"{}\"", escape(s)),
            Value::Array(items) => {
                let items: Vec<String> = items
                    .iter()
                    .map(|v| self.value(resource, key, v, ctx, indent))
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Value::Object(map) => self.object(resource, map.iter(), ctx, indent),
        }
    }

    fn object<'v>(
        &self,
        resource: &Resource,
        entries: impl Iterator<Item = (&'v String, &'v Value)>,
        ctx: &RenderContext<'_>,
        indent: usize,
    ) -> String {
        let pad = "    ".repeat(indent + 1);
        let lines: Vec<String> = entries
            .map(|(k, v)| {
                format!(
                    "{}{}: {},",
                    pad,
                    to_camel_case(k),
                    self.value(resource, k, v, ctx, indent + 1)
                )
            })
            .collect();
        if lines.is_empty() {
            "{}".to_string()
        } else {
            format!("{{\n{}\n{}}}", lines.join("\n"), "    ".repeat(indent))
        }
    }
}

impl ResourceRenderer for TypeScriptRenderer {
    fn render(&self, resource: &Resource, ctx: &RenderContext<'_>) -> CodegenResult<String> {
        if resource.resource_type.trim().is_empty() {
            return Err(CodegenError::Render {
                resource: resource.id.clone(),
                message: "resource type is empty".to_string(),
            });
        }

        let args = self.object(resource, resource.properties.iter(), ctx, 0);

        let depends_on: Vec<String> = ctx
            .predecessors(resource)
            .into_iter()
            .map(Self::variable)
            .collect();
        let options = if depends_on.is_empty() {
            String::new()
        } else {
            format!(", {{ dependsOn: [{}] }}", depends_on.join(", "))
        };

        Ok(format!(
            "const {} = new {}(\"{}\", {}{});",
            Self::variable(resource),
            Self::class_name(resource),
            escape(&resource.id),
            args,
            options
        ))
    }
}
