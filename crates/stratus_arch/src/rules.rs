//! Cross-resource rules and rule sets.
//!
//! Rules run over a mapped [`Architecture`] and report every violation they
//! find. Nothing here fails fast: a [`RuleValidationResult`] holds the
//! findings for all resources so callers can show complete feedback.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::architecture::{Architecture, Resource, ResourceId};
use crate::error::{ArchError, ArchResult};
use crate::provider::CloudProvider;

/// Rule severity levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Error,
    Warning,
}

/// A semantic rule over resources of an architecture.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn severity(&self) -> RuleSeverity {
        RuleSeverity::Error
    }

    /// Whether the rule looks at this resource at all.
    fn applies_to(&self, _resource: &Resource) -> bool {
        true
    }

    /// Check one resource, returning a message per violation.
    fn check(&self, resource: &Resource, architecture: &Architecture) -> Vec<String>;
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule_id: String,
    pub severity: RuleSeverity,
    pub message: String,
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.rule_id, self.message)
    }
}

/// Findings for one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRuleResult {
    pub errors: Vec<RuleViolation>,
    pub warnings: Vec<RuleViolation>,
}

impl ResourceRuleResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, violation: RuleViolation) {
        match violation.severity {
            RuleSeverity::Error => self.errors.push(violation),
            RuleSeverity::Warning => self.warnings.push(violation),
        }
    }
}

/// Aggregated result of running rules over an architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleValidationResult {
    pub valid: bool,
    pub results: BTreeMap<ResourceId, ResourceRuleResult>,
}

impl Default for RuleValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            results: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, resource_id: &str, violation: RuleViolation) {
        if violation.severity == RuleSeverity::Error {
            self.valid = false;
        }
        self.results
            .entry(resource_id.to_string())
            .or_default()
            .push(violation);
    }

    pub fn error_count(&self) -> usize {
        self.results.values().map(|r| r.errors.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.results.values().map(|r| r.warnings.len()).sum()
    }

    /// Error messages prefixed with the resource id, in resource id order.
    pub fn error_messages(&self) -> Vec<String> {
        self.results
            .iter()
            .flat_map(|(id, r)| r.errors.iter().map(move |v| format!("{}: {}", id, v)))
            .collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.results
            .iter()
            .flat_map(|(id, r)| r.warnings.iter().map(move |v| format!("{}: {}", id, v)))
            .collect()
    }

    pub fn for_resource(&self, id: &str) -> Option<&ResourceRuleResult> {
        self.results.get(id)
    }
}

/// Requires a resource's region to match the architecture region.
pub struct RegionConsistencyRule;

impl Rule for RegionConsistencyRule {
    fn id(&self) -> &str {
        "region-consistency"
    }

    fn description(&self) -> &str {
        "All resources must live in the architecture region"
    }

    fn check(&self, resource: &Resource, architecture: &Architecture) -> Vec<String> {
        if resource.region == architecture.region {
            Vec::new()
        } else {
            vec![format!(
                "region '{}' differs from architecture region '{}'",
                resource.region, architecture.region
            )]
        }
    }
}

/// Requires a resource's provider to match the architecture provider.
pub struct ProviderConsistencyRule;

impl Rule for ProviderConsistencyRule {
    fn id(&self) -> &str {
        "provider-consistency"
    }

    fn description(&self) -> &str {
        "All resources must belong to the architecture provider"
    }

    fn check(&self, resource: &Resource, architecture: &Architecture) -> Vec<String> {
        if resource.provider == architecture.provider {
            Vec::new()
        } else {
            vec![format!(
                "provider '{}' differs from architecture provider '{}'",
                resource.provider, architecture.provider
            )]
        }
    }
}

/// Requires matching resources to sit inside a container of a given type.
pub struct ContainedInRule {
    id: String,
    description: String,
    applies: Regex,
    parent: Regex,
}

impl ContainedInRule {
    pub fn new(id: impl Into<String>, applies: &str, parent: &str) -> ArchResult<Self> {
        let id = id.into();
        Ok(Self {
            applies: compile(&id, applies)?,
            parent: compile(&id, parent)?,
            description: String::new(),
            id,
        })
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }
}

impl Rule for ContainedInRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn applies_to(&self, resource: &Resource) -> bool {
        self.applies.is_match(&resource.resource_type)
    }

    fn check(&self, resource: &Resource, architecture: &Architecture) -> Vec<String> {
        let container = architecture
            .container_of(&resource.id)
            .and_then(|id| architecture.resource(id));

        match container {
            Some(parent) if self.parent.is_match(&parent.resource_type) => Vec::new(),
            Some(parent) => vec![format!(
                "is contained in '{}' ({}) which does not match {}",
                parent.id,
                parent.resource_type,
                self.parent.as_str()
            )],
            None => vec![format!(
                "must be contained in a resource matching {}",
                self.parent.as_str()
            )],
        }
    }
}

/// Requires a property to name another resource of the architecture.
pub struct ReferenceRule {
    id: String,
    description: String,
    applies: Regex,
    properties: Vec<String>,
    target: Regex,
    required: bool,
}

impl ReferenceRule {
    pub fn new(
        id: impl Into<String>,
        applies: &str,
        properties: &[&str],
        target: &str,
    ) -> ArchResult<Self> {
        let id = id.into();
        Ok(Self {
            applies: compile(&id, applies)?,
            target: compile(&id, target)?,
            properties: properties.iter().map(|p| p.to_string()).collect(),
            description: String::new(),
            required: false,
            id,
        })
    }

    /// Also report resources that do not set the property at all.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }
}

impl Rule for ReferenceRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn applies_to(&self, resource: &Resource) -> bool {
        self.applies.is_match(&resource.resource_type)
    }

    fn check(&self, resource: &Resource, architecture: &Architecture) -> Vec<String> {
        let reference = self
            .properties
            .iter()
            .find_map(|p| resource.property_str(p).map(|v| (p, v)));

        match reference {
            Some((property, target_id)) => match architecture.resource(target_id) {
                Some(target) if self.target.is_match(&target.resource_type) => Vec::new(),
                Some(target) => vec![format!(
                    "`{}` references '{}' ({}) which does not match {}",
                    property,
                    target_id,
                    target.resource_type,
                    self.target.as_str()
                )],
                None => vec![format!(
                    "`{}` references '{}' which does not exist in the architecture",
                    property, target_id
                )],
            },
            None if self.required => vec![format!(
                "must reference a resource matching {} via `{}`",
                self.target.as_str(),
                self.properties.join("` or `")
            )],
            None => Vec::new(),
        }
    }
}

/// Requires a property, when present, to match a pattern.
pub struct PatternRule {
    id: String,
    description: String,
    severity: RuleSeverity,
    applies: Regex,
    properties: Vec<String>,
    pattern: Regex,
}

impl PatternRule {
    pub fn new(
        id: impl Into<String>,
        applies: &str,
        properties: &[&str],
        pattern: &str,
    ) -> ArchResult<Self> {
        let id = id.into();
        Ok(Self {
            applies: compile(&id, applies)?,
            pattern: compile(&id, pattern)?,
            properties: properties.iter().map(|p| p.to_string()).collect(),
            description: String::new(),
            severity: RuleSeverity::Error,
            id,
        })
    }

    pub fn with_severity(mut self, severity: RuleSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }
}

impl Rule for PatternRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn severity(&self) -> RuleSeverity {
        self.severity
    }

    fn applies_to(&self, resource: &Resource) -> bool {
        self.applies.is_match(&resource.resource_type)
    }

    fn check(&self, resource: &Resource, _architecture: &Architecture) -> Vec<String> {
        self.properties
            .iter()
            .filter_map(|p| resource.property_str(p).map(|v| (p, v)))
            .filter(|(_, value)| !self.pattern.is_match(value))
            .map(|(property, value)| {
                format!("`{}` value '{}' does not match {}", property, value, self.pattern.as_str())
            })
            .collect()
    }
}

fn compile(rule: &str, pattern: &str) -> ArchResult<Regex> {
    Regex::new(pattern).map_err(|e| ArchError::InvalidRule {
        rule: rule.to_string(),
        message: e.to_string(),
    })
}

/// Resource type patterns used by the standard rules.
struct ProviderPatterns {
    network: &'static str,
    subnet: &'static str,
    instance: &'static str,
    listener: &'static str,
    target_group: &'static str,
    bucket: &'static str,
    bucket_name: &'static str,
}

impl ProviderPatterns {
    fn for_provider(provider: CloudProvider) -> Self {
        match provider {
            CloudProvider::Aws => Self {
                network: r"^aws_vpc$",
                subnet: r"^aws_subnet$",
                instance: r"^aws_instance$",
                listener: r"^aws_lb_listener$",
                target_group: r"^aws_lb_target_group$",
                bucket: r"^aws_s3_bucket$",
                bucket_name: r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$",
            },
            CloudProvider::Azure => Self {
                network: r"^azurerm_virtual_network$",
                subnet: r"^azurerm_subnet$",
                instance: r"^azurerm_(linux|windows)_virtual_machine$",
                listener: r"^azurerm_lb_rule$",
                target_group: r"^azurerm_lb_backend_address_pool$",
                bucket: r"^azurerm_storage_account$",
                bucket_name: r"^[a-z0-9]{3,24}$",
            },
            CloudProvider::Gcp => Self {
                network: r"^google_compute_network$",
                subnet: r"^google_compute_subnetwork$",
                instance: r"^google_compute_instance$",
                listener: r"^google_compute_target_http_proxy$",
                target_group: r"^google_compute_backend_service$",
                bucket: r"^google_storage_bucket$",
                bucket_name: r"^[a-z0-9][a-z0-9._-]{1,61}[a-z0-9]$",
            },
        }
    }
}

/// A set of rules.
#[derive(Clone, Default)]
pub struct RuleSet {
    pub name: String,
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Create the standard rule set for a provider.
    pub fn standard(provider: CloudProvider) -> ArchResult<Self> {
        let p = ProviderPatterns::for_provider(provider);
        let mut rules = Self::new(format!("Standard Rules ({})", provider));

        rules.add(Arc::new(RegionConsistencyRule));
        rules.add(Arc::new(ProviderConsistencyRule));

        rules.add(Arc::new(
            ContainedInRule::new("subnet-in-network", p.subnet, p.network)?
                .with_description("Subnets must be placed inside a network"),
        ));

        rules.add(Arc::new(
            ReferenceRule::new(
                "instance-subnet-exists",
                p.instance,
                &["subnet", "subnet_id"],
                p.subnet,
            )?
            .with_description("An instance's subnet must exist in the same architecture"),
        ));

        rules.add(Arc::new(
            ReferenceRule::new(
                "listener-target-group",
                p.listener,
                &["target_group", "target_group_id"],
                p.target_group,
            )?
            .required()
            .with_description("A listener must reference an existing target group"),
        ));

        rules.add(Arc::new(
            PatternRule::new("bucket-name", p.bucket, &["bucket", "name"], p.bucket_name)?
                .with_severity(RuleSeverity::Warning)
                .with_description("Bucket names should follow provider naming rules"),
        ));

        Ok(rules)
    }

    /// Add a rule to the set.
    pub fn add(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.add(rule);
        self
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against every resource.
    pub fn evaluate(&self, architecture: &Architecture) -> RuleValidationResult {
        let mut result = RuleValidationResult::new();

        for resource in &architecture.resources {
            result.results.entry(resource.id.clone()).or_default();

            for rule in &self.rules {
                if !rule.applies_to(resource) {
                    continue;
                }
                for message in rule.check(resource, architecture) {
                    result.record(
                        &resource.id,
                        RuleViolation {
                            rule_id: rule.id().to_string(),
                            severity: rule.severity(),
                            message,
                        },
                    );
                }
            }
        }

        result
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("name", &self.name)
            .field("rules", &self.rule_ids())
            .finish()
    }
}

/// Runs the rule set registered for a provider.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    rule_sets: HashMap<CloudProvider, RuleSet>,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with the standard rules for every provider.
    pub fn standard() -> ArchResult<Self> {
        let mut validator = Self::new();
        for provider in CloudProvider::all() {
            validator = validator.with_rule_set(provider, RuleSet::standard(provider)?);
        }
        Ok(validator)
    }

    pub fn with_rule_set(mut self, provider: CloudProvider, rules: RuleSet) -> Self {
        self.rule_sets.insert(provider, rules);
        self
    }

    pub fn rule_set(&self, provider: CloudProvider) -> Option<&RuleSet> {
        self.rule_sets.get(&provider)
    }

    /// Validate an architecture with the rules of `provider`.
    ///
    /// A provider without a registered rule set yields a valid result.
    pub fn validate_rules(
        &self,
        architecture: &Architecture,
        provider: CloudProvider,
    ) -> RuleValidationResult {
        let Some(rules) = self.rule_sets.get(&provider) else {
            debug!("No rule set registered for {}, skipping rule validation", provider);
            let mut result = RuleValidationResult::new();
            for id in architecture.resource_ids() {
                result.results.entry(id.to_string()).or_default();
            }
            return result;
        };

        let result = rules.evaluate(architecture);
        debug!(
            "Rule validation with '{}': {} errors, {} warnings",
            rules.name,
            result.error_count(),
            result.warning_count()
        );
        result
    }
}
