//! Compiled, provider-specific resource graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use stratus_graph::Properties;

use crate::error::{ArchError, ArchResult};
use crate::provider::CloudProvider;

/// Identifier of a resource within an architecture.
pub type ResourceId = String;

/// A diagram node compiled for a specific provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub provider: CloudProvider,
    pub region: String,
    #[serde(default)]
    pub properties: Properties,
    /// Diagram node type the resource was mapped from.
    #[serde(default)]
    pub source_type: String,
}

impl Resource {
    pub fn new(
        id: impl Into<ResourceId>,
        resource_type: impl Into<String>,
        provider: CloudProvider,
        region: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            provider,
            region: region.into(),
            properties: Properties::new(),
            source_type: String::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = source_type.into();
        self
    }

    /// Get a property as a string slice, if it is one.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// A provider-specific architecture.
///
/// `containments` maps a container to the resources it holds and
/// `dependencies` maps a resource to the resources it needs. Both maps only
/// ever reference ids present in `resources`, and a resource has at most one
/// container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub provider: CloudProvider,
    pub region: String,
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub containments: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
    #[serde(default)]
    pub dependencies: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
}

impl Architecture {
    pub fn new(provider: CloudProvider, region: impl Into<String>) -> Self {
        Self {
            provider,
            region: region.into(),
            resources: Vec::new(),
            containments: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Add a resource. Resource ids must be unique.
    pub fn add_resource(&mut self, resource: Resource) -> ArchResult<()> {
        if self.contains(&resource.id) {
            return Err(ArchError::DuplicateResource(resource.id));
        }
        self.resources.push(resource);
        Ok(())
    }

    /// Record that `parent` contains `child`.
    pub fn add_containment(&mut self, parent: &str, child: &str) -> ArchResult<()> {
        self.require(parent, "containment parent")?;
        self.require(child, "containment child")?;

        if let Some(existing) = self.container_of(child) {
            if existing != parent {
                return Err(ArchError::MultipleContainers {
                    child: child.to_string(),
                    existing: existing.to_string(),
                    requested: parent.to_string(),
                });
            }
        }

        self.containments
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());
        Ok(())
    }

    /// Record that `dependent` must be created after `dependency`.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> ArchResult<()> {
        self.require(dependent, "dependent")?;
        self.require(dependency, "dependency")?;

        self.dependencies
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
        Ok(())
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.iter().any(|r| r.id == id)
    }

    /// The container holding `child`, if any.
    pub fn container_of(&self, child: &str) -> Option<&str> {
        self.containments
            .iter()
            .find(|(_, children)| children.contains(child))
            .map(|(parent, _)| parent.as_str())
    }

    pub fn children_of(&self, parent: &str) -> impl Iterator<Item = &str> {
        self.containments
            .get(parent)
            .into_iter()
            .flat_map(|children| children.iter().map(String::as_str))
    }

    pub fn dependencies_of(&self, id: &str) -> impl Iterator<Item = &str> {
        self.dependencies
            .get(id)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn containment_count(&self) -> usize {
        self.containments.values().map(BTreeSet::len).sum()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.values().map(BTreeSet::len).sum()
    }

    /// Re-check the structural invariants, e.g. after loading from storage.
    ///
    /// Acyclicity is not checked here; that is the resolver's job.
    pub fn check_integrity(&self) -> ArchResult<()> {
        let mut ids = BTreeSet::new();
        for resource in &self.resources {
            if !ids.insert(resource.id.as_str()) {
                return Err(ArchError::DuplicateResource(resource.id.clone()));
            }
        }

        let mut parents: BTreeMap<&str, &str> = BTreeMap::new();
        for (parent, children) in &self.containments {
            self.require(parent, "containment parent")?;
            for child in children {
                self.require(child, "containment child")?;
                if let Some(existing) = parents.insert(child, parent) {
                    return Err(ArchError::MultipleContainers {
                        child: child.clone(),
                        existing: existing.to_string(),
                        requested: parent.clone(),
                    });
                }
            }
        }

        for (dependent, deps) in &self.dependencies {
            self.require(dependent, "dependent")?;
            for dep in deps {
                self.require(dep, "dependency")?;
            }
        }

        Ok(())
    }

    pub fn to_json(&self) -> ArchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> ArchResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    fn require(&self, id: &str, context: &str) -> ArchResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(ArchError::UnknownResource {
                id: id.to_string(),
                context: context.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arch() -> Architecture {
        let mut arch = Architecture::new(CloudProvider::Aws, "us-east-1");
        for (id, ty) in [("vpc", "aws_vpc"), ("subnet", "aws_subnet"), ("web", "aws_instance")] {
            arch.add_resource(Resource::new(id, ty, CloudProvider::Aws, "us-east-1"))
                .unwrap();
        }
        arch
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let mut arch = arch();
        let result = arch.add_resource(Resource::new("vpc", "aws_vpc", CloudProvider::Aws, "us-east-1"));
        assert!(matches!(result, Err(ArchError::DuplicateResource(id)) if id == "vpc"));
    }

    #[test]
    fn test_containment_is_a_forest() {
        let mut arch = arch();
        arch.add_containment("vpc", "subnet").unwrap();
        // Re-adding the same containment is fine.
        arch.add_containment("vpc", "subnet").unwrap();

        let result = arch.add_containment("web", "subnet");
        assert!(matches!(result, Err(ArchError::MultipleContainers { .. })));
        assert_eq!(arch.container_of("subnet"), Some("vpc"));
        assert_eq!(arch.children_of("vpc").collect::<Vec<_>>(), vec!["subnet"]);
    }

    #[test]
    fn test_edges_must_reference_resources() {
        let mut arch = arch();
        assert!(matches!(
            arch.add_dependency("web", "db"),
            Err(ArchError::UnknownResource { id, .. }) if id == "db"
        ));
        assert!(arch.add_containment("ghost", "web").is_err());
        assert_eq!(arch.dependency_count(), 0);
    }

    #[test]
    fn test_check_integrity_detects_tampering() {
        let mut arch = arch();
        arch.add_containment("vpc", "subnet").unwrap();
        arch.add_dependency("web", "subnet").unwrap();
        assert!(arch.check_integrity().is_ok());

        arch.containments
            .entry("web".to_string())
            .or_default()
            .insert("subnet".to_string());
        assert!(matches!(
            arch.check_integrity(),
            Err(ArchError::MultipleContainers { .. })
        ));
    }

    #[test]
    fn test_json_round_trip_is_verbatim() {
        let mut arch = arch();
        arch.add_containment("vpc", "subnet").unwrap();
        arch.add_dependency("web", "subnet").unwrap();

        let json = arch.to_json().unwrap();
        assert!(json.contains("\"type\": \"aws_vpc\""));
        assert_eq!(Architecture::from_json(&json).unwrap(), arch);
    }
}
