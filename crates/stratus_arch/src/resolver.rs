//! Dependency resolution for architectures.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::architecture::{Architecture, Resource};
use crate::error::{ArchError, ArchResult};

/// Orders resources so that everything a resource needs comes before it.
///
/// Containment and dependency edges are merged into a single happens-before
/// graph: a container precedes what it contains and a dependency precedes its
/// dependents. Among resources that are ready at the same time the smallest id
/// is emitted first, so the order is stable across runs.
pub struct DependencyResolver;

impl DependencyResolver {
    /// Topologically sort the resources of an architecture.
    ///
    /// Returns [`ArchError::CyclicDependency`] naming every resource that could
    /// not be ordered; no partial order is returned in that case.
    pub fn sort(architecture: &Architecture) -> ArchResult<Vec<Resource>> {
        let order = Self::sort_ids(architecture)?;
        let by_id: BTreeMap<&str, &Resource> = architecture
            .resources
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect();

        Ok(order
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|r| (*r).clone()))
            .collect())
    }

    /// Like [`sort`](Self::sort) but returns resource ids only.
    pub fn sort_ids(architecture: &Architecture) -> ArchResult<Vec<String>> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for resource in &architecture.resources {
            if in_degree.insert(resource.id.as_str(), 0).is_some() {
                return Err(ArchError::DuplicateResource(resource.id.clone()));
            }
        }

        let mut edges: Vec<(&str, &str)> = Vec::new();
        for (parent, children) in &architecture.containments {
            let parent = key(&in_degree, parent, "containment parent")?;
            for child in children {
                edges.push((parent, key(&in_degree, child, "containment child")?));
            }
        }
        for (dependent, deps) in &architecture.dependencies {
            let dependent = key(&in_degree, dependent, "dependent")?;
            for dep in deps {
                edges.push((key(&in_degree, dep, "dependency")?, dependent));
            }
        }

        let mut successors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (before, after) in edges {
            successors.entry(before).or_default().push(after);
            *in_degree.entry(after).or_default() += 1;
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());

        while let Some(id) = ready.pop_first() {
            order.push(id.to_string());
            if let Some(next) = successors.get(id) {
                for succ in next {
                    if let Some(degree) = in_degree.get_mut(succ) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(*succ);
                        }
                    }
                }
            }
        }

        if order.len() < in_degree.len() {
            let ids: BTreeSet<String> = in_degree
                .iter()
                .filter(|(_, degree)| **degree > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            warn!("Dependency cycle leaves {} resources unordered", ids.len());
            return Err(ArchError::CyclicDependency { ids });
        }

        debug!("Resolved order for {} resources", order.len());
        Ok(order)
    }

    /// Whether the architecture can be ordered.
    pub fn is_acyclic(architecture: &Architecture) -> bool {
        !matches!(
            Self::sort_ids(architecture),
            Err(ArchError::CyclicDependency { .. })
        )
    }
}

/// Resolve an id to the key stored in the degree table.
fn key<'a>(in_degree: &BTreeMap<&'a str, usize>, id: &str, context: &str) -> ArchResult<&'a str> {
    in_degree
        .get_key_value(id)
        .map(|(k, _)| *k)
        .ok_or_else(|| ArchError::UnknownResource {
            id: id.to_string(),
            context: context.to_string(),
        })
}
