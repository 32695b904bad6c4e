//! Project storage.
//!
//! Two [`ProjectService`] implementations: an in-memory store for tests and
//! embedding, and a file store that keeps each project under the workspace:
//!
//! ```text
//! .stratus/projects/<projectId>/
//! ├── project.json       # Project record
//! ├── diagram.json       # Source diagram (if supplied)
//! ├── architecture.json  # Compiled architecture
//! └── pricing.json       # Stored pricing estimates
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use stratus_arch::Architecture;
use stratus_graph::DiagramDocument;

use crate::error::{CoreError, CoreResult};
use crate::pricing::{PricingEstimate, PricingEstimator};
use crate::project::{CreateProjectRequest, Project};
use crate::services::ProjectService;

const PROJECT_FILE: &str = "project.json";
const DIAGRAM_FILE: &str = "diagram.json";
const ARCHITECTURE_FILE: &str = "architecture.json";
const PRICING_FILE: &str = "pricing.json";

#[derive(Debug, Clone)]
struct StoredProject {
    project: Project,
    diagram: Option<DiagramDocument>,
    architecture: Option<Architecture>,
    pricing: Vec<PricingEstimate>,
}

/// Project store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryProjectService {
    projects: RwLock<HashMap<String, StoredProject>>,
    estimator: PricingEstimator,
}

impl InMemoryProjectService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_estimator(mut self, estimator: PricingEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }

    /// The diagram a project was created from.
    pub fn diagram(&self, project_id: &str) -> Option<DiagramDocument> {
        self.projects
            .read()
            .get(project_id)
            .and_then(|p| p.diagram.clone())
    }

    fn with_project<T>(
        &self,
        project_id: &str,
        f: impl FnOnce(&mut StoredProject) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let mut projects = self.projects.write();
        let stored = projects
            .get_mut(project_id)
            .ok_or_else(|| CoreError::ProjectNotFound(project_id.to_string()))?;
        f(stored)
    }
}

#[async_trait]
impl ProjectService for InMemoryProjectService {
    async fn create(&self, request: CreateProjectRequest) -> CoreResult<Project> {
        let project = Project::new(&request);
        debug!("Creating project {} ({})", project.name, project.id);
        self.projects.write().insert(
            project.id.clone(),
            StoredProject {
                project: project.clone(),
                diagram: request.diagram,
                architecture: None,
                pricing: Vec::new(),
            },
        );
        Ok(project)
    }

    async fn get_by_id(&self, project_id: &str) -> CoreResult<Project> {
        self.projects
            .read()
            .get(project_id)
            .map(|p| p.project.clone())
            .ok_or_else(|| CoreError::ProjectNotFound(project_id.to_string()))
    }

    async fn persist_architecture(&self, project_id: &str, architecture: &Architecture) -> CoreResult<()> {
        self.with_project(project_id, |stored| {
            stored.architecture = Some(architecture.clone());
            stored.project.touch();
            Ok(())
        })
    }

    async fn persist_architecture_with_pricing(
        &self,
        project_id: &str,
        architecture: &Architecture,
        duration: Duration,
    ) -> CoreResult<PricingEstimate> {
        let estimate = self.estimator.estimate(architecture, duration);
        self.with_project(project_id, |stored| {
            stored.architecture = Some(architecture.clone());
            stored.pricing.push(estimate.clone());
            stored.project.touch();
            Ok(estimate)
        })
    }

    async fn load_architecture(&self, project_id: &str) -> CoreResult<Architecture> {
        self.with_project(project_id, |stored| {
            stored.architecture.clone().ok_or_else(|| {
                CoreError::Persistence(format!("no architecture stored for project {}", project_id))
            })
        })
    }

    async fn get_project_pricing(&self, project_id: &str) -> CoreResult<Vec<PricingEstimate>> {
        self.with_project(project_id, |stored| Ok(stored.pricing.clone()))
    }

    async fn list_by_user_id(&self, user_id: &str) -> CoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .values()
            .filter(|p| p.project.user_id == user_id)
            .map(|p| p.project.clone())
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    async fn update(&self, mut project: Project) -> CoreResult<Project> {
        self.with_project(&project.id.clone(), |stored| {
            project.created_at = stored.project.created_at;
            project.touch();
            stored.project = project.clone();
            Ok(project)
        })
    }

    async fn delete(&self, project_id: &str) -> CoreResult<()> {
        self.projects
            .write()
            .remove(project_id)
            .map(|_| ())
            .ok_or_else(|| CoreError::ProjectNotFound(project_id.to_string()))
    }
}

/// Project store backed by JSON files in a workspace directory.
#[derive(Debug, Clone)]
pub struct FileProjectService {
    workspace_root: PathBuf,
    estimator: PricingEstimator,
}

impl FileProjectService {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
            estimator: PricingEstimator::new(),
        }
    }

    pub fn with_estimator(mut self, estimator: PricingEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    fn projects_dir(&self) -> PathBuf {
        self.workspace_root.join(".stratus").join("projects")
    }

    /// Directory of an existing project.
    fn project_dir(&self, project_id: &str) -> CoreResult<PathBuf> {
        let valid = !project_id.is_empty()
            && project_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        let dir = self.projects_dir().join(project_id);
        if !valid || !dir.join(PROJECT_FILE).is_file() {
            return Err(CoreError::ProjectNotFound(project_id.to_string()));
        }
        Ok(dir)
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> CoreResult<()> {
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn read_project(dir: &Path) -> CoreResult<Project> {
        let content = fs::read_to_string(dir.join(PROJECT_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn read_pricing(dir: &Path) -> CoreResult<Vec<PricingEstimate>> {
        let path = dir.join(PRICING_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_architecture(&self, dir: &Path, architecture: &Architecture) -> CoreResult<()> {
        fs::write(dir.join(ARCHITECTURE_FILE), architecture.to_json()?)?;

        let mut project = Self::read_project(dir)?;
        project.touch();
        Self::write_json(&dir.join(PROJECT_FILE), &project)
    }

    /// The diagram a project was created from, if it was stored.
    pub fn load_diagram(&self, project_id: &str) -> CoreResult<Option<DiagramDocument>> {
        let path = self.project_dir(project_id)?.join(DIAGRAM_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Every stored project, oldest first.
    pub fn list_all(&self) -> CoreResult<Vec<Project>> {
        let root = self.projects_dir();
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in WalkDir::new(&root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| CoreError::Persistence(e.to_string()))?;
            if entry.file_type().is_file() && entry.file_name() == PROJECT_FILE {
                let Some(dir) = entry.path().parent() else {
                    continue;
                };
                match Self::read_project(dir) {
                    Ok(project) => projects.push(project),
                    Err(e) => warn!("Skipping unreadable project at {:?}: {}", dir, e),
                }
            }
        }
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }
}

#[async_trait]
impl ProjectService for FileProjectService {
    async fn create(&self, request: CreateProjectRequest) -> CoreResult<Project> {
        let project = Project::new(&request);
        let dir = self.projects_dir().join(&project.id);
        fs::create_dir_all(&dir)?;

        Self::write_json(&dir.join(PROJECT_FILE), &project)?;
        if let Some(diagram) = &request.diagram {
            Self::write_json(&dir.join(DIAGRAM_FILE), diagram)?;
        }

        info!("Created project {} at {:?}", project.id, dir);
        Ok(project)
    }

    async fn get_by_id(&self, project_id: &str) -> CoreResult<Project> {
        Self::read_project(&self.project_dir(project_id)?)
    }

    async fn persist_architecture(&self, project_id: &str, architecture: &Architecture) -> CoreResult<()> {
        let dir = self.project_dir(project_id)?;
        self.save_architecture(&dir, architecture)?;
        debug!("Persisted architecture for project {}", project_id);
        Ok(())
    }

    async fn persist_architecture_with_pricing(
        &self,
        project_id: &str,
        architecture: &Architecture,
        duration: Duration,
    ) -> CoreResult<PricingEstimate> {
        let dir = self.project_dir(project_id)?;
        self.save_architecture(&dir, architecture)?;

        let estimate = self.estimator.estimate(architecture, duration);
        let mut pricing = Self::read_pricing(&dir)?;
        pricing.push(estimate.clone());
        Self::write_json(&dir.join(PRICING_FILE), &pricing)?;

        debug!(
            "Persisted architecture and pricing ({}) for project {}",
            estimate.format_total(),
            project_id
        );
        Ok(estimate)
    }

    async fn load_architecture(&self, project_id: &str) -> CoreResult<Architecture> {
        let path = self.project_dir(project_id)?.join(ARCHITECTURE_FILE);
        if !path.exists() {
            return Err(CoreError::Persistence(format!(
                "no architecture stored for project {}",
                project_id
            )));
        }

        let architecture = Architecture::from_json(&fs::read_to_string(path)?)?;
        architecture.check_integrity()?;
        Ok(architecture)
    }

    async fn get_project_pricing(&self, project_id: &str) -> CoreResult<Vec<PricingEstimate>> {
        Self::read_pricing(&self.project_dir(project_id)?)
    }

    async fn list_by_user_id(&self, user_id: &str) -> CoreResult<Vec<Project>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect())
    }

    async fn update(&self, mut project: Project) -> CoreResult<Project> {
        let dir = self.project_dir(&project.id)?;
        let existing = Self::read_project(&dir)?;
        project.created_at = existing.created_at;
        project.touch();
        Self::write_json(&dir.join(PROJECT_FILE), &project)?;
        Ok(project)
    }

    async fn delete(&self, project_id: &str) -> CoreResult<()> {
        let dir = self.project_dir(project_id)?;
        fs::remove_dir_all(&dir)?;
        info!("Deleted project {}", project_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_arch::{CloudProvider, Resource};
    use tempfile::tempdir;

    fn request(user: &str) -> CreateProjectRequest {
        CreateProjectRequest::new(user, "shop", "terraform", CloudProvider::Aws, "us-east-1")
    }

    fn arch() -> Architecture {
        let mut arch = Architecture::new(CloudProvider::Aws, "us-east-1");
        arch.add_resource(Resource::new("vpc", "aws_vpc", CloudProvider::Aws, "us-east-1"))
            .unwrap();
        arch.add_resource(Resource::new("web", "aws_instance", CloudProvider::Aws, "us-east-1"))
            .unwrap();
        arch.add_dependency("web", "vpc").unwrap();
        arch
    }

    #[tokio::test]
    async fn test_in_memory_lifecycle() {
        let store = InMemoryProjectService::new();
        let project = store.create(request("u1")).await.unwrap();

        assert!(matches!(
            store.load_architecture(&project.id).await,
            Err(CoreError::Persistence(_))
        ));

        store.persist_architecture(&project.id, &arch()).await.unwrap();
        assert_eq!(store.load_architecture(&project.id).await.unwrap(), arch());

        store.delete(&project.id).await.unwrap();
        assert!(matches!(
            store.get_by_id(&project.id).await,
            Err(CoreError::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_in_memory_pricing_and_listing() {
        let store = InMemoryProjectService::new();
        let a = store.create(request("u1")).await.unwrap();
        store.create(request("u2")).await.unwrap();

        let estimate = store
            .persist_architecture_with_pricing(&a.id, &arch(), Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(store.get_project_pricing(&a.id).await.unwrap(), vec![estimate]);
        assert_eq!(store.list_by_user_id("u1").await.unwrap().len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileProjectService::new(dir.path());
        let project = store.create(request("u1")).await.unwrap();

        assert!(dir
            .path()
            .join(".stratus/projects")
            .join(&project.id)
            .join("project.json")
            .is_file());

        store.persist_architecture(&project.id, &arch()).await.unwrap();
        assert_eq!(store.load_architecture(&project.id).await.unwrap(), arch());
        assert!(store.get_project_pricing(&project.id).await.unwrap().is_empty());
        assert_eq!(store.load_diagram(&project.id).unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_update_keeps_created_at() {
        let dir = tempdir().unwrap();
        let store = FileProjectService::new(dir.path());
        let project = store.create(request("u1")).await.unwrap();

        let mut renamed = project.clone();
        renamed.name = "renamed".to_string();
        renamed.created_at = chrono::Utc::now() + chrono::Duration::days(1);
        let updated = store.update(renamed).await.unwrap();

        assert_eq!(updated.created_at, project.created_at);
        assert_eq!(store.get_by_id(&project.id).await.unwrap().name, "renamed");
    }

    #[tokio::test]
    async fn test_file_store_rejects_bad_ids() {
        let dir = tempdir().unwrap();
        let store = FileProjectService::new(dir.path());

        for id in ["", "../etc", "missing"] {
            assert!(matches!(
                store.get_by_id(id).await,
                Err(CoreError::ProjectNotFound(_))
            ));
        }
        assert!(store.list_all().unwrap().is_empty());
    }
}
