//! Project records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stratus_arch::CloudProvider;
use stratus_graph::DiagramDocument;

/// Unique identifier for a project.
pub type ProjectId = String;

/// A compiled diagram owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: String,
    pub name: String,
    /// Engine used when a generate request names none. May be empty.
    #[serde(default)]
    pub iac_tool: String,
    /// Provider used when a generate request names none.
    #[serde(default)]
    pub cloud_provider: Option<CloudProvider>,
    pub region: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a project with a fresh id.
    pub fn new(request: &CreateProjectRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            name: request.name.clone(),
            iac_tool: request.iac_tool.clone(),
            cloud_provider: Some(request.cloud_provider),
            region: request.region.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the modification time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Input for creating a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub user_id: String,
    pub name: String,
    pub iac_tool: String,
    pub cloud_provider: CloudProvider,
    pub region: String,
    /// Source diagram, kept alongside the project when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<DiagramDocument>,
}

impl CreateProjectRequest {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        iac_tool: impl Into<String>,
        cloud_provider: CloudProvider,
        region: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            iac_tool: iac_tool.into(),
            cloud_provider,
            region: region.into(),
            diagram: None,
        }
    }

    pub fn with_diagram(mut self, diagram: DiagramDocument) -> Self {
        self.diagram = Some(diagram);
        self
    }
}
