//! Error types for the core pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// A step of the compile or generate pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Parse,
    ValidateDiagram,
    MapArchitecture,
    ValidateRules,
    CreateProject,
    PersistArchitecture,
    LoadProject,
    LoadArchitecture,
    SelectEngine,
    Generate,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::ValidateDiagram => "validate_diagram",
            Self::MapArchitecture => "map_architecture",
            Self::ValidateRules => "validate_rules",
            Self::CreateProject => "create_project",
            Self::PersistArchitecture => "persist_architecture",
            Self::LoadProject => "load_project",
            Self::LoadArchitecture => "load_architecture",
            Self::SelectEngine => "select_engine",
            Self::Generate => "generate",
        }
    }

    /// Prefix used when a failure in this stage is reported.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Parse => "failed to parse diagram",
            Self::ValidateDiagram => "failed to validate diagram",
            Self::MapArchitecture => "failed to map diagram to architecture",
            Self::ValidateRules => "failed to validate architecture rules",
            Self::CreateProject => "failed to create project",
            Self::PersistArchitecture => "failed to persist architecture",
            Self::LoadProject => "failed to load project",
            Self::LoadArchitecture => "failed to load architecture",
            Self::SelectEngine => "failed to select engine",
            Self::Generate => "failed to generate code",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur in the core pipeline and its services.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Parse error: {0}")]
    Parse(#[from] stratus_graph::GraphError),

    #[error("Diagram has {} error(s): {}", .errors.len(), .errors.join("; "))]
    DiagramValidation { errors: Vec<String> },

    #[error("{0}")]
    Mapping(#[from] stratus_arch::ArchError),

    #[error("Architecture violates {} rule(s): {}", .violations.len(), .violations.join("; "))]
    RuleValidation { violations: Vec<String> },

    #[error("Code generation error: {0}")]
    Codegen(#[from] stratus_codegen::CodegenError),

    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}: {source}", .stage.action())]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Wrap an error with the stage it happened in.
    pub fn at(stage: PipelineStage, source: impl Into<CoreError>) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source.into()),
        }
    }

    /// The stage that failed, if the error was raised by the pipeline.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost cause, below any stage wrappers.
    pub fn root(&self) -> &CoreError {
        let mut current = self;
        while let Self::Stage { source, .. } = current {
            current = source;
        }
        current
    }

    /// Whether the request was stopped by cancellation or its deadline.
    pub fn is_interrupted(&self) -> bool {
        matches!(self.root(), Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Extension for attaching a stage to fallible results.
pub trait StageExt<T> {
    fn stage(self, stage: PipelineStage) -> CoreResult<T>;
}

impl<T, E: Into<CoreError>> StageExt<T> for Result<T, E> {
    fn stage(self, stage: PipelineStage) -> CoreResult<T> {
        self.map_err(|e| CoreError::at(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_message_and_root() {
        let err = CoreError::at(
            PipelineStage::MapArchitecture,
            CoreError::InvalidRequest("bad".to_string()),
        );

        assert_eq!(
            err.to_string(),
            "failed to map diagram to architecture: Invalid request: bad"
        );
        assert_eq!(err.stage(), Some(PipelineStage::MapArchitecture));
        assert!(matches!(err.root(), CoreError::InvalidRequest(_)));
    }

    #[test]
    fn test_stage_ext() {
        let result: Result<(), CoreError> = Err(CoreError::Cancelled);
        let err = result.stage(PipelineStage::Generate).unwrap_err();

        assert!(err.is_interrupted());
        assert_eq!(err.stage(), Some(PipelineStage::Generate));
    }

    #[test]
    fn test_validation_messages() {
        let err = CoreError::DiagramValidation {
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Diagram has 2 error(s): a; b");
    }
}
