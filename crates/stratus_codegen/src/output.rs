//! Generated output files.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CodegenError, CodegenResult};

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub path: String,
    pub content: String,
    #[serde(rename = "type")]
    pub file_type: String,
}

/// The set of files produced by one generation run.
///
/// Paths are unique within an output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub files: Vec<OutputFile>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, rejecting paths already present.
    pub fn add_file(
        &mut self,
        path: impl Into<String>,
        content: impl Into<String>,
        file_type: impl Into<String>,
    ) -> CodegenResult<()> {
        let path = path.into();
        if self.contains(&path) {
            return Err(CodegenError::DuplicatePath(path));
        }
        self.files.push(OutputFile {
            path,
            content: content.into(),
            file_type: file_type.into(),
        });
        Ok(())
    }

    pub fn file(&self, path: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write all files below `dir`, creating directories as needed.
    ///
    /// Paths must be relative and stay inside `dir`.
    pub fn write_to(&self, dir: &Path) -> CodegenResult<Vec<PathBuf>> {
        info!("Writing {} generated files to {:?}", self.files.len(), dir);

        let mut written = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let relative = Path::new(&file.path);
            let escapes = relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes || file.path.is_empty() {
                return Err(CodegenError::InvalidPath(file.path.clone()));
            }

            let target = dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &file.content)?;
            debug!("Wrote {:?}", target);
            written.push(target);
        }

        Ok(written)
    }
}
