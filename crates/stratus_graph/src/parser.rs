//! Diagram document parsing.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::model::{DiagramDocument, DiagramGraph};

/// Parser for diagram JSON documents.
pub struct DiagramParser;

impl DiagramParser {
    /// Parse raw diagram bytes into a graph.
    ///
    /// Only the document shape is checked here. Structural defects such as
    /// dangling edges or duplicate ids are left for the validator so they can
    /// all be reported together.
    pub fn parse(bytes: &[u8]) -> GraphResult<DiagramGraph> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(GraphError::EmptyDocument);
        }

        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if !value.is_object() {
            return Err(GraphError::InvalidFormat(
                "top-level value must be an object with `nodes` and `edges`".to_string(),
            ));
        }

        let document: DiagramDocument = serde_json::from_value(value)?;
        debug!(
            "Parsed diagram with {} nodes and {} edges",
            document.nodes.len(),
            document.edges.len()
        );

        Ok(DiagramGraph::from_document(document))
    }

    /// Parse a diagram from a string.
    pub fn parse_str(content: &str) -> GraphResult<DiagramGraph> {
        Self::parse(content.as_bytes())
    }

    /// Read and parse a diagram file.
    pub fn read_file(path: impl AsRef<Path>) -> GraphResult<DiagramGraph> {
        let path = path.as_ref();
        debug!("Reading diagram from {:?}", path);

        let bytes = fs::read(path).map_err(|e| {
            GraphError::InvalidFormat(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&bytes)
    }

    /// Serialize a graph back to its JSON document form.
    pub fn to_json(graph: &DiagramGraph) -> GraphResult<String> {
        Ok(serde_json::to_string_pretty(&graph.to_document())?)
    }
}
