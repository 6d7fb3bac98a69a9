use thiserror::Error;

use crate::ir::NodeId;
use crate::surface::SurfaceError;

/// Failures raised by the layout engine, the connector router and the facade.
///
/// Interaction (drag/pan) code never returns these to the shell; it logs and
/// abandons the gesture step instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("surface already initialized: `{0}` exists")]
    SurfaceInitialized(String),
    #[error("node `{0}` is already rendered")]
    DuplicateNode(NodeId),
    #[error("connector `{0}` already exists")]
    ConnectorExists(String),
    #[error("connector group `{0}` is missing")]
    MissingLineGroup(String),
    #[error("node `{0}` has no rendered content zone")]
    NodeNotRendered(NodeId),
    #[error("node `{id}` at level {level} has no direction")]
    MissingDirection { id: NodeId, level: usize },
    #[error("node `{0}` not found")]
    NodeNotFound(NodeId),
    #[error("invalid instance token `{0}`")]
    InvalidToken(String),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
