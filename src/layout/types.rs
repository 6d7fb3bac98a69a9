use crate::error::{EngineError, Result};
use crate::ir::{Direction, NodeId};
use crate::surface::ElementId;

/// Data tag holding a node root's record id.
pub const DATA_NODE_ID: &str = "did";
/// Data tag holding a node root's level (1 for top-level roots).
pub const DATA_LEVEL: &str = "level";
/// Data tag holding a node root's branch (section) index.
pub const DATA_SECTION: &str = "section";
/// Data tag naming which zone a group is.
pub const DATA_ZONE: &str = "zone";

/// One of the three sub-containers of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Left,
    Content,
    Right,
}

impl Zone {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Content => "content",
            Self::Right => "right",
        }
    }

    /// Zone of a parent that holds children hanging on `direction`.
    pub fn for_direction(direction: Direction) -> Option<Self> {
        match direction {
            Direction::Left => Some(Self::Left),
            Direction::Right => Some(Self::Right),
            Direction::Unset => None,
        }
    }
}

/// Deterministic, instance-namespaced element ids.
///
/// Every id is `{token}_{suffix}` so several diagrams can share one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementKeys {
    token: String,
}

impl ElementKeys {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let valid = !token.is_empty()
            && token
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(EngineError::InvalidToken(token));
        }
        Ok(Self { token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn key(&self, suffix: &str) -> ElementId {
        ElementId::new(format!("{}_{}", self.token, suffix))
    }

    /// Whole-drawing group; translated when the canvas pans.
    pub fn group_root(&self) -> ElementId {
        self.key("groot")
    }

    /// Group holding the top-level node roots.
    pub fn render_group(&self) -> ElementId {
        self.key("render")
    }

    /// Group holding every connector path.
    pub fn line_group(&self) -> ElementId {
        self.key("lines")
    }

    pub fn marker(&self) -> ElementId {
        self.key("marker")
    }

    pub fn node_root(&self, id: &NodeId) -> ElementId {
        self.key(&format!("node_{id}"))
    }

    pub fn zone(&self, zone: Zone, id: &NodeId) -> ElementId {
        self.key(&format!("{}_{id}", zone.as_str()))
    }

    pub fn content(&self, id: &NodeId) -> ElementId {
        self.zone(Zone::Content, id)
    }

    pub fn label_box(&self, id: &NodeId) -> ElementId {
        self.key(&format!("box_{id}"))
    }

    pub fn underline(&self, id: &NodeId) -> ElementId {
        self.key(&format!("underline_{id}"))
    }

    pub fn label_text(&self, id: &NodeId) -> ElementId {
        self.key(&format!("text_{id}"))
    }

    /// Connector element for the ordered pair (`first` → `second`).
    pub fn connector(&self, first: &NodeId, second: &NodeId) -> ElementId {
        self.key(&connector_id(first, second))
    }
}

/// Directional connector identifier, `line_{first}_{second}`.
///
/// Ids containing `_` can collide (`a`→`b_c` and `a_b`→`c` both give
/// `line_a_b_c`); the record parser rejects such forests up front.
pub fn connector_id(first: &NodeId, second: &NodeId) -> String {
    format!("line_{first}_{second}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_token() {
        let keys = ElementKeys::new("mm1").unwrap();
        let id = NodeId::from("1-2");
        assert_eq!(keys.node_root(&id).as_str(), "mm1_node_1-2");
        assert_eq!(keys.zone(Zone::Left, &id).as_str(), "mm1_left_1-2");
        assert_eq!(keys.group_root().as_str(), "mm1_groot");
        assert_eq!(
            keys.connector(&NodeId::from("1"), &id).as_str(),
            "mm1_line_1_1-2"
        );
    }

    #[test]
    fn connector_id_is_directional() {
        let a = NodeId::from("a");
        let b = NodeId::from("b");
        assert_ne!(connector_id(&a, &b), connector_id(&b, &a));
    }

    #[test]
    fn token_must_be_identifier_safe() {
        assert!(ElementKeys::new("").is_err());
        assert!(ElementKeys::new("has space").is_err());
        assert!(ElementKeys::new("ok-token_2").is_ok());
    }
}
