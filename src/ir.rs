use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Parent id carried by top-level roots.
pub const ROOT_PARENT_ID: &str = "0";

/// Opaque node identifier. Input may be a string or a number; comparison is
/// always by string value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root_parent() -> Self {
        Self(ROOT_PARENT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root_parent(&self) -> bool {
        self.0 == ROOT_PARENT_ID
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Int(value) => Self(value.to_string()),
            RawId::Float(value) => Self(value.to_string()),
        })
    }
}

/// Side of the diagram a node hangs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Unset,
    Left,
    Right,
}

impl Direction {
    /// Side for the `position`-th (1-indexed) child of a top-level root.
    pub fn for_top_level_child(position: usize) -> Self {
        if position % 2 == 0 {
            Self::Left
        } else {
            Self::Right
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Unset => Self::Unset,
        }
    }

    pub fn is_set(self) -> bool {
        self != Self::Unset
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "Childrens")]
    pub children: Vec<NodeRecord>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NodeRecord {
    pub fn new(
        id: impl Into<NodeId>,
        parent_id: impl Into<NodeId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper; sets each child's `parent_id` to this node.
    pub fn with_children(mut self, children: Vec<NodeRecord>) -> Self {
        for mut child in children {
            child.parent_id = self.id.clone();
            self.children.push(child);
        }
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_root_parent()
    }

    /// Sets `direction` on this node and every descendant.
    pub fn set_direction_deep(&mut self, direction: Direction) {
        self.direction = direction;
        for child in &mut self.children {
            child.set_direction_deep(direction);
        }
    }

    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NodeRecord)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Where a node sits in the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    /// 1 for top-level roots.
    pub level: usize,
    /// Logical parent; `None` for top-level roots.
    pub parent: Option<NodeId>,
}

/// The diagram's forest of node records.
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    roots: Vec<NodeRecord>,
}

impl NodeTree {
    pub fn new(roots: Vec<NodeRecord>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[NodeRecord] {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut [NodeRecord] {
        &mut self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of records in the forest.
    pub fn len(&self) -> usize {
        let mut count = 0;
        for root in &self.roots {
            root.walk(&mut |_| count += 1);
        }
        count
    }

    pub fn find(&self, id: &str) -> Option<&NodeRecord> {
        find_in(&self.roots, id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut NodeRecord> {
        find_in_mut(&mut self.roots, id)
    }

    pub fn locate(&self, id: &str) -> Option<NodeLocation> {
        locate_in(&self.roots, id, 1, None)
    }

    pub fn parent_of(&self, id: &str) -> Option<&NodeRecord> {
        let parent = self.locate(id)?.parent?;
        self.find(parent.as_str())
    }

    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.locate(id).map(|location| location.level)
    }
}

fn find_in<'a>(nodes: &'a [NodeRecord], id: &str) -> Option<&'a NodeRecord> {
    for node in nodes {
        if node.id == *id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(nodes: &'a mut [NodeRecord], id: &str) -> Option<&'a mut NodeRecord> {
    for node in nodes.iter_mut() {
        if node.id == *id {
            return Some(node);
        }
        if let Some(found) = find_in_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn locate_in(
    nodes: &[NodeRecord],
    id: &str,
    level: usize,
    parent: Option<&NodeId>,
) -> Option<NodeLocation> {
    for node in nodes {
        if node.id == *id {
            return Some(NodeLocation {
                level,
                parent: parent.cloned(),
            });
        }
        if let Some(found) = locate_in(&node.children, id, level + 1, Some(&node.id)) {
            return Some(found);
        }
    }
    None
}
