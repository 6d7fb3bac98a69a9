use crate::ir::{NodeId, NodeRecord};
use crate::layout::connector_id;
use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^mindmap\b").unwrap());
static NODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<id>[^\s\[\(\{]*)\s*(?:\(\((?P<circle>.*)\)\)|\{\{(?P<hex>.*)\}\}|\[(?P<square>.*)\]|\((?P<round>.*)\))$",
    )
    .unwrap()
});

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsDocument {
    Many(Vec<NodeRecord>),
    One(Box<NodeRecord>),
}

/// Parses a JSON (or JSON5) forest of node records.
///
/// Accepts either an array of top-level records or a single record. Missing
/// `ParentId`s are filled from the enclosing record, `"0"` at the top.
pub fn parse_nodes_json(input: &str) -> Result<Vec<NodeRecord>> {
    let document = match serde_json::from_str::<RecordsDocument>(input) {
        Ok(document) => document,
        Err(_) => json5::from_str::<RecordsDocument>(input)?,
    };
    let mut roots = match document {
        RecordsDocument::Many(roots) => roots,
        RecordsDocument::One(root) => vec![*root],
    };
    for root in &mut roots {
        fill_parent_ids(root, &NodeId::root_parent());
    }
    ensure_unique_ids(&roots)?;
    Ok(roots)
}

fn fill_parent_ids(node: &mut NodeRecord, parent: &NodeId) {
    if node.parent_id.is_empty() {
        node.parent_id = parent.clone();
    }
    let id = node.id.clone();
    for child in &mut node.children {
        fill_parent_ids(child, &id);
    }
}

fn ensure_unique_ids(roots: &[NodeRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut duplicate = None;
    let mut empty = false;
    for root in roots {
        root.walk(&mut |node| {
            if node.id.is_empty() {
                empty = true;
            } else if !seen.insert(node.id.clone()) && duplicate.is_none() {
                duplicate = Some(node.id.clone());
            }
        });
    }
    if empty {
        bail!("node record without an id");
    }
    if let Some(id) = duplicate {
        bail!("duplicate node id `{id}`");
    }
    ensure_distinct_connectors(roots)
}

/// Connector ids join both node ids with `_`, so ids containing `_` can map
/// two different edges onto one id.
fn ensure_distinct_connectors(roots: &[NodeRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut clash = None;
    for root in roots {
        root.walk(&mut |node| {
            for child in &node.children {
                let line = connector_id(&node.id, &child.id);
                if clash.is_none() && !seen.insert(line.clone()) {
                    clash = Some((line, node.id.clone(), child.id.clone()));
                }
            }
        });
    }
    if let Some((line, parent, child)) = clash {
        bail!("connector `{line}` for `{parent}` -> `{child}` collides with another edge");
    }
    Ok(())
}

/// Parses an indented outline into a node forest.
///
/// ```text
/// mindmap
///   root[Project]
///     Goals
///       g1(Ship it)
///     Risks
/// ```
///
/// Two spaces (or one tab) per level. Lines at the base indent start a new
/// top-level root. Unlabelled ids default to the node's position path, `1-2-1`.
pub fn parse_outline(input: &str) -> Result<Vec<NodeRecord>> {
    let mut roots: Vec<NodeRecord> = Vec::new();
    // Child index at each depth of the current branch.
    let mut stack: Vec<usize> = Vec::new();
    let mut base_indent: Option<usize> = None;

    for raw_line in input.lines() {
        let line = strip_trailing_comment(raw_line);
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }
        if roots.is_empty() && HEADER_RE.is_match(trimmed) {
            continue;
        }

        let indent = count_indent(line);
        let base = *base_indent.get_or_insert(indent);
        let level = (indent.saturating_sub(base) / 2).min(stack.len());
        stack.truncate(level);

        let siblings = children_at(&mut roots, &stack)?;
        let position = siblings.len();
        let path = stack
            .iter()
            .chain(std::iter::once(&position))
            .map(|index| (index + 1).to_string())
            .collect::<Vec<_>>()
            .join("-");
        let (id, label) = parse_node_token(trimmed);
        let id = if id.is_empty() { path } else { id };
        siblings.push(NodeRecord::new(id, NodeId::default(), label));
        stack.push(position);
    }

    for root in &mut roots {
        fill_parent_ids(root, &NodeId::root_parent());
    }
    ensure_unique_ids(&roots)?;
    Ok(roots)
}

fn children_at<'a>(
    roots: &'a mut Vec<NodeRecord>,
    path: &[usize],
) -> Result<&'a mut Vec<NodeRecord>> {
    let mut siblings = roots;
    for &index in path {
        match siblings.get_mut(index) {
            Some(node) => siblings = &mut node.children,
            None => bail!("outline nesting is inconsistent"),
        }
    }
    Ok(siblings)
}

fn parse_node_token(token: &str) -> (String, String) {
    let Some(caps) = NODE_RE.captures(token) else {
        return (String::new(), token.to_string());
    };
    let label = ["circle", "hex", "square", "round"]
        .iter()
        .find_map(|name| caps.name(name))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    let id = caps
        .name("id")
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    (id, label)
}

fn strip_trailing_comment(line: &str) -> &str {
    match line.find(" %%") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn count_indent(line: &str) -> usize {
    let mut count = 0;
    for ch in line.chars() {
        match ch {
            ' ' => count += 1,
            '\t' => count += 2,
            _ => break,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pascal_case_records() {
        let input = r#"[{"Id": 1, "Name": "Root", "Childrens": [
            {"Id": "2", "Name": "A", "Remark": "note"},
            {"Id": 3, "ParentId": "1", "Name": "B", "Tags": ["x"]}
        ]}]"#;
        let roots = parse_nodes_json(input).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, NodeId::from("1"));
        assert!(roots[0].is_top_level());
        assert_eq!(roots[0].children[0].parent_id, NodeId::from("1"));
        assert_eq!(roots[0].children[0].remark.as_deref(), Some("note"));
        assert_eq!(roots[0].children[1].tags, vec!["x".to_string()]);
    }

    #[test]
    fn accepts_json5_single_record() {
        let input = "{Id: 'r', Name: 'Root', Children: [{Id: 'a', Name: 'A',},],}";
        let roots = parse_nodes_json(input).unwrap();
        assert_eq!(roots[0].children[0].id, NodeId::from("a"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let input = r#"[{"Id": "a", "Children": [{"Id": "a"}]}]"#;
        let err = parse_nodes_json(input).unwrap_err();
        assert!(err.to_string().contains("duplicate node id `a`"));
    }

    #[test]
    fn rejects_edges_sharing_a_connector_id() {
        let input = r#"[
            {"Id": "a", "Children": [{"Id": "b_c"}]},
            {"Id": "a_b", "Children": [{"Id": "c"}]}
        ]"#;
        let err = parse_nodes_json(input).unwrap_err();
        assert!(err.to_string().contains("connector `line_a_b_c`"), "{err}");

        let input = r#"[{"Id": "top_1", "Children": [{"Id": "leaf_1"}, {"Id": "leaf_2"}]}]"#;
        assert_eq!(parse_nodes_json(input).unwrap()[0].children.len(), 2);
    }

    #[test]
    fn outline_nesting_and_default_ids() {
        let input = "mindmap\n  root[Project]\n    Goals\n      g1(Ship it)\n      Polish\n    Risks %% later\n";
        let roots = parse_outline(input).unwrap();
        assert_eq!(roots.len(), 1);
        let root = &roots[0];
        assert_eq!(root.id, NodeId::from("root"));
        assert_eq!(root.name, "Project");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].id, NodeId::from("1-1"));
        assert_eq!(root.children[0].children[0].id, NodeId::from("g1"));
        assert_eq!(root.children[0].children[0].name, "Ship it");
        assert_eq!(root.children[0].children[1].id, NodeId::from("1-1-2"));
        assert_eq!(root.children[1].name, "Risks");
        assert_eq!(root.children[0].children[0].parent_id, NodeId::from("1-1"));
    }

    #[test]
    fn outline_base_indent_starts_new_roots() {
        let roots = parse_outline("First\n  a\nSecond\n  b\n").unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[1].id, NodeId::from("2"));
        assert_eq!(roots[1].children[0].id, NodeId::from("2-1"));
    }

    #[test]
    fn over_indented_lines_nest_one_level() {
        let roots = parse_outline("r\n        deep\n").unwrap();
        assert_eq!(roots[0].children[0].id, NodeId::from("1-1"));
    }
}
