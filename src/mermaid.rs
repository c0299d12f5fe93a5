//! Mermaid flowchart import and export.
//!
//! Export writes a `graph TD` document with circle nodes as `id(("text"))`
//! and rectangles as `id["text"]`. The magnet node and its edges are an
//! editing aid, not content, and are left out. Import accepts the same
//! subset and lays imported nodes out on a spiral so the force layout has
//! something reasonable to relax from.

use crate::types::{Edge, IdGen, MindMap, Node, NodeId, Shape};
use std::collections::HashMap;
use std::fmt;

/// Error from parsing a mermaid document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MermaidError {
    /// A line was not a header, a node definition or an edge.
    UnrecognizedLine {
        /// 1-based line number.
        line: usize,
        /// The offending content.
        content: String,
    },
    /// An edge line was missing an endpoint.
    MalformedEdge {
        /// 1-based line number.
        line: usize,
    },
}

impl fmt::Display for MermaidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MermaidError::UnrecognizedLine { line, content } => {
                write!(f, "line {line}: unrecognized syntax: {content:?}")
            }
            MermaidError::MalformedEdge { line } => {
                write!(f, "line {line}: edge is missing an endpoint")
            }
        }
    }
}

impl std::error::Error for MermaidError {}

fn escape(text: &str) -> String {
    text.replace('"', "'").replace('\n', "<br/>")
}

fn unescape(text: &str) -> String {
    text.replace("<br/>", "\n")
}

/// Serializes the map as a mermaid flowchart.
pub fn export(map: &MindMap) -> String {
    let magnet = map.magnet();
    let mut aliases: HashMap<NodeId, String> = HashMap::new();
    let mut out = String::from("graph TD\n");

    for (i, node) in map
        .nodes
        .iter()
        .filter(|n| !n.is_magnet())
        .enumerate()
    {
        let alias = format!("n{i}");
        let text = escape(&node.text);
        match node.shape {
            Shape::Circle => out.push_str(&format!("    {alias}((\"{text}\"))\n")),
            Shape::Rectangle => out.push_str(&format!("    {alias}[\"{text}\"]\n")),
        }
        aliases.insert(node.id, alias);
    }

    for edge in &map.edges {
        if magnet.map(|m| edge.touches(m)).unwrap_or(false) {
            continue;
        }
        let (Some(src), Some(dst)) = (aliases.get(&edge.source), aliases.get(&edge.target))
        else {
            continue;
        };
        match &edge.label {
            Some(label) => {
                out.push_str(&format!("    {src} -->|{}| {dst}\n", escape(label)))
            }
            None => out.push_str(&format!("    {src} --> {dst}\n")),
        }
    }
    out
}

/// An endpoint token: a bare alias or an inline node definition.
struct Endpoint<'a> {
    alias: &'a str,
    def: Option<(String, Shape)>,
}

fn parse_endpoint(token: &str) -> Option<Endpoint<'_>> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if let Some(open) = token.find("((\"") {
        let rest = &token[open + 3..];
        let close = rest.find("\"))")?;
        return Some(Endpoint {
            alias: token[..open].trim(),
            def: Some((unescape(&rest[..close]), Shape::Circle)),
        });
    }
    if let Some(open) = token.find("[\"") {
        let rest = &token[open + 2..];
        let close = rest.find("\"]")?;
        return Some(Endpoint {
            alias: token[..open].trim(),
            def: Some((unescape(&rest[..close]), Shape::Rectangle)),
        });
    }
    if token.contains(|c: char| c.is_whitespace() || "()[]\"|".contains(c)) {
        return None;
    }
    Some(Endpoint { alias: token, def: None })
}

/// Parses a mermaid flowchart into a fresh map.
///
/// Nodes are placed on an outward spiral from the origin; the layout engine
/// relaxes them from there.
pub fn import(text: &str, ids: &mut IdGen) -> Result<MindMap, MermaidError> {
    let mut map = MindMap::new();
    let mut by_alias: HashMap<String, NodeId> = HashMap::new();

    let intern = |map: &mut MindMap,
                  by_alias: &mut HashMap<String, NodeId>,
                  ids: &mut IdGen,
                  endpoint: Endpoint<'_>|
     -> NodeId {
        if let Some(&id) = by_alias.get(endpoint.alias) {
            if let Some((text, shape)) = endpoint.def {
                if let Some(node) = map.node_mut(id) {
                    node.text = text;
                    node.shape = shape;
                }
            }
            return id;
        }
        let index = by_alias.len();
        let angle = index as f32 * 0.8;
        let radius = 60.0 + index as f32 * 45.0;
        let position = (angle.cos() * radius, angle.sin() * radius);
        let (text, shape) = endpoint
            .def
            .unwrap_or((endpoint.alias.to_string(), Shape::Circle));
        let id = map.add_node(Node::new(ids.next(), text, position, shape));
        by_alias.insert(endpoint.alias.to_string(), id);
        id
    };

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("%%") {
            continue;
        }
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("graph") || lower.starts_with("flowchart") {
            continue;
        }

        if let Some((left, right)) = line.split_once("-->") {
            let (label, right) = match right.trim_start().strip_prefix('|') {
                Some(rest) => {
                    let close = rest
                        .find('|')
                        .ok_or(MermaidError::MalformedEdge { line: line_no })?;
                    (
                        Some(unescape(rest[..close].trim())),
                        &rest[close + 1..],
                    )
                }
                None => (None, right),
            };
            let src = parse_endpoint(left)
                .ok_or(MermaidError::MalformedEdge { line: line_no })?;
            let dst = parse_endpoint(right)
                .ok_or(MermaidError::MalformedEdge { line: line_no })?;
            let src = intern(&mut map, &mut by_alias, ids, src);
            let dst = intern(&mut map, &mut by_alias, ids, dst);
            let mut edge = Edge::new(ids.next(), src, dst);
            edge.label = label.filter(|l| !l.is_empty());
            map.edges.push(edge);
            continue;
        }

        match parse_endpoint(line) {
            Some(endpoint) if endpoint.def.is_some() => {
                intern(&mut map, &mut by_alias, ids, endpoint);
            }
            _ => {
                return Err(MermaidError::UnrecognizedLine {
                    line: line_no,
                    content: line.to_string(),
                })
            }
        }
    }

    map.dedup_edges();
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_writes_shapes_and_labels() {
        let mut ids = IdGen::sequential();
        let mut map = MindMap::new();
        let a = map.add_node(Node::new(ids.next(), "Root", (0.0, 0.0), Shape::Circle));
        let b = map.add_node(Node::new(ids.next(), "Child", (1.0, 0.0), Shape::Rectangle));
        let mut edge = Edge::new(ids.next(), a, b);
        edge.label = Some("grows".into());
        map.edges.push(edge);

        let text = export(&map);
        assert!(text.starts_with("graph TD\n"));
        assert!(text.contains("n0((\"Root\"))"));
        assert!(text.contains("n1[\"Child\"]"));
        assert!(text.contains("n0 -->|grows| n1"));
    }

    #[test]
    fn export_skips_magnet_and_its_edges() {
        let mut ids = IdGen::sequential();
        let mut map = MindMap::new();
        map.add_node(Node::new(ids.next(), "Alone", (0.0, 0.0), Shape::Circle));
        map.spawn_magnet(&mut ids, (100.0, 0.0));
        assert_eq!(map.edges.len(), 1);

        let text = export(&map);
        assert!(!text.contains("MAGNET"));
        assert!(!text.contains("-->"));
    }

    #[test]
    fn export_escapes_quotes_and_newlines() {
        let mut ids = IdGen::sequential();
        let mut map = MindMap::new();
        map.add_node(Node::new(ids.next(), "say \"hi\"\nthere", (0.0, 0.0), Shape::Circle));
        let text = export(&map);
        assert!(text.contains("say 'hi'<br/>there"));
    }

    #[test]
    fn import_reads_defs_and_edges() {
        let src = "graph TD\n    a((\"Root\"))\n    b[\"Child\"]\n    a -->|grows| b\n    a --> c\n";
        let mut ids = IdGen::sequential();
        let map = import(src, &mut ids).unwrap();

        assert_eq!(map.nodes.len(), 3);
        assert_eq!(map.edges.len(), 2);
        let root = map.nodes.iter().find(|n| n.text == "Root").unwrap();
        assert_eq!(root.shape, Shape::Circle);
        let child = map.nodes.iter().find(|n| n.text == "Child").unwrap();
        assert_eq!(child.shape, Shape::Rectangle);
        // Bare alias becomes a circle named after itself.
        let c = map.nodes.iter().find(|n| n.text == "c").unwrap();
        assert_eq!(c.shape, Shape::Circle);
        assert!(map
            .edges
            .iter()
            .any(|e| e.label.as_deref() == Some("grows")));
    }

    #[test]
    fn import_places_nodes_on_a_spiral() {
        let src = "graph TD\n    a((\"A\"))\n    b((\"B\"))\n    c((\"C\"))\n";
        let mut ids = IdGen::sequential();
        let map = import(src, &mut ids).unwrap();
        let positions: Vec<(f32, f32)> = map.nodes.iter().map(|n| n.position).collect();
        for window in positions.windows(2) {
            assert_ne!(window[0], window[1]);
        }
        // Spiral radius grows with index.
        let r = |p: (f32, f32)| (p.0 * p.0 + p.1 * p.1).sqrt();
        assert!(r(positions[2]) > r(positions[0]));
    }

    #[test]
    fn import_handles_inline_definitions_in_edges() {
        let src = "graph TD\n    a((\"Root\")) --> b[\"Leaf\"]\n";
        let mut ids = IdGen::sequential();
        let map = import(src, &mut ids).unwrap();
        assert_eq!(map.nodes.len(), 2);
        assert_eq!(map.edges.len(), 1);
    }

    #[test]
    fn import_rejects_garbage() {
        let mut ids = IdGen::sequential();
        let err = import("graph TD\nthis is not mermaid\n", &mut ids).unwrap_err();
        assert!(matches!(err, MermaidError::UnrecognizedLine { line: 2, .. }));
    }

    #[test]
    fn exported_document_reimports_equivalently() {
        let mut ids = IdGen::sequential();
        let mut map = MindMap::new();
        let a = map.add_node(Node::new(ids.next(), "A", (0.0, 0.0), Shape::Circle));
        let b = map.add_node(Node::new(ids.next(), "B", (1.0, 0.0), Shape::Rectangle));
        map.edges.push(Edge::new(ids.next(), a, b));

        let reimported = import(&export(&map), &mut ids).unwrap();
        assert_eq!(reimported.nodes.len(), 2);
        assert_eq!(reimported.edges.len(), 1);
        assert_eq!(
            reimported.nodes.iter().filter(|n| n.shape == Shape::Rectangle).count(),
            1
        );
    }
}
