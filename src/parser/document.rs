use std::fmt;

use crate::node::arena::NodeArena;
use crate::node::{Node, NodeData, NodeId};
use crate::parser::quirks::QuirksMode;

/// Elements whose text content is serialized without entity escaping; the
/// tokenizer never resolves references inside them
const RAW_CONTENT_ELEMENTS: [&str; 7] = [
    "iframe", "noembed", "noframes", "plaintext", "script", "style", "xmp",
];

/// The document tree under construction. Owns the node arena; all structure
/// changes go through here.
pub struct Document {
    arena: NodeArena,
    pub quirks_mode: QuirksMode,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a new document with a root node at NodeId::root()
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        arena.add_node(Node::new_document());
        Self {
            arena,
            quirks_mode: QuirksMode::NoQuirks,
        }
    }

    /// Fetches a node by id or returns None when no node with this id exists
    pub fn get_node_by_id(&self, node_id: NodeId) -> Option<&Node> {
        self.arena.get_node(node_id)
    }

    /// Fetches a mutable node by id
    pub fn get_mut_node_by_id(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut_node(node_id)
    }

    /// Registers the node and appends it to the given parent
    pub fn add_node(&mut self, node: Node, parent_id: NodeId) -> NodeId {
        let node_id = self.arena.add_node(node);
        self.arena.attach_node(parent_id, node_id);
        node_id
    }

    /// Registers the node without attaching it anywhere yet
    pub fn register_node(&mut self, node: Node) -> NodeId {
        self.arena.add_node(node)
    }

    /// Appends a registered node to another parent, moving it when needed
    pub fn append(&mut self, node_id: NodeId, parent_id: NodeId) {
        self.arena.attach_node(parent_id, node_id);
    }

    /// Inserts a registered node before the reference node inside parent
    pub fn insert_before(&mut self, node_id: NodeId, parent_id: NodeId, reference_id: NodeId) {
        self.arena.insert_before(parent_id, node_id, reference_id);
    }

    /// Detaches a node from its parent
    pub fn detach(&mut self, node_id: NodeId) {
        self.arena.detach_node(node_id);
    }

    /// Returns the root node
    pub fn get_root(&self) -> &Node {
        self.arena
            .get_node(NodeId::root())
            .expect("document root node must exist")
    }

    /// Serializes the tree in the html5lib tree-construction format: one
    /// "| "-prefixed line per node, two spaces of indent per depth level,
    /// attributes sorted by name.
    pub fn tree_format(&self) -> String {
        let mut out = String::new();
        for &child in &self.get_root().children {
            self.format_node(child, 0, &mut out);
        }
        out
    }

    fn format_node(&self, node_id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.arena.get_node(node_id) else {
            return;
        };
        let indent = "  ".repeat(depth);

        match &node.data {
            NodeData::Document => {}
            NodeData::DocType { name } => {
                out.push_str(&format!(
                    "| {}<!DOCTYPE {}>\n",
                    indent,
                    name.as_deref().unwrap_or("")
                ));
            }
            NodeData::Text { value } => {
                out.push_str(&format!("| {}\"{}\"\n", indent, value));
            }
            NodeData::Comment { value } => {
                out.push_str(&format!("| {}<!-- {} -->\n", indent, value));
            }
            NodeData::Element { attributes } => {
                out.push_str(&format!("| {}<{}>\n", indent, node.name));
                let mut sorted: Vec<&(String, String)> = attributes.iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                for (key, value) in sorted {
                    out.push_str(&format!("| {}  {}=\"{}\"\n", indent, key, value));
                }
            }
        }

        for &child in &node.children {
            self.format_node(child, depth + 1, out);
        }
    }

    /// Serializes the tree back to HTML. Re-parsing the output yields a tree
    /// with the same structure.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(NodeId::root(), &mut out);
        out
    }

    fn write_html(&self, node_id: NodeId, out: &mut String) {
        let Some(node) = self.arena.get_node(node_id) else {
            return;
        };

        match &node.data {
            NodeData::Document => {
                for &child in &node.children {
                    self.write_html(child, out);
                }
            }
            NodeData::DocType { name } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name.as_deref().unwrap_or(""));
                out.push('>');
            }
            NodeData::Text { value } => {
                let raw = node
                    .parent
                    .and_then(|p| self.arena.get_node(p))
                    .is_some_and(|p| RAW_CONTENT_ELEMENTS.contains(&p.name.as_str()));
                if raw {
                    out.push_str(value);
                } else {
                    for c in value.chars() {
                        match c {
                            '&' => out.push_str("&amp;"),
                            '<' => out.push_str("&lt;"),
                            '>' => out.push_str("&gt;"),
                            _ => out.push(c),
                        }
                    }
                }
            }
            NodeData::Comment { value } => {
                out.push_str("<!--");
                out.push_str(value);
                out.push_str("-->");
            }
            NodeData::Element { attributes } => {
                out.push('<');
                out.push_str(&node.name);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    for c in value.chars() {
                        match c {
                            '&' => out.push_str("&amp;"),
                            '"' => out.push_str("&quot;"),
                            _ => out.push(c),
                        }
                    }
                    out.push('"');
                }
                out.push('>');
                if node.is_void() {
                    return;
                }
                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&node.name);
                out.push('>');
            }
        }
    }

    /// Print a node and all its children in a tree-like structure
    fn print_tree(&self, node: &Node, prefix: String, last: bool, f: &mut fmt::Formatter<'_>) {
        let mut buffer = prefix.clone();
        if last {
            buffer.push_str("└─ ");
        } else {
            buffer.push_str("├─ ");
        }

        match &node.data {
            NodeData::Document => {
                _ = writeln!(f, "{}Document", buffer);
            }
            NodeData::DocType { name } => {
                _ = writeln!(f, "{}<!DOCTYPE {}>", buffer, name.as_deref().unwrap_or(""));
            }
            NodeData::Text { value } => {
                _ = writeln!(f, "{}\"{}\"", buffer, value);
            }
            NodeData::Comment { value } => {
                _ = writeln!(f, "{}<!-- {} -->", buffer, value);
            }
            NodeData::Element { attributes } => {
                _ = write!(f, "{}<{}", buffer, node.name);
                for (key, value) in attributes.iter() {
                    _ = write!(f, " {}={}", key, value);
                }
                _ = writeln!(f, ">");
            }
        }

        let mut buffer = prefix;
        if last {
            buffer.push_str("   ");
        } else {
            buffer.push_str("│  ");
        }

        let len = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            if let Some(child) = self.arena.get_node(*child) {
                self.print_tree(child, buffer.clone(), i == len - 1, f);
            }
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_tree(self.get_root(), "".to_string(), true, f);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::HTML_NAMESPACE;

    #[test]
    fn tree_format_output() {
        let mut document = Document::new();
        let root_id = NodeId::root();
        let html_id = document.add_node(
            Node::new_element("html", vec![], HTML_NAMESPACE),
            root_id,
        );
        let head_id = document.add_node(Node::new_element("head", vec![], HTML_NAMESPACE), html_id);
        let body_id = document.add_node(Node::new_element("body", vec![], HTML_NAMESPACE), html_id);
        let p_id = document.add_node(
            Node::new_element(
                "p",
                vec![
                    ("id".to_string(), "x".to_string()),
                    ("class".to_string(), "y".to_string()),
                ],
                HTML_NAMESPACE,
            ),
            body_id,
        );
        document.add_node(Node::new_text("hi"), p_id);
        let _ = head_id;

        assert_eq!(
            document.tree_format(),
            concat!(
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <p>\n",
                "|       class=\"y\"\n",
                "|       id=\"x\"\n",
                "|       \"hi\"\n",
            )
        );
    }

    #[test]
    fn html_serialization() {
        let mut document = Document::new();
        let html_id = document.add_node(
            Node::new_element("html", vec![], HTML_NAMESPACE),
            NodeId::root(),
        );
        document.add_node(Node::new_element("head", vec![], HTML_NAMESPACE), html_id);
        let body_id = document.add_node(Node::new_element("body", vec![], HTML_NAMESPACE), html_id);
        let p_id = document.add_node(
            Node::new_element(
                "p",
                vec![("title".to_string(), "x\"y".to_string())],
                HTML_NAMESPACE,
            ),
            body_id,
        );
        document.add_node(Node::new_text("a&b"), p_id);
        document.add_node(Node::new_element("img", vec![], HTML_NAMESPACE), body_id);

        assert_eq!(
            document.to_html(),
            "<html><head></head><body><p title=\"x&quot;y\">a&amp;b</p><img></body></html>"
        );
    }

    #[test]
    fn raw_content_is_not_escaped() {
        let mut document = Document::new();
        let script_id = document.add_node(
            Node::new_element("script", vec![], HTML_NAMESPACE),
            NodeId::root(),
        );
        document.add_node(Node::new_text("if (a<b) x();"), script_id);
        assert_eq!(document.to_html(), "<script>if (a<b) x();</script>");
    }

    #[test]
    fn doctype_line() {
        let mut document = Document::new();
        document.add_node(Node::new_doctype(Some("html")), NodeId::root());
        assert_eq!(document.tree_format(), "| <!DOCTYPE html>\n");
    }
}
