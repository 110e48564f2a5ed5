use derive_more::Display;

pub mod arena;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements that reopen automatically through the list of active formatting
/// elements
pub const FORMATTING_HTML_ELEMENTS: [&str; 14] = [
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt",
    "u",
];

/// Elements with "special" parsing rules; these terminate an any-other-end-tag
/// search and act as furthest-block candidates in the adoption agency
pub const SPECIAL_HTML_ELEMENTS: [&str; 82] = [
    "address", "applet", "area", "article", "aside", "base", "basefont", "bgsound", "blockquote",
    "body", "br", "button", "caption", "center", "col", "colgroup", "dd", "details", "dir", "div",
    "dl", "dt", "embed", "fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset",
    "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "iframe", "img",
    "input", "keygen", "li", "link", "listing", "main", "marquee", "menu", "meta", "nav",
    "noembed", "noframes", "noscript", "object", "ol", "p", "param", "plaintext", "pre", "script",
    "section", "select", "source", "style", "summary", "table", "tbody", "td", "template",
    "textarea", "tfoot", "th", "thead", "title", "tr", "track", "ul", "wbr", "xmp",
];

/// Elements that never have children; they are popped right after insertion
pub const VOID_HTML_ELEMENTS: [&str; 18] = [
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements closed by generate_implied_end_tags
pub const IMPLIED_END_TAG_ELEMENTS: [&str; 10] = [
    "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc",
];

/// Coarse classification used for tree builder dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCategory {
    Formatting,
    Special,
    Ordinary,
}

pub fn tag_category(name: &str) -> TagCategory {
    if FORMATTING_HTML_ELEMENTS.contains(&name) {
        TagCategory::Formatting
    } else if SPECIAL_HTML_ELEMENTS.contains(&name) {
        TagCategory::Special
    } else {
        TagCategory::Ordinary
    }
}

/// Different types of nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    DocType,
    Text,
    Comment,
    Element,
}

/// Different type of node data
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    DocType {
        name: Option<String>,
    },
    Text {
        value: String,
    },
    Comment {
        value: String,
    },
    Element {
        /// Attributes in insertion order
        attributes: Vec<(String, String)>,
    },
}

/// Id of a node inside the arena
#[derive(Copy, Clone, Debug, Default, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Id of the document root node
    pub fn root() -> Self {
        Self(0)
    }
}

/// Node that resides inside the arena; linked to parent and children by id
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Id of the node, assigned when it is registered into the arena
    pub id: NodeId,
    /// Parent of the node, if any
    pub parent: Option<NodeId>,
    /// Children of the node
    pub children: Vec<NodeId>,
    /// Element name; empty for non-element nodes
    pub name: String,
    /// Actual data of the node
    pub data: NodeData,
    /// Namespace the element lives in
    pub namespace: Option<String>,
}

impl Node {
    /// Create a new document node
    pub fn new_document() -> Self {
        Self {
            id: NodeId::default(),
            parent: None,
            children: Vec::new(),
            name: String::new(),
            data: NodeData::Document,
            namespace: None,
        }
    }

    pub fn new_doctype(name: Option<&str>) -> Self {
        Self {
            id: NodeId::default(),
            parent: None,
            children: Vec::new(),
            name: String::new(),
            data: NodeData::DocType {
                name: name.map(str::to_string),
            },
            namespace: None,
        }
    }

    /// Create a new element node with the given name and attributes
    pub fn new_element(name: &str, attributes: Vec<(String, String)>, namespace: &str) -> Self {
        Self {
            id: NodeId::default(),
            parent: None,
            children: Vec::new(),
            name: name.to_string(),
            data: NodeData::Element { attributes },
            namespace: Some(namespace.to_string()),
        }
    }

    /// Create a new comment node
    pub fn new_comment(value: &str) -> Self {
        Self {
            id: NodeId::default(),
            parent: None,
            children: Vec::new(),
            name: String::new(),
            data: NodeData::Comment {
                value: value.to_string(),
            },
            namespace: None,
        }
    }

    /// Create a new text node
    pub fn new_text(value: &str) -> Self {
        Self {
            id: NodeId::default(),
            parent: None,
            children: Vec::new(),
            name: String::new(),
            data: NodeData::Text {
                value: value.to_string(),
            },
            namespace: None,
        }
    }

    /// Returns the type of the given node
    pub fn type_of(&self) -> NodeType {
        match self.data {
            NodeData::Document => NodeType::Document,
            NodeData::DocType { .. } => NodeType::DocType,
            NodeData::Text { .. } => NodeType::Text,
            NodeData::Comment { .. } => NodeType::Comment,
            NodeData::Element { .. } => NodeType::Element,
        }
    }

    /// Returns true when this is one of the formatting elements
    pub fn is_formatting(&self) -> bool {
        self.type_of() == NodeType::Element && FORMATTING_HTML_ELEMENTS.contains(&self.name.as_str())
    }

    /// Returns true when this is one of the special elements
    pub fn is_special(&self) -> bool {
        self.type_of() == NodeType::Element && SPECIAL_HTML_ELEMENTS.contains(&self.name.as_str())
    }

    /// Returns true when this element may not have children
    pub fn is_void(&self) -> bool {
        self.type_of() == NodeType::Element && VOID_HTML_ELEMENTS.contains(&self.name.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        match &self.data {
            NodeData::Element { attributes } => attributes,
            _ => &[],
        }
    }

    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.get_attribute(key).is_some()
    }

    /// Adds attributes that are not present yet; existing attributes keep
    /// their value (used when a duplicate html or body tag is seen)
    pub fn merge_attributes(&mut self, extra: &[(String, String)]) {
        if let NodeData::Element { attributes } = &mut self.data {
            for (key, value) in extra {
                if !attributes.iter().any(|(k, _)| k == key) {
                    attributes.push((key.clone(), value.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_element() {
        let node = Node::new_element(
            "div",
            vec![("class".to_string(), "x".to_string())],
            HTML_NAMESPACE,
        );
        assert_eq!(node.type_of(), NodeType::Element);
        assert_eq!(node.name, "div");
        assert_eq!(node.get_attribute("class"), Some("x"));
        assert_eq!(node.get_attribute("id"), None);
        assert!(node.is_special());
        assert!(!node.is_formatting());
        assert!(!node.is_void());
    }

    #[test]
    fn classifications() {
        let b = Node::new_element("b", vec![], HTML_NAMESPACE);
        assert!(b.is_formatting());
        assert!(!b.is_special());

        let br = Node::new_element("br", vec![], HTML_NAMESPACE);
        assert!(br.is_void());
        assert!(br.is_special());

        assert_eq!(tag_category("em"), TagCategory::Formatting);
        assert_eq!(tag_category("table"), TagCategory::Special);
        assert_eq!(tag_category("span"), TagCategory::Ordinary);
    }

    #[test]
    fn merge_attributes_keeps_existing() {
        let mut node = Node::new_element(
            "html",
            vec![("lang".to_string(), "en".to_string())],
            HTML_NAMESPACE,
        );
        node.merge_attributes(&[
            ("lang".to_string(), "nl".to_string()),
            ("dir".to_string(), "ltr".to_string()),
        ]);
        assert_eq!(node.get_attribute("lang"), Some("en"));
        assert_eq!(node.get_attribute("dir"), Some("ltr"));
    }

    #[test]
    fn non_element_nodes() {
        let text = Node::new_text("hello");
        assert_eq!(text.type_of(), NodeType::Text);
        assert!(!text.is_special());
        assert!(text.attributes().is_empty());

        let comment = Node::new_comment("hi");
        assert_eq!(comment.type_of(), NodeType::Comment);

        let doctype = Node::new_doctype(Some("html"));
        assert_eq!(doctype.type_of(), NodeType::DocType);
    }
}
