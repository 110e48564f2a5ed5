use std::cell::RefCell;
use std::rc::Rc;

use cow_utils::CowUtils;

use crate::error_logger::{ErrorLogger, ParseError, ParserError};
use crate::node::{Node, NodeData, NodeId, HTML_NAMESPACE, IMPLIED_END_TAG_ELEMENTS};
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;
use crate::tokenizer::{TokenFetch, Tokenizer};
use crate::types::Result;

pub mod adoption_agency;
pub mod document;
pub mod quirks;

use document::Document;
use quirks::QuirksMode;

/// Elements that terminate a scope search unless the scope widens them
const DEFAULT_SCOPE_ELEMENTS: [&str; 9] = [
    "applet", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

/// Insertion points where character tokens collect in a table before the
/// whitespace decision is made
const TABLE_INSERTION_POINTS: [&str; 5] = ["table", "tbody", "tfoot", "thead", "tr"];

/// Elements that may stay open when the document ends without a warning
const UNCLOSED_AT_EOF_OK: [&str; 18] = [
    "body", "dd", "dt", "html", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc", "tbody",
    "td", "tfoot", "th", "thead", "tr",
];

/// The different insertion modes of the tree builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    AfterHead,
    InBody,
    Text,
    InTable,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

/// Entry in the list of active formatting elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveElement {
    /// Boundary inserted when entering caption, cell, applet, marquee,
    /// object or template content; reconstruction never crosses it
    Marker,
    NodeId(NodeId),
}

/// Scope variants used by the "have an element in scope" checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Regular,
    ListItem,
    Button,
    Table,
    Select,
}

/// What to do after a mode handler has seen a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// The token is consumed
    Done,
    /// Run the token again through whatever mode the handler switched to
    Reprocess,
    /// Switch to the given mode, then run the token again
    ReprocessIn(InsertionMode),
}

/// Where a new node ends up; fostered nodes land just before the table
enum InsertPosition {
    Append(NodeId),
    BeforeTable { parent: NodeId, table: NodeId },
}

/// Options for the parser
pub struct Options {
    /// Whether a scripting agent is attached; changes how noscript content
    /// is parsed
    pub scripting_enabled: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            scripting_enabled: true,
        }
    }
}

/// Streaming HTML parser. Feed input with write() and finish with end(); the
/// document tree is available at any point in between.
pub struct Html5Parser {
    /// Tokenizer the parser pulls tokens from
    tokenizer: Tokenizer,
    /// The document tree under construction
    document: Document,
    /// Insertion mode the next token is processed in
    insertion_mode: InsertionMode,
    /// Mode to return to when the Text mode finishes
    original_insertion_mode: InsertionMode,
    /// Stack of open elements
    open_elements: Vec<NodeId>,
    /// List of active formatting elements, with markers
    active_formatting_elements: Vec<ActiveElement>,
    /// The head element, once seen
    head_element: Option<NodeId>,
    /// The form element, once seen; cleared by its end tag
    form_element: Option<NodeId>,
    scripting_enabled: bool,
    /// A frameset start tag can still replace the body
    frameset_ok: bool,
    /// Misplaced table content gets redirected in front of the table
    foster_parenting: bool,
    /// A newline right after pre, listing or textarea is dropped
    ignore_lf: bool,
    /// Character tokens collected inside a table until a non-character token
    /// decides whether they stay or get fostered
    pending_table_text: String,
    /// Set once the EOF token has been processed
    parser_finished: bool,
    /// Parse errors from both tokenizer and tree builder
    error_logger: Rc<RefCell<ErrorLogger>>,
}

impl Default for Html5Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Html5Parser {
    pub fn new() -> Self {
        Self::new_with_options(Options::default())
    }

    pub fn new_with_options(opts: Options) -> Self {
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        Self {
            tokenizer: Tokenizer::new(None, Rc::clone(&error_logger)),
            document: Document::new(),
            insertion_mode: InsertionMode::Initial,
            original_insertion_mode: InsertionMode::Initial,
            open_elements: Vec::new(),
            active_formatting_elements: Vec::new(),
            head_element: None,
            form_element: None,
            scripting_enabled: opts.scripting_enabled,
            frameset_ok: true,
            foster_parenting: false,
            ignore_lf: false,
            pending_table_text: String::new(),
            parser_finished: false,
            error_logger,
        }
    }

    /// Parses a complete input string in one go
    pub fn parse_str(input: &str) -> Self {
        let mut parser = Self::new();
        parser.write(input);
        parser.end();
        parser
    }

    /// Parses a complete input buffer; fails when it is not valid UTF-8
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        let input = String::from_utf8(input.to_vec())?;
        Ok(Self::parse_str(&input))
    }

    /// Feeds a chunk of input and processes every token it completes. A
    /// token cut off at the chunk boundary is picked up by the next call.
    pub fn write(&mut self, chunk: &str) {
        self.tokenizer.write(chunk);
        self.run();
    }

    /// Signals the end of the input and processes the remaining tokens
    pub fn end(&mut self) {
        self.tokenizer.end();
        self.run();
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// All parse errors logged so far, in document order
    pub fn errors(&self) -> Vec<ParseError> {
        self.error_logger.borrow().get_errors()
    }

    fn run(&mut self) {
        while !self.parser_finished {
            match self.tokenizer.next_token() {
                TokenFetch::Pending => return,
                TokenFetch::Token(token) => self.process_token(token),
            }
        }
    }

    fn process_token(&mut self, token: Token) {
        if self.ignore_lf {
            self.ignore_lf = false;
            if matches!(&token, Token::TextToken { value } if value == "\n") {
                return;
            }
        }

        #[cfg(feature = "debug_parser")]
        log::trace!("{:?}: {}", self.insertion_mode, token);

        let mut reprocess_count = 0;
        loop {
            let transition = self.dispatch(self.insertion_mode, &token);
            match transition {
                Transition::Done => return,
                Transition::Reprocess => {}
                Transition::ReprocessIn(mode) => self.insertion_mode = mode,
            }

            // a token may legitimately be reprocessed a few times (missing
            // doctype, implied tbody/tr), but never unbounded
            reprocess_count += 1;
            if reprocess_count > 10 {
                debug_assert!(false, "token reprocessed too often: {}", token);
                return;
            }
        }
    }

    fn dispatch(&mut self, mode: InsertionMode, token: &Token) -> Transition {
        match mode {
            InsertionMode::Initial => self.handle_initial(token),
            InsertionMode::BeforeHtml => self.handle_before_html(token),
            InsertionMode::BeforeHead => self.handle_before_head(token),
            InsertionMode::InHead => self.handle_in_head(token),
            InsertionMode::AfterHead => self.handle_after_head(token),
            InsertionMode::InBody => self.handle_in_body(token),
            InsertionMode::Text => self.handle_text(token),
            InsertionMode::InTable => self.handle_in_table(token),
            InsertionMode::InCaption => self.handle_in_caption(token),
            InsertionMode::InColumnGroup => self.handle_in_column_group(token),
            InsertionMode::InTableBody => self.handle_in_table_body(token),
            InsertionMode::InRow => self.handle_in_row(token),
            InsertionMode::InCell => self.handle_in_cell(token),
            InsertionMode::InSelect => self.handle_in_select(token),
            InsertionMode::InSelectInTable => self.handle_in_select_in_table(token),
            InsertionMode::InTemplate => self.handle_in_template(token),
            InsertionMode::AfterBody => self.handle_after_body(token),
            InsertionMode::InFrameset => self.handle_in_frameset(token),
            InsertionMode::AfterFrameset => self.handle_after_frameset(token),
            InsertionMode::AfterAfterBody => self.handle_after_after_body(token),
            InsertionMode::AfterAfterFrameset => self.handle_after_after_frameset(token),
        }
    }

    // ------------------------------------------------------------------
    // Mode handlers

    fn handle_initial(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { .. } if token.is_whitespace_text() => Transition::Done,
            Token::CommentToken { value } => {
                self.insert_comment_into(value, NodeId::root());
                Transition::Done
            }
            Token::DocTypeToken { name, force_quirks } => {
                if *force_quirks || name.as_deref() != Some("html") {
                    self.parse_error("quirky doctype");
                    self.document.quirks_mode = QuirksMode::Quirks;
                }
                let doctype = Node::new_doctype(name.as_deref());
                self.document.add_node(doctype, NodeId::root());
                self.insertion_mode = InsertionMode::BeforeHtml;
                Transition::Done
            }
            _ => {
                let error = match token {
                    Token::StartTagToken { .. } => ParserError::ExpectedDocTypeButGotStartTag,
                    Token::EndTagToken { .. } => ParserError::ExpectedDocTypeButGotEndTag,
                    _ => ParserError::ExpectedDocTypeButGotChars,
                };
                self.parse_error(error.as_str());
                self.document.quirks_mode = QuirksMode::Quirks;
                Transition::ReprocessIn(InsertionMode::BeforeHtml)
            }
        }
    }

    fn handle_before_html(&mut self, token: &Token) -> Transition {
        match token {
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::CommentToken { value } => {
                self.insert_comment_into(value, NodeId::root());
                Transition::Done
            }
            Token::TextToken { .. } if token.is_whitespace_text() => Transition::Done,
            Token::StartTagToken {
                name, attributes, ..
            } if name == "html" => {
                let node = Node::new_element(name, attributes.clone(), HTML_NAMESPACE);
                let node_id = self.document.add_node(node, NodeId::root());
                self.open_elements.push(node_id);
                self.insertion_mode = InsertionMode::BeforeHead;
                Transition::Done
            }
            Token::EndTagToken { name }
                if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.parse_error("unexpected end tag before html");
                Transition::Done
            }
            _ => {
                let node = Node::new_element("html", Vec::new(), HTML_NAMESPACE);
                let node_id = self.document.add_node(node, NodeId::root());
                self.open_elements.push(node_id);
                self.insertion_mode = InsertionMode::BeforeHead;
                Transition::Reprocess
            }
        }
    }

    fn handle_before_head(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { .. } if token.is_whitespace_text() => Transition::Done,
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTagToken {
                name, attributes, ..
            } if name == "head" => {
                let node_id = self.insert_html_element("head", attributes.clone());
                self.head_element = Some(node_id);
                self.insertion_mode = InsertionMode::InHead;
                Transition::Done
            }
            Token::EndTagToken { name }
                if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.parse_error("unexpected end tag before head");
                Transition::Done
            }
            _ => {
                let node_id = self.insert_html_element("head", Vec::new());
                self.head_element = Some(node_id);
                self.insertion_mode = InsertionMode::InHead;
                Transition::Reprocess
            }
        }
    }

    fn handle_in_head(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { value } if token.is_whitespace_text() => {
                self.insert_text(&value.clone());
                Transition::Done
            }
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTagToken {
                name, attributes, ..
            } if matches!(name.as_str(), "base" | "basefont" | "bgsound" | "link" | "meta") => {
                self.insert_html_element(name, attributes.clone());
                self.open_elements.pop();
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } if name == "title" => {
                self.parse_rcdata_element(name, attributes.clone());
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } if matches!(name.as_str(), "noframes" | "style" | "script")
                || (name == "noscript" && self.scripting_enabled) =>
            {
                self.parse_rawtext_element(name, attributes.clone());
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } if name == "noscript" => {
                // without a scripting agent the contents parse as markup
                self.insert_html_element(name, attributes.clone());
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } if name == "template" => {
                self.insert_html_element(name, attributes.clone());
                self.active_formatting_elements.push(ActiveElement::Marker);
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InTemplate;
                Transition::Done
            }
            Token::EndTagToken { name } if name == "template" => {
                self.close_template();
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "head" => {
                self.parse_error("head element may not appear twice");
                Transition::Done
            }
            Token::EndTagToken { name } if name == "head" => {
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::AfterHead;
                Transition::Done
            }
            Token::EndTagToken { name }
                if !matches!(name.as_str(), "body" | "html" | "br") =>
            {
                self.parse_error("unexpected end tag in head");
                Transition::Done
            }
            _ => {
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::AfterHead;
                Transition::Reprocess
            }
        }
    }

    fn handle_after_head(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { value } if token.is_whitespace_text() => {
                self.insert_text(&value.clone());
                Transition::Done
            }
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTagToken {
                name, attributes, ..
            } if name == "body" => {
                self.insert_html_element("body", attributes.clone());
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InBody;
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } if name == "frameset" => {
                self.insert_html_element("frameset", attributes.clone());
                self.insertion_mode = InsertionMode::InFrameset;
                Transition::Done
            }
            Token::StartTagToken { name, .. }
                if matches!(
                    name.as_str(),
                    "base"
                        | "basefont"
                        | "bgsound"
                        | "link"
                        | "meta"
                        | "noframes"
                        | "script"
                        | "style"
                        | "template"
                        | "title"
                ) =>
            {
                self.parse_error("metadata element after head");
                let Some(head_id) = self.head_element else {
                    return Transition::Done;
                };
                self.open_elements.push(head_id);
                let transition = self.handle_in_head(token);
                if let Some(idx) = self.open_elements.iter().rposition(|&id| id == head_id) {
                    self.open_elements.remove(idx);
                }
                transition
            }
            Token::EndTagToken { name } if name == "template" => self.handle_in_head(token),
            Token::StartTagToken { name, .. } if name == "head" => {
                self.parse_error("head element may not appear twice");
                Transition::Done
            }
            Token::EndTagToken { name }
                if !matches!(name.as_str(), "body" | "html" | "br") =>
            {
                self.parse_error("unexpected end tag after head");
                Transition::Done
            }
            _ => {
                self.insert_html_element("body", Vec::new());
                self.insertion_mode = InsertionMode::InBody;
                Transition::Reprocess
            }
        }
    }

    fn handle_in_body(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { value } => {
                if token.is_null_text() {
                    self.parse_error(ParserError::UnexpectedNullCharacter.as_str());
                    return Transition::Done;
                }
                let value = value.clone();
                self.reconstruct_active_formatting_elements();
                self.insert_text(&value);
                if !token.is_whitespace_text() {
                    self.frameset_ok = false;
                }
                Transition::Done
            }
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } => self.in_body_start_tag(name, attributes),
            Token::EndTagToken { name } => self.in_body_end_tag(name),
            Token::EofToken => {
                for &id in &self.open_elements {
                    if !UNCLOSED_AT_EOF_OK.contains(&self.node_name(id).as_str()) {
                        self.parse_error("document ended with open elements");
                        break;
                    }
                }
                self.stop_parsing();
                Transition::Done
            }
        }
    }

    fn in_body_start_tag(&mut self, name: &str, attributes: &[(String, String)]) -> Transition {
        let attributes = attributes.to_vec();
        match name {
            "html" => {
                self.parse_error("html element may not appear twice");
                if let Some(&html_id) = self.open_elements.first() {
                    if let Some(node) = self.document.get_mut_node_by_id(html_id) {
                        node.merge_attributes(&attributes);
                    }
                }
                Transition::Done
            }
            "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
            | "template" | "title" => self.handle_in_head(&Token::StartTagToken {
                name: name.to_string(),
                is_self_closing: false,
                attributes,
            }),
            "body" => {
                self.parse_error("body element may not appear twice");
                if self.open_elements.len() > 1 {
                    let body_id = self.open_elements[1];
                    if self.node_name(body_id) == "body" {
                        self.frameset_ok = false;
                        if let Some(node) = self.document.get_mut_node_by_id(body_id) {
                            node.merge_attributes(&attributes);
                        }
                    }
                }
                Transition::Done
            }
            "frameset" => {
                self.parse_error("unexpected frameset");
                if !self.frameset_ok || self.open_elements.len() < 2 {
                    return Transition::Done;
                }
                let body_id = self.open_elements[1];
                self.document.detach(body_id);
                self.open_elements.truncate(1);
                self.insert_html_element("frameset", attributes);
                self.insertion_mode = InsertionMode::InFrameset;
                Transition::Done
            }
            "address" | "article" | "aside" | "blockquote" | "center" | "details" | "dialog"
            | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer" | "header"
            | "hgroup" | "main" | "menu" | "nav" | "ol" | "p" | "section" | "summary" | "ul" => {
                self.close_p_in_button_scope();
                self.insert_html_element(name, attributes);
                Transition::Done
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.close_p_in_button_scope();
                if matches!(
                    self.current_node_name().as_str(),
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
                ) {
                    self.parse_error("heading element may not be nested");
                    self.open_elements.pop();
                }
                self.insert_html_element(name, attributes);
                Transition::Done
            }
            "pre" | "listing" => {
                self.close_p_in_button_scope();
                self.insert_html_element(name, attributes);
                self.ignore_lf = true;
                self.frameset_ok = false;
                Transition::Done
            }
            "form" => {
                if self.form_element.is_some() {
                    self.parse_error("form element may not be nested");
                    return Transition::Done;
                }
                self.close_p_in_button_scope();
                let node_id = self.insert_html_element(name, attributes);
                self.form_element = Some(node_id);
                Transition::Done
            }
            "li" => {
                self.frameset_ok = false;
                self.close_open_list_item(&["li"]);
                self.close_p_in_button_scope();
                self.insert_html_element(name, attributes);
                Transition::Done
            }
            "dd" | "dt" => {
                self.frameset_ok = false;
                self.close_open_list_item(&["dd", "dt"]);
                self.close_p_in_button_scope();
                self.insert_html_element(name, attributes);
                Transition::Done
            }
            "plaintext" => {
                self.close_p_in_button_scope();
                self.insert_html_element(name, attributes);
                self.tokenizer.set_state(State::PlaintextState);
                Transition::Done
            }
            "button" => {
                if self.is_in_scope("button", Scope::Regular) {
                    self.parse_error("button element may not be nested");
                    self.generate_implied_end_tags(None, false);
                    self.pop_until("button");
                }
                self.reconstruct_active_formatting_elements();
                self.insert_html_element(name, attributes);
                self.frameset_ok = false;
                Transition::Done
            }
            "a" => {
                // a previous unclosed a gets closed and dropped first
                let open_a = self.active_formatting_elements.iter().rev().find_map(|e| match e {
                    ActiveElement::Marker => Some(None),
                    ActiveElement::NodeId(id) if self.node_name(*id) == "a" => Some(Some(*id)),
                    ActiveElement::NodeId(_) => None,
                });
                if let Some(Some(a_id)) = open_a {
                    self.parse_error("a element may not be nested");
                    self.run_adoption_agency("a");
                    self.active_formatting_elements
                        .retain(|e| *e != ActiveElement::NodeId(a_id));
                    self.open_elements.retain(|&id| id != a_id);
                }
                self.reconstruct_active_formatting_elements();
                let node_id = self.insert_html_element(name, attributes);
                self.push_active_formatting_element(node_id);
                Transition::Done
            }
            "b" | "big" | "code" | "em" | "font" | "i" | "s" | "small" | "strike" | "strong"
            | "tt" | "u" => {
                self.reconstruct_active_formatting_elements();
                let node_id = self.insert_html_element(name, attributes);
                self.push_active_formatting_element(node_id);
                Transition::Done
            }
            "nobr" => {
                self.reconstruct_active_formatting_elements();
                if self.is_in_scope("nobr", Scope::Regular) {
                    self.parse_error("nobr element may not be nested");
                    self.run_adoption_agency("nobr");
                    self.reconstruct_active_formatting_elements();
                }
                let node_id = self.insert_html_element(name, attributes);
                self.push_active_formatting_element(node_id);
                Transition::Done
            }
            "applet" | "marquee" | "object" => {
                self.reconstruct_active_formatting_elements();
                self.insert_html_element(name, attributes);
                self.active_formatting_elements.push(ActiveElement::Marker);
                self.frameset_ok = false;
                Transition::Done
            }
            "table" => {
                if self.document.quirks_mode != QuirksMode::Quirks {
                    self.close_p_in_button_scope();
                }
                self.insert_html_element(name, attributes);
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InTable;
                Transition::Done
            }
            "area" | "br" | "embed" | "img" | "keygen" | "wbr" => {
                self.reconstruct_active_formatting_elements();
                self.insert_html_element(name, attributes);
                self.open_elements.pop();
                self.frameset_ok = false;
                Transition::Done
            }
            "input" => {
                self.reconstruct_active_formatting_elements();
                let hidden = attributes
                    .iter()
                    .find(|(k, _)| k == "type")
                    .map(|(_, v)| v.cow_to_ascii_lowercase() == "hidden")
                    .unwrap_or(false);
                self.insert_html_element(name, attributes);
                self.open_elements.pop();
                if !hidden {
                    self.frameset_ok = false;
                }
                Transition::Done
            }
            "param" | "source" | "track" => {
                self.insert_html_element(name, attributes);
                self.open_elements.pop();
                Transition::Done
            }
            "hr" => {
                self.close_p_in_button_scope();
                self.insert_html_element(name, attributes);
                self.open_elements.pop();
                self.frameset_ok = false;
                Transition::Done
            }
            "image" => {
                self.parse_error("image tag should be img");
                self.in_body_start_tag("img", &attributes)
            }
            "textarea" => {
                self.insert_html_element(name, attributes);
                self.ignore_lf = true;
                self.tokenizer.set_state(State::RcDataState);
                self.original_insertion_mode = self.insertion_mode;
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::Text;
                Transition::Done
            }
            "xmp" => {
                self.close_p_in_button_scope();
                self.reconstruct_active_formatting_elements();
                self.frameset_ok = false;
                self.parse_rawtext_element(name, attributes);
                Transition::Done
            }
            "iframe" => {
                self.frameset_ok = false;
                self.parse_rawtext_element(name, attributes);
                Transition::Done
            }
            "noembed" => {
                self.parse_rawtext_element(name, attributes);
                Transition::Done
            }
            "noscript" if self.scripting_enabled => {
                self.parse_rawtext_element(name, attributes);
                Transition::Done
            }
            "select" => {
                self.reconstruct_active_formatting_elements();
                self.insert_html_element(name, attributes);
                self.frameset_ok = false;
                self.insertion_mode = match self.insertion_mode {
                    InsertionMode::InTable
                    | InsertionMode::InCaption
                    | InsertionMode::InTableBody
                    | InsertionMode::InRow
                    | InsertionMode::InCell => InsertionMode::InSelectInTable,
                    _ => InsertionMode::InSelect,
                };
                Transition::Done
            }
            "optgroup" | "option" => {
                if self.current_node_name() == "option" {
                    self.open_elements.pop();
                }
                self.reconstruct_active_formatting_elements();
                self.insert_html_element(name, attributes);
                Transition::Done
            }
            "rb" | "rtc" => {
                if self.is_in_scope("ruby", Scope::Regular) {
                    self.generate_implied_end_tags(None, false);
                    if self.current_node_name() != "ruby" {
                        self.parse_error("unexpected ruby annotation");
                    }
                }
                self.insert_html_element(name, attributes);
                Transition::Done
            }
            "rp" | "rt" => {
                if self.is_in_scope("ruby", Scope::Regular) {
                    self.generate_implied_end_tags(Some("rtc"), false);
                    if !matches!(self.current_node_name().as_str(), "ruby" | "rtc") {
                        self.parse_error("unexpected ruby annotation");
                    }
                }
                self.insert_html_element(name, attributes);
                Transition::Done
            }
            "caption" | "col" | "colgroup" | "frame" | "head" | "tbody" | "td" | "tfoot" | "th"
            | "thead" | "tr" => {
                self.parse_error("unexpected table element outside a table");
                Transition::Done
            }
            _ => {
                self.reconstruct_active_formatting_elements();
                self.insert_html_element(name, attributes);
                Transition::Done
            }
        }
    }

    fn in_body_end_tag(&mut self, name: &str) -> Transition {
        match name {
            "template" => self.handle_in_head(&Token::EndTagToken {
                name: name.to_string(),
            }),
            "body" | "html" => {
                if !self.is_in_scope("body", Scope::Regular) {
                    self.parse_error("unexpected body end tag");
                    return Transition::Done;
                }
                for &id in &self.open_elements {
                    if !UNCLOSED_AT_EOF_OK.contains(&self.node_name(id).as_str()) {
                        self.parse_error("body ended with open elements");
                        break;
                    }
                }
                self.insertion_mode = InsertionMode::AfterBody;
                if name == "html" {
                    Transition::Reprocess
                } else {
                    Transition::Done
                }
            }
            "address" | "article" | "aside" | "blockquote" | "button" | "center" | "details"
            | "dialog" | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer"
            | "header" | "hgroup" | "listing" | "main" | "menu" | "nav" | "ol" | "pre"
            | "section" | "summary" | "ul" => {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.parse_error("end tag without matching open element");
                    return Transition::Done;
                }
                self.generate_implied_end_tags(None, false);
                if self.current_node_name() != name {
                    self.parse_error("end tag closes other open elements");
                }
                self.pop_until(name);
                Transition::Done
            }
            "form" => {
                let form_id = self.form_element.take();
                let Some(form_id) = form_id else {
                    self.parse_error("unexpected form end tag");
                    return Transition::Done;
                };
                if !self.element_in_scope(form_id, Scope::Regular) {
                    self.parse_error("unexpected form end tag");
                    return Transition::Done;
                }
                self.generate_implied_end_tags(None, false);
                if self.current_node_id() != form_id {
                    self.parse_error("end tag closes other open elements");
                }
                // the form element is removed in place, not popped to
                self.open_elements.retain(|&id| id != form_id);
                Transition::Done
            }
            "p" => {
                if !self.is_in_scope("p", Scope::Button) {
                    self.parse_error("unexpected p end tag");
                    self.insert_html_element("p", Vec::new());
                }
                self.close_p_element();
                Transition::Done
            }
            "li" => {
                if !self.is_in_scope("li", Scope::ListItem) {
                    self.parse_error("unexpected li end tag");
                    return Transition::Done;
                }
                self.generate_implied_end_tags(Some("li"), false);
                if self.current_node_name() != "li" {
                    self.parse_error("end tag closes other open elements");
                }
                self.pop_until("li");
                Transition::Done
            }
            "dd" | "dt" => {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.parse_error("end tag without matching open element");
                    return Transition::Done;
                }
                self.generate_implied_end_tags(Some(name), false);
                if self.current_node_name() != name {
                    self.parse_error("end tag closes other open elements");
                }
                self.pop_until(name);
                Transition::Done
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];
                if !HEADINGS.iter().any(|h| self.is_in_scope(h, Scope::Regular)) {
                    self.parse_error("end tag without matching open element");
                    return Transition::Done;
                }
                self.generate_implied_end_tags(None, false);
                if self.current_node_name() != name {
                    self.parse_error("end tag closes other open elements");
                }
                self.pop_until_any(&HEADINGS);
                Transition::Done
            }
            "a" | "b" | "big" | "code" | "em" | "font" | "i" | "nobr" | "s" | "small"
            | "strike" | "strong" | "tt" | "u" => {
                match self.run_adoption_agency(name) {
                    adoption_agency::AdoptionResult::Completed => Transition::Done,
                    adoption_agency::AdoptionResult::ProcessAsAnyOther => {
                        self.any_other_end_tag(name);
                        Transition::Done
                    }
                }
            }
            "applet" | "marquee" | "object" => {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.parse_error("end tag without matching open element");
                    return Transition::Done;
                }
                self.generate_implied_end_tags(None, false);
                if self.current_node_name() != name {
                    self.parse_error("end tag closes other open elements");
                }
                self.pop_until(name);
                self.clear_active_formatting_elements_to_marker();
                Transition::Done
            }
            "br" => {
                self.parse_error("br end tag acts as a start tag");
                self.reconstruct_active_formatting_elements();
                self.insert_html_element("br", Vec::new());
                self.open_elements.pop();
                self.frameset_ok = false;
                Transition::Done
            }
            _ => {
                self.any_other_end_tag(name);
                Transition::Done
            }
        }
    }

    fn handle_text(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { value } => {
                self.insert_text(&value.clone());
                Transition::Done
            }
            Token::EofToken => {
                self.parse_error(ParserError::EofInText.as_str());
                self.open_elements.pop();
                self.insertion_mode = self.original_insertion_mode;
                Transition::Reprocess
            }
            _ => {
                // any end tag; the matching one was checked by the tokenizer
                self.open_elements.pop();
                self.insertion_mode = self.original_insertion_mode;
                Transition::Done
            }
        }
    }

    fn handle_in_table(&mut self, token: &Token) -> Transition {
        if let Token::TextToken { value } = token {
            if TABLE_INSERTION_POINTS.contains(&self.current_node_name().as_str()) {
                if token.is_null_text() {
                    self.parse_error(ParserError::UnexpectedNullCharacter.as_str());
                } else {
                    self.pending_table_text.push_str(value);
                }
                return Transition::Done;
            }
        }
        self.flush_pending_table_text();

        match token {
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } => match name.as_str() {
                "caption" => {
                    self.clear_stack_back_to_table_context();
                    self.active_formatting_elements.push(ActiveElement::Marker);
                    self.insert_html_element(name, attributes.clone());
                    self.insertion_mode = InsertionMode::InCaption;
                    Transition::Done
                }
                "colgroup" => {
                    self.clear_stack_back_to_table_context();
                    self.insert_html_element(name, attributes.clone());
                    self.insertion_mode = InsertionMode::InColumnGroup;
                    Transition::Done
                }
                "col" => {
                    self.clear_stack_back_to_table_context();
                    self.insert_html_element("colgroup", Vec::new());
                    Transition::ReprocessIn(InsertionMode::InColumnGroup)
                }
                "tbody" | "tfoot" | "thead" => {
                    self.clear_stack_back_to_table_context();
                    self.insert_html_element(name, attributes.clone());
                    self.insertion_mode = InsertionMode::InTableBody;
                    Transition::Done
                }
                "td" | "th" | "tr" => {
                    self.clear_stack_back_to_table_context();
                    self.insert_html_element("tbody", Vec::new());
                    Transition::ReprocessIn(InsertionMode::InTableBody)
                }
                "table" => {
                    self.parse_error("table element may not be nested");
                    if !self.is_in_scope("table", Scope::Table) {
                        return Transition::Done;
                    }
                    self.pop_until("table");
                    self.reset_insertion_mode();
                    Transition::Reprocess
                }
                "style" | "script" | "template" => self.handle_in_head(token),
                "input" => {
                    let hidden = attributes
                        .iter()
                        .find(|(k, _)| k == "type")
                        .map(|(_, v)| v.cow_to_ascii_lowercase() == "hidden")
                        .unwrap_or(false);
                    if !hidden {
                        return self.foster_process_in_body(token);
                    }
                    self.parse_error("hidden input in table");
                    self.insert_html_element(name, attributes.clone());
                    self.open_elements.pop();
                    Transition::Done
                }
                "form" => {
                    self.parse_error("form element in table");
                    if self.form_element.is_none() {
                        let node_id = self.insert_html_element(name, attributes.clone());
                        self.form_element = Some(node_id);
                        self.open_elements.pop();
                    }
                    Transition::Done
                }
                _ => self.foster_process_in_body(token),
            },
            Token::EndTagToken { name } => match name.as_str() {
                "table" => {
                    if !self.is_in_scope("table", Scope::Table) {
                        self.parse_error("unexpected table end tag");
                        return Transition::Done;
                    }
                    self.pop_until("table");
                    self.reset_insertion_mode();
                    Transition::Done
                }
                "template" => self.handle_in_head(token),
                "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot"
                | "th" | "thead" | "tr" => {
                    self.parse_error("unexpected end tag in table");
                    Transition::Done
                }
                _ => self.foster_process_in_body(token),
            },
            Token::EofToken => self.handle_in_body(token),
            Token::TextToken { .. } => self.foster_process_in_body(token),
        }
    }

    fn handle_in_caption(&mut self, token: &Token) -> Transition {
        match token {
            Token::EndTagToken { name } if name == "caption" => {
                self.close_caption();
                Transition::Done
            }
            Token::StartTagToken { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead"
                        | "tr"
                ) =>
            {
                self.parse_error("unexpected table element in caption");
                if self.close_caption() {
                    Transition::Reprocess
                } else {
                    Transition::Done
                }
            }
            Token::EndTagToken { name } if name == "table" => {
                self.parse_error("unexpected table end tag in caption");
                if self.close_caption() {
                    Transition::Reprocess
                } else {
                    Transition::Done
                }
            }
            Token::EndTagToken { name }
                if matches!(
                    name.as_str(),
                    "body" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th"
                        | "thead" | "tr"
                ) =>
            {
                self.parse_error("unexpected end tag in caption");
                Transition::Done
            }
            _ => self.handle_in_body(token),
        }
    }

    fn handle_in_column_group(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { value } if token.is_whitespace_text() => {
                self.insert_text(&value.clone());
                Transition::Done
            }
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTagToken {
                name, attributes, ..
            } if name == "col" => {
                self.insert_html_element(name, attributes.clone());
                self.open_elements.pop();
                Transition::Done
            }
            Token::EndTagToken { name } if name == "colgroup" => {
                if self.current_node_name() != "colgroup" {
                    self.parse_error("unexpected colgroup end tag");
                    return Transition::Done;
                }
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTable;
                Transition::Done
            }
            Token::EndTagToken { name } if name == "col" => {
                self.parse_error("col has no end tag");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "template" => self.handle_in_head(token),
            Token::EndTagToken { name } if name == "template" => self.handle_in_head(token),
            Token::EofToken => self.handle_in_body(token),
            _ => {
                if self.current_node_name() != "colgroup" {
                    self.parse_error("unexpected token in column group");
                    return Transition::Done;
                }
                self.open_elements.pop();
                Transition::ReprocessIn(InsertionMode::InTable)
            }
        }
    }

    fn handle_in_table_body(&mut self, token: &Token) -> Transition {
        // text tokens still delegate to the table handler for buffering; any
        // other token settles buffered text before the stack changes shape
        if !matches!(token, Token::TextToken { .. }) {
            self.flush_pending_table_text();
        }
        match token {
            Token::StartTagToken {
                name, attributes, ..
            } if name == "tr" => {
                self.clear_stack_back_to_table_body_context();
                self.insert_html_element(name, attributes.clone());
                self.insertion_mode = InsertionMode::InRow;
                Transition::Done
            }
            Token::StartTagToken { name, .. } if matches!(name.as_str(), "td" | "th") => {
                self.parse_error("cell without a row");
                self.clear_stack_back_to_table_body_context();
                self.insert_html_element("tr", Vec::new());
                Transition::ReprocessIn(InsertionMode::InRow)
            }
            Token::EndTagToken { name }
                if matches!(name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if !self.is_in_scope(name, Scope::Table) {
                    self.parse_error("end tag without matching open element");
                    return Transition::Done;
                }
                self.clear_stack_back_to_table_body_context();
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTable;
                Transition::Done
            }
            Token::StartTagToken { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead"
                ) =>
            {
                self.close_table_body_section()
            }
            Token::EndTagToken { name } if name == "table" => self.close_table_body_section(),
            Token::EndTagToken { name }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" | "tr"
                ) =>
            {
                self.parse_error("unexpected end tag in table body");
                Transition::Done
            }
            _ => self.handle_in_table(token),
        }
    }

    fn close_table_body_section(&mut self) -> Transition {
        let any_open = ["tbody", "thead", "tfoot"]
            .iter()
            .any(|s| self.is_in_scope(s, Scope::Table));
        if !any_open {
            self.parse_error("no table section to close");
            return Transition::Done;
        }
        self.clear_stack_back_to_table_body_context();
        self.open_elements.pop();
        Transition::ReprocessIn(InsertionMode::InTable)
    }

    fn handle_in_row(&mut self, token: &Token) -> Transition {
        if !matches!(token, Token::TextToken { .. }) {
            self.flush_pending_table_text();
        }
        match token {
            Token::StartTagToken {
                name, attributes, ..
            } if matches!(name.as_str(), "td" | "th") => {
                self.clear_stack_back_to_table_row_context();
                self.insert_html_element(name, attributes.clone());
                self.insertion_mode = InsertionMode::InCell;
                self.active_formatting_elements.push(ActiveElement::Marker);
                Transition::Done
            }
            Token::EndTagToken { name } if name == "tr" => {
                if !self.is_in_scope("tr", Scope::Table) {
                    self.parse_error("unexpected tr end tag");
                    return Transition::Done;
                }
                self.clear_stack_back_to_table_row_context();
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTableBody;
                Transition::Done
            }
            Token::StartTagToken { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr"
                ) =>
            {
                self.close_table_row()
            }
            Token::EndTagToken { name } if name == "table" => self.close_table_row(),
            Token::EndTagToken { name }
                if matches!(name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if !self.is_in_scope(name, Scope::Table) {
                    self.parse_error("end tag without matching open element");
                    return Transition::Done;
                }
                self.close_table_row()
            }
            Token::EndTagToken { name }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th"
                ) =>
            {
                self.parse_error("unexpected end tag in table row");
                Transition::Done
            }
            _ => self.handle_in_table(token),
        }
    }

    fn close_table_row(&mut self) -> Transition {
        if !self.is_in_scope("tr", Scope::Table) {
            self.parse_error("no table row to close");
            return Transition::Done;
        }
        self.clear_stack_back_to_table_row_context();
        self.open_elements.pop();
        Transition::ReprocessIn(InsertionMode::InTableBody)
    }

    fn handle_in_cell(&mut self, token: &Token) -> Transition {
        if !matches!(token, Token::TextToken { .. }) {
            self.flush_pending_table_text();
        }
        match token {
            Token::EndTagToken { name } if matches!(name.as_str(), "td" | "th") => {
                if !self.is_in_scope(name, Scope::Table) {
                    self.parse_error("end tag without matching open cell");
                    return Transition::Done;
                }
                self.generate_implied_end_tags(None, false);
                if self.current_node_name() != name.as_str() {
                    self.parse_error("end tag closes other open elements");
                }
                self.pop_until(name);
                self.clear_active_formatting_elements_to_marker();
                self.insertion_mode = InsertionMode::InRow;
                Transition::Done
            }
            Token::StartTagToken { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead"
                        | "tr"
                ) =>
            {
                if !self.is_in_scope("td", Scope::Table) && !self.is_in_scope("th", Scope::Table) {
                    self.parse_error("no cell to close");
                    return Transition::Done;
                }
                self.close_cell();
                Transition::Reprocess
            }
            Token::EndTagToken { name }
                if matches!(name.as_str(), "body" | "caption" | "col" | "colgroup" | "html") =>
            {
                self.parse_error("unexpected end tag in cell");
                Transition::Done
            }
            Token::EndTagToken { name }
                if matches!(name.as_str(), "table" | "tbody" | "tfoot" | "thead" | "tr") =>
            {
                if !self.is_in_scope(name, Scope::Table) {
                    self.parse_error("end tag without matching open element");
                    return Transition::Done;
                }
                self.close_cell();
                Transition::Reprocess
            }
            _ => self.handle_in_body(token),
        }
    }

    fn handle_in_select(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { value } => {
                if token.is_null_text() {
                    self.parse_error(ParserError::UnexpectedNullCharacter.as_str());
                    return Transition::Done;
                }
                self.insert_text(&value.clone());
                Transition::Done
            }
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTagToken {
                name, attributes, ..
            } if name == "option" => {
                if self.current_node_name() == "option" {
                    self.open_elements.pop();
                }
                self.insert_html_element(name, attributes.clone());
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } if name == "optgroup" => {
                if self.current_node_name() == "option" {
                    self.open_elements.pop();
                }
                if self.current_node_name() == "optgroup" {
                    self.open_elements.pop();
                }
                self.insert_html_element(name, attributes.clone());
                Transition::Done
            }
            Token::EndTagToken { name } if name == "optgroup" => {
                if self.current_node_name() == "option" && self.open_elements.len() >= 2 {
                    let above = self.open_elements[self.open_elements.len() - 2];
                    if self.node_name(above) == "optgroup" {
                        self.open_elements.pop();
                    }
                }
                if self.current_node_name() == "optgroup" {
                    self.open_elements.pop();
                } else {
                    self.parse_error("unexpected optgroup end tag");
                }
                Transition::Done
            }
            Token::EndTagToken { name } if name == "option" => {
                if self.current_node_name() == "option" {
                    self.open_elements.pop();
                } else {
                    self.parse_error("unexpected option end tag");
                }
                Transition::Done
            }
            Token::EndTagToken { name } if name == "select" => {
                if !self.is_in_scope("select", Scope::Select) {
                    self.parse_error("unexpected select end tag");
                    return Transition::Done;
                }
                self.pop_until("select");
                self.reset_insertion_mode();
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "select" => {
                self.parse_error("select element may not be nested");
                if self.is_in_scope("select", Scope::Select) {
                    self.pop_until("select");
                    self.reset_insertion_mode();
                }
                Transition::Done
            }
            Token::StartTagToken { name, .. }
                if matches!(name.as_str(), "input" | "keygen" | "textarea") =>
            {
                self.parse_error("form control closes the select");
                if !self.is_in_scope("select", Scope::Select) {
                    return Transition::Done;
                }
                self.pop_until("select");
                self.reset_insertion_mode();
                Transition::Reprocess
            }
            Token::StartTagToken { name, .. } if matches!(name.as_str(), "script" | "template") => {
                self.handle_in_head(token)
            }
            Token::EndTagToken { name } if name == "template" => self.handle_in_head(token),
            Token::EofToken => self.handle_in_body(token),
            _ => {
                self.parse_error("unexpected token in select");
                Transition::Done
            }
        }
    }

    fn handle_in_select_in_table(&mut self, token: &Token) -> Transition {
        const TABLE_PARTS: [&str; 9] = [
            "caption", "table", "tbody", "tfoot", "thead", "tr", "td", "th", "col",
        ];
        match token {
            Token::StartTagToken { name, .. } if TABLE_PARTS.contains(&name.as_str()) => {
                self.parse_error("table element closes the select");
                self.pop_until("select");
                self.reset_insertion_mode();
                Transition::Reprocess
            }
            Token::EndTagToken { name } if TABLE_PARTS.contains(&name.as_str()) => {
                self.parse_error("table end tag closes the select");
                if !self.is_in_scope(name, Scope::Table) {
                    return Transition::Done;
                }
                self.pop_until("select");
                self.reset_insertion_mode();
                Transition::Reprocess
            }
            _ => self.handle_in_select(token),
        }
    }

    fn handle_in_template(&mut self, token: &Token) -> Transition {
        match token {
            Token::EndTagToken { name } if name == "template" => self.handle_in_head(token),
            Token::EofToken => {
                if !self.open_elements.iter().any(|&id| self.node_name(id) == "template") {
                    self.stop_parsing();
                    return Transition::Done;
                }
                self.parse_error("document ended inside a template");
                self.pop_until("template");
                self.clear_active_formatting_elements_to_marker();
                self.reset_insertion_mode();
                Transition::Reprocess
            }
            _ => self.handle_in_body(token),
        }
    }

    fn handle_after_body(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { .. } if token.is_whitespace_text() => self.handle_in_body(token),
            Token::CommentToken { value } => {
                // comments after the body attach to the html element
                if let Some(&html_id) = self.open_elements.first() {
                    self.insert_comment_into(value, html_id);
                }
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndTagToken { name } if name == "html" => {
                self.insertion_mode = InsertionMode::AfterAfterBody;
                Transition::Done
            }
            Token::EofToken => {
                self.stop_parsing();
                Transition::Done
            }
            _ => {
                self.parse_error("unexpected token after body");
                Transition::ReprocessIn(InsertionMode::InBody)
            }
        }
    }

    fn handle_in_frameset(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { value } if token.is_whitespace_text() => {
                self.insert_text(&value.clone());
                Transition::Done
            }
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTagToken {
                name, attributes, ..
            } if name == "frameset" => {
                self.insert_html_element(name, attributes.clone());
                Transition::Done
            }
            Token::EndTagToken { name } if name == "frameset" => {
                if self.current_node_name() == "html" {
                    self.parse_error("unexpected frameset end tag");
                    return Transition::Done;
                }
                self.open_elements.pop();
                if self.current_node_name() != "frameset" {
                    self.insertion_mode = InsertionMode::AfterFrameset;
                }
                Transition::Done
            }
            Token::StartTagToken {
                name, attributes, ..
            } if name == "frame" => {
                self.insert_html_element(name, attributes.clone());
                self.open_elements.pop();
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::EofToken => {
                if self.current_node_name() != "html" {
                    self.parse_error("document ended inside a frameset");
                }
                self.stop_parsing();
                Transition::Done
            }
            _ => {
                self.parse_error("unexpected token in frameset");
                Transition::Done
            }
        }
    }

    fn handle_after_frameset(&mut self, token: &Token) -> Transition {
        match token {
            Token::TextToken { value } if token.is_whitespace_text() => {
                self.insert_text(&value.clone());
                Transition::Done
            }
            Token::CommentToken { value } => {
                self.insert_comment(value);
                Transition::Done
            }
            Token::DocTypeToken { .. } => {
                self.parse_error("unexpected doctype");
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndTagToken { name } if name == "html" => {
                self.insertion_mode = InsertionMode::AfterAfterFrameset;
                Transition::Done
            }
            Token::StartTagToken { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::EofToken => {
                self.stop_parsing();
                Transition::Done
            }
            _ => {
                self.parse_error("unexpected token after frameset");
                Transition::Done
            }
        }
    }

    fn handle_after_after_body(&mut self, token: &Token) -> Transition {
        match token {
            Token::CommentToken { value } => {
                self.insert_comment_into(value, NodeId::root());
                Transition::Done
            }
            Token::DocTypeToken { .. } => self.handle_in_body(token),
            Token::TextToken { .. } if token.is_whitespace_text() => self.handle_in_body(token),
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EofToken => {
                self.stop_parsing();
                Transition::Done
            }
            _ => {
                self.parse_error("unexpected token after the document");
                Transition::ReprocessIn(InsertionMode::InBody)
            }
        }
    }

    fn handle_after_after_frameset(&mut self, token: &Token) -> Transition {
        match token {
            Token::CommentToken { value } => {
                self.insert_comment_into(value, NodeId::root());
                Transition::Done
            }
            Token::DocTypeToken { .. } => self.handle_in_body(token),
            Token::TextToken { .. } if token.is_whitespace_text() => self.handle_in_body(token),
            Token::StartTagToken { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTagToken { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::EofToken => {
                self.stop_parsing();
                Transition::Done
            }
            _ => {
                self.parse_error("unexpected token after the document");
                Transition::Done
            }
        }
    }

    // ------------------------------------------------------------------
    // Insertion

    /// Creates an element, inserts it at the appropriate place and pushes it
    /// onto the stack of open elements
    fn insert_html_element(&mut self, name: &str, attributes: Vec<(String, String)>) -> NodeId {
        let node = Node::new_element(name, attributes, HTML_NAMESPACE);
        let node_id = self.document.register_node(node);
        let position = self.appropriate_place(self.current_node_id(), self.foster_parenting);
        self.insert_node_at(node_id, position);
        self.open_elements.push(node_id);
        node_id
    }

    /// Inserts text at the appropriate place, merging with an existing text
    /// node right before the insertion point
    fn insert_text(&mut self, value: &str) {
        match self.appropriate_place(self.current_node_id(), self.foster_parenting) {
            InsertPosition::Append(parent) => {
                // text never attaches directly to the document
                if parent == NodeId::root() {
                    return;
                }
                let last_child = self
                    .document
                    .get_node_by_id(parent)
                    .and_then(|n| n.children.last().copied());
                if let Some(last_id) = last_child {
                    if self.append_to_text_node(last_id, value) {
                        return;
                    }
                }
                let text_id = self.document.register_node(Node::new_text(value));
                self.document.append(text_id, parent);
            }
            InsertPosition::BeforeTable { parent, table } => {
                let prev_sibling = self.document.get_node_by_id(parent).and_then(|n| {
                    let idx = n.children.iter().position(|&c| c == table)?;
                    if idx > 0 {
                        Some(n.children[idx - 1])
                    } else {
                        None
                    }
                });
                if let Some(prev_id) = prev_sibling {
                    if self.append_to_text_node(prev_id, value) {
                        return;
                    }
                }
                let text_id = self.document.register_node(Node::new_text(value));
                self.document.insert_before(text_id, parent, table);
            }
        }
    }

    fn append_to_text_node(&mut self, node_id: NodeId, value: &str) -> bool {
        if let Some(node) = self.document.get_mut_node_by_id(node_id) {
            if let NodeData::Text { value: existing } = &mut node.data {
                existing.push_str(value);
                return true;
            }
        }
        false
    }

    /// Inserts a comment at the appropriate place
    fn insert_comment(&mut self, value: &str) {
        let node_id = self.document.register_node(Node::new_comment(value));
        let position = self.appropriate_place(self.current_node_id(), self.foster_parenting);
        self.insert_node_at(node_id, position);
    }

    /// Inserts a comment as the last child of the given node
    fn insert_comment_into(&mut self, value: &str, parent_id: NodeId) {
        self.document.add_node(Node::new_comment(value), parent_id);
    }

    /// The appropriate place for inserting a node. With foster parenting in
    /// effect and a table-section target, new nodes land right before the
    /// last open table instead.
    fn appropriate_place(&self, target: NodeId, foster: bool) -> InsertPosition {
        if foster && TABLE_INSERTION_POINTS.contains(&self.node_name(target).as_str()) {
            if let Some(idx) = self
                .open_elements
                .iter()
                .rposition(|&id| self.node_name(id) == "table")
            {
                let table_id = self.open_elements[idx];
                if let Some(parent) = self.document.get_node_by_id(table_id).and_then(|n| n.parent)
                {
                    return InsertPosition::BeforeTable {
                        parent,
                        table: table_id,
                    };
                }
                if idx > 0 {
                    return InsertPosition::Append(self.open_elements[idx - 1]);
                }
            }
            if let Some(&first) = self.open_elements.first() {
                return InsertPosition::Append(first);
            }
        }
        InsertPosition::Append(target)
    }

    fn insert_node_at(&mut self, node_id: NodeId, position: InsertPosition) {
        match position {
            InsertPosition::Append(parent) => self.document.append(node_id, parent),
            InsertPosition::BeforeTable { parent, table } => {
                self.document.insert_before(node_id, parent, table)
            }
        }
    }

    /// Inserts an already registered node at the place appropriate for the
    /// given target; used by the adoption agency
    fn insert_node_with_target(&mut self, node_id: NodeId, target: NodeId) {
        let position = self.appropriate_place(target, true);
        self.insert_node_at(node_id, position);
    }

    /// Inserts an element and switches the tokenizer to RCDATA for its
    /// contents (title, textarea)
    fn parse_rcdata_element(&mut self, name: &str, attributes: Vec<(String, String)>) {
        self.insert_html_element(name, attributes);
        self.tokenizer.set_state(State::RcDataState);
        self.original_insertion_mode = self.insertion_mode;
        self.insertion_mode = InsertionMode::Text;
    }

    /// Inserts an element and switches the tokenizer to RAWTEXT for its
    /// contents (script, style, xmp and friends)
    fn parse_rawtext_element(&mut self, name: &str, attributes: Vec<(String, String)>) {
        self.insert_html_element(name, attributes);
        self.tokenizer.set_state(State::RawTextState);
        self.original_insertion_mode = self.insertion_mode;
        self.insertion_mode = InsertionMode::Text;
    }

    // ------------------------------------------------------------------
    // Active formatting elements

    /// Pushes an element onto the list, applying the Noah's Ark clause:
    /// with three matching entries since the last marker the earliest one
    /// is dropped first
    fn push_active_formatting_element(&mut self, node_id: NodeId) {
        let (name, attributes) = match self.document.get_node_by_id(node_id) {
            Some(node) => (node.name.clone(), node.attributes().to_vec()),
            None => return,
        };

        let mut matching = 0;
        let mut earliest = None;
        for idx in (0..self.active_formatting_elements.len()).rev() {
            match self.active_formatting_elements[idx] {
                ActiveElement::Marker => break,
                ActiveElement::NodeId(id) => {
                    let same = self.document.get_node_by_id(id).is_some_and(|node| {
                        node.name == name && node.attributes() == attributes.as_slice()
                    });
                    if same {
                        matching += 1;
                        earliest = Some(idx);
                    }
                }
            }
        }
        if matching >= 3 {
            if let Some(idx) = earliest {
                self.active_formatting_elements.remove(idx);
            }
        }

        self.active_formatting_elements
            .push(ActiveElement::NodeId(node_id));
    }

    /// Reopens formatting elements that were closed by something else (a
    /// table cell, a misnested tag) so their formatting continues to apply
    fn reconstruct_active_formatting_elements(&mut self) {
        let Some(last) = self.active_formatting_elements.last() else {
            return;
        };
        match last {
            ActiveElement::Marker => return,
            ActiveElement::NodeId(id) => {
                if self.open_elements.contains(id) {
                    return;
                }
            }
        }

        // walk back to the first entry that is still open or a marker
        let mut idx = self.active_formatting_elements.len() - 1;
        while idx > 0 {
            idx -= 1;
            match self.active_formatting_elements[idx] {
                ActiveElement::Marker => {
                    idx += 1;
                    break;
                }
                ActiveElement::NodeId(id) => {
                    if self.open_elements.contains(&id) {
                        idx += 1;
                        break;
                    }
                }
            }
        }

        loop {
            let entry_id = match self.active_formatting_elements[idx] {
                ActiveElement::NodeId(id) => id,
                ActiveElement::Marker => break,
            };
            let (name, attributes) = match self.document.get_node_by_id(entry_id) {
                Some(node) => (node.name.clone(), node.attributes().to_vec()),
                None => break,
            };
            let new_id = self.insert_html_element(&name, attributes);
            self.active_formatting_elements[idx] = ActiveElement::NodeId(new_id);

            if idx == self.active_formatting_elements.len() - 1 {
                break;
            }
            idx += 1;
        }
    }

    fn clear_active_formatting_elements_to_marker(&mut self) {
        while let Some(entry) = self.active_formatting_elements.pop() {
            if entry == ActiveElement::Marker {
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Stack of open elements

    fn current_node_id(&self) -> NodeId {
        *self
            .open_elements
            .last()
            .expect("stack of open elements is empty")
    }

    fn current_node_name(&self) -> String {
        self.node_name(self.current_node_id())
    }

    fn node_name(&self, node_id: NodeId) -> String {
        self.document
            .get_node_by_id(node_id)
            .map(|n| n.name.clone())
            .unwrap_or_default()
    }

    fn is_in_scope(&self, tag: &str, scope: Scope) -> bool {
        for &node_id in self.open_elements.iter().rev() {
            let name = self.node_name(node_id);
            if name == tag {
                return true;
            }
            if self.is_scope_barrier(&name, scope) {
                return false;
            }
        }
        false
    }

    /// Scope check on a specific node rather than a tag name
    fn element_in_scope(&self, target_id: NodeId, scope: Scope) -> bool {
        for &node_id in self.open_elements.iter().rev() {
            if node_id == target_id {
                return true;
            }
            if self.is_scope_barrier(&self.node_name(node_id), scope) {
                return false;
            }
        }
        false
    }

    fn is_scope_barrier(&self, name: &str, scope: Scope) -> bool {
        match scope {
            Scope::Regular => DEFAULT_SCOPE_ELEMENTS.contains(&name),
            Scope::ListItem => {
                DEFAULT_SCOPE_ELEMENTS.contains(&name) || name == "ol" || name == "ul"
            }
            Scope::Button => DEFAULT_SCOPE_ELEMENTS.contains(&name) || name == "button",
            Scope::Table => matches!(name, "html" | "table" | "template"),
            Scope::Select => !matches!(name, "optgroup" | "option"),
        }
    }

    fn generate_implied_end_tags(&mut self, exclude: Option<&str>, thorough: bool) {
        loop {
            if self.open_elements.is_empty() {
                return;
            }
            let name = self.current_node_name();
            if Some(name.as_str()) == exclude {
                return;
            }
            let implied = IMPLIED_END_TAG_ELEMENTS.contains(&name.as_str())
                || (thorough
                    && matches!(
                        name.as_str(),
                        "caption" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr"
                    ));
            if !implied {
                return;
            }
            self.open_elements.pop();
        }
    }

    /// Pops open elements up to and including the named one
    fn pop_until(&mut self, name: &str) {
        while let Some(node_id) = self.open_elements.pop() {
            if self.node_name(node_id) == name {
                break;
            }
        }
    }

    fn pop_until_any(&mut self, names: &[&str]) {
        while let Some(node_id) = self.open_elements.pop() {
            if names.contains(&self.node_name(node_id).as_str()) {
                break;
            }
        }
    }

    fn close_p_element(&mut self) {
        self.generate_implied_end_tags(Some("p"), false);
        if self.current_node_name() != "p" {
            self.parse_error("closing p closes other open elements");
        }
        self.pop_until("p");
    }

    fn close_p_in_button_scope(&mut self) {
        if self.is_in_scope("p", Scope::Button) {
            self.close_p_element();
        }
    }

    /// Closes an open li (or dd/dt) before a new one starts
    fn close_open_list_item(&mut self, names: &[&str]) {
        for &node_id in self.open_elements.clone().iter().rev() {
            let name = self.node_name(node_id);
            if names.contains(&name.as_str()) {
                self.generate_implied_end_tags(Some(&name), false);
                if self.current_node_name() != name {
                    self.parse_error("list item closes other open elements");
                }
                self.pop_until(&name);
                return;
            }
            let node_is_special = self
                .document
                .get_node_by_id(node_id)
                .is_some_and(|n| n.is_special());
            if node_is_special && !matches!(name.as_str(), "address" | "div" | "p") {
                return;
            }
        }
    }

    fn any_other_end_tag(&mut self, name: &str) {
        for idx in (0..self.open_elements.len()).rev() {
            let node_id = self.open_elements[idx];
            let node_name = self.node_name(node_id);
            if node_name == name {
                self.generate_implied_end_tags(Some(name), false);
                if self.current_node_id() != node_id {
                    self.parse_error("end tag closes other open elements");
                }
                while let Some(popped) = self.open_elements.pop() {
                    if popped == node_id {
                        break;
                    }
                }
                return;
            }
            let node_is_special = self
                .document
                .get_node_by_id(node_id)
                .is_some_and(|n| n.is_special());
            if node_is_special {
                self.parse_error("end tag without matching open element");
                return;
            }
        }
    }

    fn clear_stack_back_to_table_context(&mut self) {
        while !matches!(
            self.current_node_name().as_str(),
            "table" | "template" | "html"
        ) {
            self.open_elements.pop();
        }
    }

    fn clear_stack_back_to_table_body_context(&mut self) {
        while !matches!(
            self.current_node_name().as_str(),
            "tbody" | "tfoot" | "thead" | "template" | "html"
        ) {
            self.open_elements.pop();
        }
    }

    fn clear_stack_back_to_table_row_context(&mut self) {
        while !matches!(self.current_node_name().as_str(), "tr" | "template" | "html") {
            self.open_elements.pop();
        }
    }

    /// Picks the insertion mode matching the current stack of open
    /// elements, used after a table or template closes
    fn reset_insertion_mode(&mut self) {
        for (idx, &node_id) in self.open_elements.iter().enumerate().rev() {
            let last = idx == 0;
            let name = self.node_name(node_id);
            let mode = match name.as_str() {
                "select" => Some(InsertionMode::InSelect),
                "td" | "th" if !last => Some(InsertionMode::InCell),
                "tr" => Some(InsertionMode::InRow),
                "tbody" | "thead" | "tfoot" => Some(InsertionMode::InTableBody),
                "caption" => Some(InsertionMode::InCaption),
                "colgroup" => Some(InsertionMode::InColumnGroup),
                "table" => Some(InsertionMode::InTable),
                "template" => Some(InsertionMode::InTemplate),
                "head" if !last => Some(InsertionMode::InBody),
                "body" => Some(InsertionMode::InBody),
                "frameset" => Some(InsertionMode::InFrameset),
                "html" => Some(if self.head_element.is_none() {
                    InsertionMode::BeforeHead
                } else {
                    InsertionMode::AfterHead
                }),
                _ if last => Some(InsertionMode::InBody),
                _ => None,
            };
            if let Some(mode) = mode {
                self.insertion_mode = mode;
                return;
            }
        }
        self.insertion_mode = InsertionMode::InBody;
    }

    // ------------------------------------------------------------------
    // Table helpers

    /// Processes a token with the body rules while foster parenting is in
    /// effect, so insertions end up in front of the table
    fn foster_process_in_body(&mut self, token: &Token) -> Transition {
        self.parse_error("unexpected content in table");
        self.foster_parenting = true;
        let transition = self.handle_in_body(token);
        self.foster_parenting = false;
        transition
    }

    /// Decides what to do with character tokens collected in a table: pure
    /// whitespace stays in the table, anything else is fostered out
    fn flush_pending_table_text(&mut self) {
        if self.pending_table_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_table_text);
        let whitespace_only = text
            .chars()
            .all(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '));

        if whitespace_only {
            self.insert_text(&text);
        } else {
            self.parse_error("non-whitespace text in table");
            self.foster_parenting = true;
            self.reconstruct_active_formatting_elements();
            self.insert_text(&text);
            self.frameset_ok = false;
            self.foster_parenting = false;
        }
    }

    /// Closes the caption element; returns false when there is none open
    fn close_caption(&mut self) -> bool {
        if !self.is_in_scope("caption", Scope::Table) {
            self.parse_error("no caption to close");
            return false;
        }
        self.generate_implied_end_tags(None, false);
        if self.current_node_name() != "caption" {
            self.parse_error("caption closes other open elements");
        }
        self.pop_until("caption");
        self.clear_active_formatting_elements_to_marker();
        self.insertion_mode = InsertionMode::InTable;
        true
    }

    fn close_cell(&mut self) {
        self.generate_implied_end_tags(None, false);
        if !matches!(self.current_node_name().as_str(), "td" | "th") {
            self.parse_error("cell closes other open elements");
        }
        self.pop_until_any(&["td", "th"]);
        self.clear_active_formatting_elements_to_marker();
        self.insertion_mode = InsertionMode::InRow;
    }

    fn close_template(&mut self) {
        if !self.open_elements.iter().any(|&id| self.node_name(id) == "template") {
            self.parse_error("unexpected template end tag");
            return;
        }
        self.generate_implied_end_tags(None, true);
        if self.current_node_name() != "template" {
            self.parse_error("template closes other open elements");
        }
        self.pop_until("template");
        self.clear_active_formatting_elements_to_marker();
        self.reset_insertion_mode();
    }

    fn stop_parsing(&mut self) {
        self.parser_finished = true;
    }

    fn parse_error(&self, message: &str) {
        self.error_logger
            .borrow_mut()
            .add_error(self.tokenizer.get_position(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(input: &str) -> String {
        Html5Parser::parse_str(input).document().tree_format()
    }

    #[test]
    fn empty_document_gets_a_skeleton() {
        assert_eq!(tree(""), "| <html>\n|   <head>\n|   <body>\n");
    }

    #[test]
    fn doctype_and_simple_body() {
        assert_eq!(
            tree("<!DOCTYPE html><p>hi</p>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <p>\n",
                "|       \"hi\"\n",
            )
        );
    }

    #[test]
    fn missing_doctype_switches_to_quirks() {
        let parser = Html5Parser::parse_str("<p>x");
        assert_eq!(parser.document().quirks_mode, QuirksMode::Quirks);
        assert!(!parser.errors().is_empty());
    }

    #[test]
    fn head_contents() {
        assert_eq!(
            tree("<!DOCTYPE html><html><head><title>a&amp;b</title></head><body>x"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|     <title>\n",
                "|       \"a&b\"\n",
                "|   <body>\n",
                "|     \"x\"\n",
            )
        );
    }

    #[test]
    fn text_is_coalesced_into_one_node() {
        let parser = Html5Parser::parse_str("<!DOCTYPE html><body>a&amp;b</body>");
        let document = parser.document();
        let body_text = document.tree_format();
        assert!(body_text.contains("\"a&b\"\n"));
        assert!(!body_text.contains("\"a\"\n"));
    }

    #[test]
    fn void_elements_get_no_children() {
        assert_eq!(
            tree("<!DOCTYPE html><p>a<br>b</p>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <p>\n",
                "|       \"a\"\n",
                "|       <br>\n",
                "|       \"b\"\n",
            )
        );
    }

    #[test]
    fn implied_end_tags_for_list_items() {
        assert_eq!(
            tree("<!DOCTYPE html><ul><li>A<li>B</ul>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <ul>\n",
                "|       <li>\n",
                "|         \"A\"\n",
                "|       <li>\n",
                "|         \"B\"\n",
            )
        );
    }

    #[test]
    fn nested_p_closes_previous() {
        assert_eq!(
            tree("<!DOCTYPE html><p>one<p>two"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <p>\n",
                "|       \"one\"\n",
                "|     <p>\n",
                "|       \"two\"\n",
            )
        );
    }

    #[test]
    fn table_with_implied_sections() {
        assert_eq!(
            tree("<!DOCTYPE html><table><tr><td>1</table>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <table>\n",
                "|       <tbody>\n",
                "|         <tr>\n",
                "|           <td>\n",
                "|             \"1\"\n",
            )
        );
    }

    #[test]
    fn table_text_is_fostered() {
        assert_eq!(
            tree("<!DOCTYPE html><table>x<tr><td>1</table>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     \"x\"\n",
                "|     <table>\n",
                "|       <tbody>\n",
                "|         <tr>\n",
                "|           <td>\n",
                "|             \"1\"\n",
            )
        );
    }

    #[test]
    fn whitespace_stays_inside_the_table() {
        assert_eq!(
            tree("<!DOCTYPE html><table> </table>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <table>\n",
                "|       \" \"\n",
            )
        );
    }

    #[test]
    fn select_in_table_is_closed_by_cell_tag() {
        assert_eq!(
            tree("<!DOCTYPE html><table><tr><td><select><option>a<td>b</table>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <table>\n",
                "|       <tbody>\n",
                "|         <tr>\n",
                "|           <td>\n",
                "|             <select>\n",
                "|               <option>\n",
                "|                 \"a\"\n",
                "|           <td>\n",
                "|             \"b\"\n",
            )
        );
    }

    #[test]
    fn comment_after_body_attaches_to_html() {
        assert_eq!(
            tree("<!DOCTYPE html><body>x</body><!--done-->"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     \"x\"\n",
                "|   <!-- done -->\n",
            )
        );
    }

    #[test]
    fn pre_drops_its_first_newline() {
        assert_eq!(
            tree("<!DOCTYPE html><pre>\nkeep\n</pre>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <body>\n",
                "|     <pre>\n",
                "|       \"keep\n\"\n",
            )
        );
    }

    #[test]
    fn frameset_replaces_body_while_allowed() {
        assert_eq!(
            tree("<!DOCTYPE html><frameset><frame></frameset>"),
            concat!(
                "| <!DOCTYPE html>\n",
                "| <html>\n",
                "|   <head>\n",
                "|   <frameset>\n",
                "|     <frame>\n",
            )
        );
    }

    #[test]
    fn reset_insertion_mode_for_stack_shapes() {
        let mut parser = Html5Parser::parse_str("<!DOCTYPE html><table><tr><td>x</td></tr></table>");
        parser.reset_insertion_mode();
        assert_eq!(parser.insertion_mode, InsertionMode::InBody);
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        assert!(Html5Parser::parse_bytes(&[0x80, 0x81]).is_err());
        assert!(Html5Parser::parse_bytes(b"<p>ok").is_ok());
    }
}
