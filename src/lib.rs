//! A streaming WHATWG HTML5 parser.
//!
//! Input arrives in arbitrary chunks through [`parser::Html5Parser::write`];
//! the tokenizer suspends mid-token at a chunk boundary and resumes when the
//! next chunk (or [`parser::Html5Parser::end`]) arrives, so any split of the
//! input produces the same tree as parsing it in one piece.
//!
//! ```
//! use strandhtml::parser::Html5Parser;
//!
//! let mut parser = Html5Parser::new();
//! parser.write("<!DOCTYPE html><p>hello ");
//! parser.write("&amp; goodbye</p>");
//! parser.end();
//!
//! assert!(parser.document().tree_format().contains("\"hello & goodbye\""));
//! ```

pub mod error_logger;
pub mod node;
pub mod parser;
pub mod stream;
pub mod testing;
pub mod tokenizer;
pub mod types;
