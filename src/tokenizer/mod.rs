use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error_logger::{ErrorLogger, ParserError};
use crate::stream::{ChunkedStream, Element, Position};
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;

pub mod entities;
pub mod state;
pub mod token;

pub const CHAR_NUL: char = '\u{0000}';
pub const CHAR_TAB: char = '\u{0009}';
pub const CHAR_LF: char = '\u{000A}';
pub const CHAR_FF: char = '\u{000C}';
pub const CHAR_CR: char = '\u{000D}';
pub const CHAR_SPACE: char = '\u{0020}';
pub const CHAR_REPLACEMENT: char = '\u{FFFD}';

/// Outcome of a single state machine step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    Continue,
    /// Ran out of buffered input mid-token; resumes on the next write()/end()
    Suspended,
}

/// Result of a token pull
#[derive(Debug, Clone, PartialEq)]
pub enum TokenFetch {
    Token(Token),
    /// More input is needed before another token can be produced
    Pending,
}

// Reads the next character, or suspends the current step when the buffer is
// exhausted while the stream is still open. Resuming re-enters the same
// state, so a step must not mutate anything before its first read.
macro_rules! read_char {
    ($self:expr) => {{
        match $self.stream.read_char() {
            $crate::stream::ReadChar::Ch(c) => $crate::stream::Element::Utf8(c),
            $crate::stream::ReadChar::Eof => $crate::stream::Element::Eof,
            $crate::stream::ReadChar::Pending => {
                return $crate::tokenizer::Progress::Suspended;
            }
        }
    }};
}

// Checks for a keyword at the cursor, suspending when undecidable
macro_rules! stream_matches {
    ($self:expr, $keyword:expr, $insensitive:expr) => {{
        match $self.stream.matches($keyword, $insensitive) {
            Some(v) => v,
            None => return $crate::tokenizer::Progress::Suspended,
        }
    }};
}

mod charref;

/// Options that can be passed to the tokenizer, mostly for testing purposes
pub struct Options {
    /// Sets the initial state of the tokenizer. Normally only needed for tests
    pub initial_state: State,
    /// Sets the last started tag in the tokenizer (for appropriate end-tag checks)
    pub last_start_tag: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            initial_state: State::DataState,
            last_start_tag: String::new(),
        }
    }
}

/// The HTML tokenizer. Input arrives through write()/end(); tokens are
/// pulled with next_token() so the tree builder can adjust the content model
/// between pulls.
pub struct Tokenizer {
    stream: ChunkedStream,
    /// Current state of the state machine
    state: State,
    /// State to return to after a character reference is resolved
    return_state: State,
    /// Temporary buffer, holds the raw characters of an in-flight character
    /// reference or speculative end tag
    temporary_buffer: String,
    /// Code accumulator for numeric character references
    char_ref_code: u32,
    /// Token that is currently being assembled
    current_token: Option<Token>,
    /// Name of the attribute that is currently being assembled
    current_attr_name: String,
    /// Value of the attribute that is currently being assembled
    current_attr_value: String,
    /// Completed attributes of the tag that is currently being assembled
    current_attrs: Vec<(String, String)>,
    /// Set when a solidus was seen on an end tag (not representable in the token)
    end_tag_self_closing: bool,
    /// Queue of tokens ready to be returned from next_token()
    token_queue: VecDeque<Token>,
    /// Name of the last emitted start tag, for the appropriate end-tag check
    last_start_tag: String,
    /// Parse errors get logged here
    pub error_logger: Rc<RefCell<ErrorLogger>>,
}

impl Tokenizer {
    pub fn new(opts: Option<Options>, error_logger: Rc<RefCell<ErrorLogger>>) -> Self {
        let opts = opts.unwrap_or_default();
        Self {
            stream: ChunkedStream::new(),
            state: opts.initial_state,
            return_state: State::DataState,
            temporary_buffer: String::new(),
            char_ref_code: 0,
            current_token: None,
            current_attr_name: String::new(),
            current_attr_value: String::new(),
            current_attrs: Vec::new(),
            end_tag_self_closing: false,
            token_queue: VecDeque::new(),
            last_start_tag: opts.last_start_tag,
            error_logger,
        }
    }

    /// Appends a chunk of input
    pub fn write(&mut self, chunk: &str) {
        self.stream.write(chunk);
    }

    /// Signals that no more input will arrive
    pub fn end(&mut self) {
        self.stream.end();
    }

    /// Content model command surface for the tree builder (RCDATA, RAWTEXT,
    /// PLAINTEXT or back to data)
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub fn set_last_start_tag(&mut self, name: &str) {
        self.last_start_tag = name.to_string();
    }

    pub fn get_position(&self) -> Position {
        self.stream.position()
    }

    /// Returns the next token, or Pending when the machine is suspended at
    /// the current chunk boundary
    pub fn next_token(&mut self) -> TokenFetch {
        loop {
            if let Some(token) = self.token_queue.pop_front() {
                return TokenFetch::Token(token);
            }
            if self.step() == Progress::Suspended {
                return match self.token_queue.pop_front() {
                    Some(token) => TokenFetch::Token(token),
                    None => TokenFetch::Pending,
                };
            }
        }
    }

    /// Runs the state machine for (at most) one consumed character
    fn step(&mut self) -> Progress {
        #[cfg(feature = "debug_parser_verbose")]
        log::trace!("tokenizer step in {:?}", self.state);

        match self.state {
            State::DataState => {
                match read_char!(self) {
                    Element::Utf8('&') => {
                        self.return_state = State::DataState;
                        self.temporary_buffer.clear();
                        self.temporary_buffer.push('&');
                        self.state = State::CharacterReferenceState;
                    }
                    Element::Utf8('<') => self.state = State::TagOpenState,
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.emit_char(CHAR_NUL);
                    }
                    Element::Utf8(c) => self.emit_char(c),
                    Element::Eof => self.emit(Token::EofToken),
                }
                Progress::Continue
            }
            State::CharacterReferenceState => self.step_character_reference(),
            State::NamedCharacterReferenceState => self.step_named_character_reference(),
            State::NumericCharacterReferenceState => self.step_numeric_character_reference(),
            State::HexadecimalCharacterReferenceStartState => self.step_hexadecimal_start(),
            State::DecimalCharacterReferenceStartState => self.step_decimal_start(),
            State::HexadecimalCharacterReferenceState => self.step_hexadecimal(),
            State::DecimalCharacterReferenceState => self.step_decimal(),
            State::NumericCharacterReferenceEndState => self.step_numeric_end(),
            State::RcDataState => {
                match read_char!(self) {
                    Element::Utf8('&') => {
                        self.return_state = State::RcDataState;
                        self.temporary_buffer.clear();
                        self.temporary_buffer.push('&');
                        self.state = State::CharacterReferenceState;
                    }
                    Element::Utf8('<') => self.state = State::RcDataLessThanSignState,
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.emit_char(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.emit_char(c),
                    Element::Eof => self.emit(Token::EofToken),
                }
                Progress::Continue
            }
            State::RcDataLessThanSignState => {
                match read_char!(self) {
                    Element::Utf8('/') => {
                        self.temporary_buffer.clear();
                        self.state = State::RcDataEndTagOpenState;
                    }
                    _ => {
                        self.stream.unread();
                        self.emit_char('<');
                        self.state = State::RcDataState;
                    }
                }
                Progress::Continue
            }
            State::RcDataEndTagOpenState => {
                match read_char!(self) {
                    Element::Utf8(c) if c.is_ascii_alphabetic() => {
                        self.current_token = Some(Token::EndTagToken {
                            name: String::new(),
                        });
                        self.stream.unread();
                        self.state = State::RcDataEndTagNameState;
                    }
                    _ => {
                        self.stream.unread();
                        self.emit_char('<');
                        self.emit_char('/');
                        self.state = State::RcDataState;
                    }
                }
                Progress::Continue
            }
            State::RcDataEndTagNameState => self.step_text_end_tag_name(State::RcDataState),
            State::RawTextState => {
                match read_char!(self) {
                    Element::Utf8('<') => self.state = State::RawTextLessThanSignState,
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.emit_char(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.emit_char(c),
                    Element::Eof => self.emit(Token::EofToken),
                }
                Progress::Continue
            }
            State::RawTextLessThanSignState => {
                match read_char!(self) {
                    Element::Utf8('/') => {
                        self.temporary_buffer.clear();
                        self.state = State::RawTextEndTagOpenState;
                    }
                    _ => {
                        self.stream.unread();
                        self.emit_char('<');
                        self.state = State::RawTextState;
                    }
                }
                Progress::Continue
            }
            State::RawTextEndTagOpenState => {
                match read_char!(self) {
                    Element::Utf8(c) if c.is_ascii_alphabetic() => {
                        self.current_token = Some(Token::EndTagToken {
                            name: String::new(),
                        });
                        self.stream.unread();
                        self.state = State::RawTextEndTagNameState;
                    }
                    _ => {
                        self.stream.unread();
                        self.emit_char('<');
                        self.emit_char('/');
                        self.state = State::RawTextState;
                    }
                }
                Progress::Continue
            }
            State::RawTextEndTagNameState => self.step_text_end_tag_name(State::RawTextState),
            State::PlaintextState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.emit_char(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.emit_char(c),
                    Element::Eof => self.emit(Token::EofToken),
                }
                Progress::Continue
            }
            State::TagOpenState => {
                match read_char!(self) {
                    Element::Utf8('!') => self.state = State::MarkupDeclarationOpenState,
                    Element::Utf8('/') => self.state = State::EndTagOpenState,
                    Element::Utf8(c) if c.is_ascii_alphabetic() => {
                        self.current_token = Some(Token::StartTagToken {
                            name: String::new(),
                            is_self_closing: false,
                            attributes: Vec::new(),
                        });
                        self.current_attrs.clear();
                        self.stream.unread();
                        self.state = State::TagNameState;
                    }
                    Element::Utf8('?') => {
                        self.parse_error(ParserError::UnexpectedQuestionMarkInsteadOfTagName);
                        self.current_token = Some(Token::CommentToken {
                            value: String::new(),
                        });
                        self.stream.unread();
                        self.state = State::BogusCommentState;
                    }
                    Element::Utf8(_) => {
                        self.parse_error(ParserError::InvalidFirstCharacterOfTagName);
                        self.emit_char('<');
                        self.stream.unread();
                        self.state = State::DataState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofBeforeTagName);
                        self.emit_char('<');
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::EndTagOpenState => {
                match read_char!(self) {
                    Element::Utf8(c) if c.is_ascii_alphabetic() => {
                        self.current_token = Some(Token::EndTagToken {
                            name: String::new(),
                        });
                        self.current_attrs.clear();
                        self.end_tag_self_closing = false;
                        self.stream.unread();
                        self.state = State::TagNameState;
                    }
                    Element::Utf8('>') => {
                        self.parse_error(ParserError::MissingEndTagName);
                        self.state = State::DataState;
                    }
                    Element::Utf8(_) => {
                        self.parse_error(ParserError::InvalidFirstCharacterOfTagName);
                        self.current_token = Some(Token::CommentToken {
                            value: String::new(),
                        });
                        self.stream.unread();
                        self.state = State::BogusCommentState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofBeforeTagName);
                        self.emit_char('<');
                        self.emit_char('/');
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::TagNameState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        self.state = State::BeforeAttributeNameState
                    }
                    Element::Utf8('/') => self.state = State::SelfClosingStartState,
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.add_to_token_name(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.add_to_token_name(c.to_ascii_lowercase()),
                    Element::Eof => {
                        self.parse_error(ParserError::EofInTag);
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::BeforeAttributeNameState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        // ignore
                    }
                    Element::Utf8('/' | '>') | Element::Eof => {
                        self.stream.unread();
                        self.state = State::AfterAttributeNameState;
                    }
                    Element::Utf8('=') => {
                        self.parse_error(ParserError::UnexpectedEqualsSignBeforeAttributeName);
                        self.store_current_attribute();
                        self.current_attr_name.push('=');
                        self.state = State::AttributeNameState;
                    }
                    Element::Utf8(_) => {
                        self.store_current_attribute();
                        self.stream.unread();
                        self.state = State::AttributeNameState;
                    }
                }
                Progress::Continue
            }
            State::AttributeNameState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE | '/' | '>')
                    | Element::Eof => {
                        self.stream.unread();
                        self.state = State::AfterAttributeNameState;
                    }
                    Element::Utf8('=') => self.state = State::BeforeAttributeValueState,
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.current_attr_name.push(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c @ ('"' | '\'' | '<')) => {
                        self.parse_error(ParserError::UnexpectedCharacterInAttributeName);
                        self.current_attr_name.push(c);
                    }
                    Element::Utf8(c) => self.current_attr_name.push(c.to_ascii_lowercase()),
                }
                Progress::Continue
            }
            State::AfterAttributeNameState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        // ignore
                    }
                    Element::Utf8('/') => self.state = State::SelfClosingStartState,
                    Element::Utf8('=') => self.state = State::BeforeAttributeValueState,
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(_) => {
                        self.store_current_attribute();
                        self.stream.unread();
                        self.state = State::AttributeNameState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInTag);
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::BeforeAttributeValueState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        // ignore
                    }
                    Element::Utf8('"') => self.state = State::AttributeValueDoubleQuotedState,
                    Element::Utf8('\'') => self.state = State::AttributeValueSingleQuotedState,
                    Element::Utf8('>') => {
                        self.parse_error(ParserError::MissingAttributeValue);
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    _ => {
                        self.stream.unread();
                        self.state = State::AttributeValueUnquotedState;
                    }
                }
                Progress::Continue
            }
            State::AttributeValueDoubleQuotedState => {
                match read_char!(self) {
                    Element::Utf8('"') => self.state = State::AfterAttributeValueQuotedState,
                    Element::Utf8('&') => {
                        self.return_state = State::AttributeValueDoubleQuotedState;
                        self.temporary_buffer.clear();
                        self.temporary_buffer.push('&');
                        self.state = State::CharacterReferenceState;
                    }
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.current_attr_value.push(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.current_attr_value.push(c),
                    Element::Eof => {
                        self.parse_error(ParserError::EofInTag);
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::AttributeValueSingleQuotedState => {
                match read_char!(self) {
                    Element::Utf8('\'') => self.state = State::AfterAttributeValueQuotedState,
                    Element::Utf8('&') => {
                        self.return_state = State::AttributeValueSingleQuotedState;
                        self.temporary_buffer.clear();
                        self.temporary_buffer.push('&');
                        self.state = State::CharacterReferenceState;
                    }
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.current_attr_value.push(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.current_attr_value.push(c),
                    Element::Eof => {
                        self.parse_error(ParserError::EofInTag);
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::AttributeValueUnquotedState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        self.state = State::BeforeAttributeNameState
                    }
                    Element::Utf8('&') => {
                        self.return_state = State::AttributeValueUnquotedState;
                        self.temporary_buffer.clear();
                        self.temporary_buffer.push('&');
                        self.state = State::CharacterReferenceState;
                    }
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.current_attr_value.push(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c @ ('"' | '\'' | '<' | '=' | '`')) => {
                        self.parse_error(ParserError::UnexpectedCharacterInUnquotedAttributeValue);
                        self.current_attr_value.push(c);
                    }
                    Element::Utf8(c) => self.current_attr_value.push(c),
                    Element::Eof => {
                        self.parse_error(ParserError::EofInTag);
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::AfterAttributeValueQuotedState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        self.state = State::BeforeAttributeNameState
                    }
                    Element::Utf8('/') => self.state = State::SelfClosingStartState,
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(_) => {
                        self.parse_error(ParserError::MissingWhitespaceBetweenAttributes);
                        self.stream.unread();
                        self.state = State::BeforeAttributeNameState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInTag);
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::SelfClosingStartState => {
                match read_char!(self) {
                    Element::Utf8('>') => {
                        self.set_self_closing();
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(_) => {
                        self.parse_error(ParserError::UnexpectedSolidusInTag);
                        self.stream.unread();
                        self.state = State::BeforeAttributeNameState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInTag);
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::BogusCommentState => {
                match read_char!(self) {
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.add_to_comment(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.add_to_comment(c),
                    Element::Eof => {
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::MarkupDeclarationOpenState => {
                if stream_matches!(self, "--", false) {
                    self.stream.skip(2);
                    self.current_token = Some(Token::CommentToken {
                        value: String::new(),
                    });
                    self.state = State::CommentStartState;
                } else if stream_matches!(self, "doctype", true) {
                    self.stream.skip(7);
                    self.state = State::DocTypeState;
                } else if stream_matches!(self, "[CDATA[", false) {
                    self.stream.skip(7);
                    // no foreign content support, so this is always an error
                    self.parse_error(ParserError::CdataInHtmlContent);
                    self.current_token = Some(Token::CommentToken {
                        value: "[CDATA[".to_string(),
                    });
                    self.state = State::BogusCommentState;
                } else {
                    self.parse_error(ParserError::IncorrectlyOpenedComment);
                    self.current_token = Some(Token::CommentToken {
                        value: String::new(),
                    });
                    self.state = State::BogusCommentState;
                }
                Progress::Continue
            }
            State::CommentStartState => {
                match read_char!(self) {
                    Element::Utf8('-') => self.state = State::CommentStartDashState,
                    Element::Utf8('>') => {
                        self.parse_error(ParserError::AbruptClosingOfEmptyComment);
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    _ => {
                        self.stream.unread();
                        self.state = State::CommentState;
                    }
                }
                Progress::Continue
            }
            State::CommentStartDashState => {
                match read_char!(self) {
                    Element::Utf8('-') => self.state = State::CommentEndState,
                    Element::Utf8('>') => {
                        self.parse_error(ParserError::AbruptClosingOfEmptyComment);
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(_) => {
                        self.add_to_comment('-');
                        self.stream.unread();
                        self.state = State::CommentState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInComment);
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::CommentState => {
                match read_char!(self) {
                    Element::Utf8('-') => self.state = State::CommentEndDashState,
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.add_to_comment(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.add_to_comment(c),
                    Element::Eof => {
                        self.parse_error(ParserError::EofInComment);
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::CommentEndDashState => {
                match read_char!(self) {
                    Element::Utf8('-') => self.state = State::CommentEndState,
                    Element::Utf8(_) => {
                        self.add_to_comment('-');
                        self.stream.unread();
                        self.state = State::CommentState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInComment);
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::CommentEndState => {
                match read_char!(self) {
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8('!') => self.state = State::CommentEndBangState,
                    Element::Utf8('-') => self.add_to_comment('-'),
                    Element::Utf8(_) => {
                        self.add_to_comment('-');
                        self.add_to_comment('-');
                        self.stream.unread();
                        self.state = State::CommentState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInComment);
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::CommentEndBangState => {
                match read_char!(self) {
                    Element::Utf8('-') => {
                        self.add_to_comment('-');
                        self.add_to_comment('-');
                        self.add_to_comment('!');
                        self.state = State::CommentEndDashState;
                    }
                    Element::Utf8('>') => {
                        self.parse_error(ParserError::IncorrectlyClosedComment);
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(_) => {
                        self.add_to_comment('-');
                        self.add_to_comment('-');
                        self.add_to_comment('!');
                        self.stream.unread();
                        self.state = State::CommentState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInComment);
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::DocTypeState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        self.state = State::BeforeDocTypeNameState
                    }
                    Element::Utf8('>') => {
                        self.stream.unread();
                        self.state = State::BeforeDocTypeNameState;
                    }
                    Element::Utf8(_) => {
                        self.parse_error(ParserError::MissingWhitespaceBeforeDoctypeName);
                        self.stream.unread();
                        self.state = State::BeforeDocTypeNameState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInDoctype);
                        self.emit(Token::DocTypeToken {
                            name: None,
                            force_quirks: true,
                        });
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::BeforeDocTypeNameState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        // ignore
                    }
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.current_token = Some(Token::DocTypeToken {
                            name: Some(CHAR_REPLACEMENT.to_string()),
                            force_quirks: false,
                        });
                        self.state = State::DocTypeNameState;
                    }
                    Element::Utf8('>') => {
                        self.parse_error(ParserError::MissingDoctypeName);
                        self.emit(Token::DocTypeToken {
                            name: None,
                            force_quirks: true,
                        });
                        self.state = State::DataState;
                    }
                    Element::Utf8(c) => {
                        self.current_token = Some(Token::DocTypeToken {
                            name: Some(c.to_ascii_lowercase().to_string()),
                            force_quirks: false,
                        });
                        self.state = State::DocTypeNameState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInDoctype);
                        self.emit(Token::DocTypeToken {
                            name: None,
                            force_quirks: true,
                        });
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::DocTypeNameState => {
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        self.state = State::AfterDocTypeNameState
                    }
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                        self.add_to_doctype_name(CHAR_REPLACEMENT);
                    }
                    Element::Utf8(c) => self.add_to_doctype_name(c.to_ascii_lowercase()),
                    Element::Eof => {
                        self.parse_error(ParserError::EofInDoctype);
                        self.set_doctype_force_quirks();
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::AfterDocTypeNameState => {
                // public and system identifiers are not interpreted; anything
                // after the name degrades to a bogus (force-quirks) doctype
                match read_char!(self) {
                    Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE) => {
                        // ignore
                    }
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(_) => {
                        self.parse_error(ParserError::InvalidCharacterSequenceAfterDoctypeName);
                        self.set_doctype_force_quirks();
                        self.stream.unread();
                        self.state = State::BogusDocTypeState;
                    }
                    Element::Eof => {
                        self.parse_error(ParserError::EofInDoctype);
                        self.set_doctype_force_quirks();
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
            State::BogusDocTypeState => {
                match read_char!(self) {
                    Element::Utf8('>') => {
                        self.emit_current_token();
                        self.state = State::DataState;
                    }
                    Element::Utf8(CHAR_NUL) => {
                        self.parse_error(ParserError::UnexpectedNullCharacter);
                    }
                    Element::Utf8(_) => {
                        // ignore
                    }
                    Element::Eof => {
                        self.emit_current_token();
                        self.emit(Token::EofToken);
                    }
                }
                Progress::Continue
            }
        }
    }

    /// Shared RCDATA/RAWTEXT end tag name state. Only an appropriate end tag
    /// (matching the last emitted start tag) terminates the text content.
    fn step_text_end_tag_name(&mut self, text_state: State) -> Progress {
        match read_char!(self) {
            Element::Utf8(c) if c.is_ascii_alphabetic() => {
                self.add_to_token_name(c.to_ascii_lowercase());
                self.temporary_buffer.push(c);
                Progress::Continue
            }
            Element::Utf8(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_CR | CHAR_SPACE)
                if self.is_appropriate_end_token() =>
            {
                self.state = State::BeforeAttributeNameState;
                Progress::Continue
            }
            Element::Utf8('/') if self.is_appropriate_end_token() => {
                self.state = State::SelfClosingStartState;
                Progress::Continue
            }
            Element::Utf8('>') if self.is_appropriate_end_token() => {
                self.emit_current_token();
                self.state = State::DataState;
                Progress::Continue
            }
            _ => {
                self.stream.unread();
                self.emit_char('<');
                self.emit_char('/');
                let buffer: Vec<char> = self.temporary_buffer.chars().collect();
                for c in buffer {
                    self.emit_char(c);
                }
                self.temporary_buffer.clear();
                self.current_token = None;
                self.state = text_state;
                Progress::Continue
            }
        }
    }

    /// True when the end tag under construction matches the last emitted
    /// start tag
    fn is_appropriate_end_token(&self) -> bool {
        match &self.current_token {
            Some(Token::EndTagToken { name }) => {
                !self.last_start_tag.is_empty() && *name == self.last_start_tag
            }
            _ => false,
        }
    }

    /// Logs a parse error at the current stream position
    pub(crate) fn parse_error(&mut self, error: ParserError) {
        self.error_logger
            .borrow_mut()
            .add_error(self.stream.position(), error.as_str());
    }

    /// Pushes a completed token onto the queue
    fn emit(&mut self, token: Token) {
        if let Token::StartTagToken { name, .. } = &token {
            self.last_start_tag = name.clone();
        }
        self.token_queue.push_back(token);
    }

    fn emit_char(&mut self, c: char) {
        self.emit(Token::TextToken {
            value: c.to_string(),
        });
    }

    /// Finalizes and emits the token under construction
    fn emit_current_token(&mut self) {
        self.store_current_attribute();

        let Some(mut token) = self.current_token.take() else {
            return;
        };

        match &mut token {
            Token::StartTagToken { attributes, .. } => {
                *attributes = std::mem::take(&mut self.current_attrs);
            }
            Token::EndTagToken { .. } => {
                if !self.current_attrs.is_empty() {
                    self.parse_error(ParserError::EndTagWithAttributes);
                    self.current_attrs.clear();
                }
                if self.end_tag_self_closing {
                    self.parse_error(ParserError::EndTagWithTrailingSolidus);
                    self.end_tag_self_closing = false;
                }
            }
            _ => {}
        }

        self.emit(token);
    }

    /// Completes the attribute under construction, dropping duplicates
    fn store_current_attribute(&mut self) {
        if self.current_attr_name.is_empty() {
            return;
        }

        let name = std::mem::take(&mut self.current_attr_name);
        let value = std::mem::take(&mut self.current_attr_value);

        if self.current_attrs.iter().any(|(n, _)| *n == name) {
            self.parse_error(ParserError::DuplicateAttribute);
        } else {
            self.current_attrs.push((name, value));
        }
    }

    fn add_to_token_name(&mut self, c: char) {
        match &mut self.current_token {
            Some(Token::StartTagToken { name, .. }) | Some(Token::EndTagToken { name }) => {
                name.push(c);
            }
            _ => {}
        }
    }

    fn add_to_comment(&mut self, c: char) {
        if let Some(Token::CommentToken { value }) = &mut self.current_token {
            value.push(c);
        }
    }

    fn add_to_doctype_name(&mut self, c: char) {
        if let Some(Token::DocTypeToken {
            name: Some(name), ..
        }) = &mut self.current_token
        {
            name.push(c);
        }
    }

    fn set_doctype_force_quirks(&mut self) {
        if let Some(Token::DocTypeToken { force_quirks, .. }) = &mut self.current_token {
            *force_quirks = true;
        }
    }

    fn set_self_closing(&mut self) {
        match &mut self.current_token {
            Some(Token::StartTagToken {
                is_self_closing, ..
            }) => *is_self_closing = true,
            Some(Token::EndTagToken { .. }) => self.end_tag_self_closing = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        let logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(None, logger);
        tokenizer.write(input);
        tokenizer.end();
        collect(&mut tokenizer)
    }

    fn collect(tokenizer: &mut Tokenizer) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            match tokenizer.next_token() {
                TokenFetch::Token(Token::EofToken) => break,
                TokenFetch::Token(t) => tokens.push(t),
                TokenFetch::Pending => break,
            }
        }
        tokens
    }

    fn text_of(tokens: &[Token]) -> String {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::TextToken { value } => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn simple_tag_with_attributes() {
        let tokens = tokenize("<div class=\"a\" id=b>x</div>");
        assert_eq!(
            tokens[0],
            Token::StartTagToken {
                name: "div".to_string(),
                is_self_closing: false,
                attributes: vec![
                    ("class".to_string(), "a".to_string()),
                    ("id".to_string(), "b".to_string())
                ],
            }
        );
        assert_eq!(
            tokens[1],
            Token::TextToken {
                value: "x".to_string()
            }
        );
        assert_eq!(
            tokens[2],
            Token::EndTagToken {
                name: "div".to_string()
            }
        );
    }

    #[test]
    fn duplicate_attributes_first_wins() {
        let tokens = tokenize("<p id=a id=b>");
        assert_eq!(
            tokens[0],
            Token::StartTagToken {
                name: "p".to_string(),
                is_self_closing: false,
                attributes: vec![("id".to_string(), "a".to_string())],
            }
        );
    }

    #[test]
    fn tag_names_are_lowercased() {
        let tokens = tokenize("<DIV ID=X></DIV>");
        assert!(tokens[0].is_start_tag("div"));
        assert_eq!(
            tokens[0],
            Token::StartTagToken {
                name: "div".to_string(),
                is_self_closing: false,
                attributes: vec![("id".to_string(), "X".to_string())],
            }
        );
    }

    #[test]
    fn comment_token() {
        let tokens = tokenize("<!-- hello -->");
        assert_eq!(
            tokens[0],
            Token::CommentToken {
                value: " hello ".to_string()
            }
        );
    }

    #[test]
    fn comment_end_bang() {
        let tokens = tokenize("<!--x--!>");
        assert_eq!(
            tokens[0],
            Token::CommentToken {
                value: "x".to_string()
            }
        );
    }

    #[test]
    fn doctype_name_only() {
        let tokens = tokenize("<!DOCTYPE html>");
        assert_eq!(
            tokens[0],
            Token::DocTypeToken {
                name: Some("html".to_string()),
                force_quirks: false
            }
        );
    }

    #[test]
    fn doctype_with_trailing_junk_forces_quirks() {
        let tokens = tokenize("<!DOCTYPE html PUBLIC \"x\">");
        assert_eq!(
            tokens[0],
            Token::DocTypeToken {
                name: Some("html".to_string()),
                force_quirks: true
            }
        );
    }

    #[test]
    fn named_entity_in_data() {
        assert_eq!(text_of(&tokenize("&amp;")), "&");
        assert_eq!(text_of(&tokenize("&copy;")), "\u{A9}");
        // legacy form without semicolon still resolves in data
        assert_eq!(text_of(&tokenize("&copy")), "\u{A9}");
        assert_eq!(text_of(&tokenize("&copy1")), "\u{A9}1");
        // unknown references stay literal
        assert_eq!(text_of(&tokenize("&xyzzy;")), "&xyzzy;");
        // longest prefix wins
        assert_eq!(text_of(&tokenize("&not;x")), "\u{AC}x");
        assert_eq!(text_of(&tokenize("&notin;x")), "\u{2209}x");
        assert_eq!(text_of(&tokenize("&notit;")), "\u{AC}it;");
        // the legacy prefix applies even inside a longer unknown name
        assert_eq!(text_of(&tokenize("&notanentity;")), "\u{AC}anentity;");
    }

    #[test]
    fn entity_in_attribute_value() {
        let tokens = tokenize("<a href=\"?a=b&copy=1\">");
        assert_eq!(
            tokens[0],
            Token::StartTagToken {
                name: "a".to_string(),
                is_self_closing: false,
                attributes: vec![("href".to_string(), "?a=b&copy=1".to_string())],
            }
        );

        let tokens = tokenize("<a href=\"&copy;\">");
        assert_eq!(
            tokens[0],
            Token::StartTagToken {
                name: "a".to_string(),
                is_self_closing: false,
                attributes: vec![("href".to_string(), "\u{A9}".to_string())],
            }
        );
    }

    #[test]
    fn numeric_entities() {
        assert_eq!(text_of(&tokenize("&#65;")), "A");
        assert_eq!(text_of(&tokenize("&#x41;")), "A");
        assert_eq!(text_of(&tokenize("&#x0;")), "\u{FFFD}");
        assert_eq!(text_of(&tokenize("&#xD800;")), "\u{FFFD}");
        assert_eq!(text_of(&tokenize("&#x110000;")), "\u{FFFD}");
        // windows-1252 remap range
        assert_eq!(text_of(&tokenize("&#x80;")), "\u{20AC}");
        assert_eq!(text_of(&tokenize("&#153;")), "\u{2122}");
        // no digits
        assert_eq!(text_of(&tokenize("&#;")), "&#;");
        assert_eq!(text_of(&tokenize("&#x;")), "&#x;");
    }

    #[test]
    fn entity_split_across_chunks() {
        let logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(None, logger);
        tokenizer.write("&am");
        assert_eq!(tokenizer.next_token(), TokenFetch::Pending);
        tokenizer.write("p;x");
        tokenizer.end();
        let tokens = collect(&mut tokenizer);
        assert_eq!(text_of(&tokens), "&x");
    }

    #[test]
    fn rcdata_appropriate_end_tag() {
        let logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(
            Some(Options {
                initial_state: State::RcDataState,
                last_start_tag: "title".to_string(),
            }),
            logger,
        );
        tokenizer.write("x</ti></title>");
        tokenizer.end();
        let tokens = collect(&mut tokenizer);
        assert_eq!(text_of(&tokens), "x</ti>");
        assert!(tokens.last().is_some_and(|t| t.is_end_tag("title")));
    }

    #[test]
    fn rcdata_entity_resolution() {
        let logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(
            Some(Options {
                initial_state: State::RcDataState,
                last_start_tag: "textarea".to_string(),
            }),
            logger,
        );
        tokenizer.write("a&amp;b</textarea>");
        tokenizer.end();
        let tokens = collect(&mut tokenizer);
        assert_eq!(text_of(&tokens), "a&b");
    }

    #[test]
    fn rawtext_ignores_entities() {
        let logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(
            Some(Options {
                initial_state: State::RawTextState,
                last_start_tag: "style".to_string(),
            }),
            logger,
        );
        tokenizer.write("a&amp;b</style>");
        tokenizer.end();
        let tokens = collect(&mut tokenizer);
        assert_eq!(text_of(&tokens), "a&amp;b");
    }

    #[test]
    fn markup_declaration_split_across_chunks() {
        let logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(None, logger);
        tokenizer.write("<!");
        assert_eq!(tokenizer.next_token(), TokenFetch::Pending);
        tokenizer.write("-");
        assert_eq!(tokenizer.next_token(), TokenFetch::Pending);
        tokenizer.write("-ok-->");
        tokenizer.end();
        let tokens = collect(&mut tokenizer);
        assert_eq!(
            tokens[0],
            Token::CommentToken {
                value: "ok".to_string()
            }
        );
    }

    #[test]
    fn self_closing_flag() {
        let tokens = tokenize("<br/>");
        assert_eq!(
            tokens[0],
            Token::StartTagToken {
                name: "br".to_string(),
                is_self_closing: true,
                attributes: vec![],
            }
        );
    }

    #[test]
    fn end_tag_with_attributes_dropped() {
        let logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(None, Rc::clone(&logger));
        tokenizer.write("</div class=x>");
        tokenizer.end();
        let tokens = collect(&mut tokenizer);
        assert_eq!(
            tokens[0],
            Token::EndTagToken {
                name: "div".to_string()
            }
        );
        let errors = logger.borrow().get_errors();
        assert!(errors.iter().any(|e| e.message == "end-tag-with-attributes"));
    }
}
