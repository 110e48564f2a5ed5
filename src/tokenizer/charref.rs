use crate::error_logger::ParserError;
use crate::stream::Element;
use crate::tokenizer::entities::{cp1252_remap, ENTITIES, LONGEST_ENTITY_LENGTH};
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;
use crate::tokenizer::{Progress, Tokenizer, CHAR_REPLACEMENT};

impl Tokenizer {
    /// Character reference state. The temporary buffer was primed with "&"
    /// by the caller.
    pub(crate) fn step_character_reference(&mut self) -> Progress {
        match read_char!(self) {
            Element::Utf8(c) if c.is_ascii_alphanumeric() => {
                self.stream.unread();
                self.state = State::NamedCharacterReferenceState;
            }
            Element::Utf8('#') => {
                self.temporary_buffer.push('#');
                self.state = State::NumericCharacterReferenceState;
            }
            Element::Utf8(_) => {
                self.stream.unread();
                self.flush_temporary_buffer();
                self.state = self.return_state;
            }
            Element::Eof => {
                self.flush_temporary_buffer();
                self.state = self.return_state;
            }
        }
        Progress::Continue
    }

    /// Accumulates the reference name, then resolves it. The accumulated
    /// characters survive a chunk-boundary suspension in the temporary
    /// buffer, so "&am" + "p;" resolves the same as "&amp;".
    pub(crate) fn step_named_character_reference(&mut self) -> Progress {
        loop {
            match read_char!(self) {
                Element::Utf8(c) if c.is_ascii_alphanumeric() => {
                    self.temporary_buffer.push(c);
                }
                Element::Utf8(';') => {
                    self.resolve_named_reference(true);
                    self.state = self.return_state;
                    return Progress::Continue;
                }
                Element::Utf8(_) => {
                    self.stream.unread();
                    self.resolve_named_reference(false);
                    self.state = self.return_state;
                    return Progress::Continue;
                }
                Element::Eof => {
                    self.resolve_named_reference(false);
                    self.state = self.return_state;
                    return Progress::Continue;
                }
            }
        }
    }

    pub(crate) fn step_numeric_character_reference(&mut self) -> Progress {
        self.char_ref_code = 0;
        match read_char!(self) {
            Element::Utf8(c @ ('x' | 'X')) => {
                self.temporary_buffer.push(c);
                self.state = State::HexadecimalCharacterReferenceStartState;
            }
            _ => {
                self.stream.unread();
                self.state = State::DecimalCharacterReferenceStartState;
            }
        }
        Progress::Continue
    }

    pub(crate) fn step_hexadecimal_start(&mut self) -> Progress {
        match read_char!(self) {
            Element::Utf8(c) if c.is_ascii_hexdigit() => {
                self.stream.unread();
                self.state = State::HexadecimalCharacterReferenceState;
            }
            _ => {
                self.parse_error(ParserError::AbsenceOfDigitsInNumericCharacterReference);
                self.stream.unread();
                self.flush_temporary_buffer();
                self.state = self.return_state;
            }
        }
        Progress::Continue
    }

    pub(crate) fn step_decimal_start(&mut self) -> Progress {
        match read_char!(self) {
            Element::Utf8(c) if c.is_ascii_digit() => {
                self.stream.unread();
                self.state = State::DecimalCharacterReferenceState;
            }
            _ => {
                self.parse_error(ParserError::AbsenceOfDigitsInNumericCharacterReference);
                self.stream.unread();
                self.flush_temporary_buffer();
                self.state = self.return_state;
            }
        }
        Progress::Continue
    }

    pub(crate) fn step_hexadecimal(&mut self) -> Progress {
        match read_char!(self) {
            Element::Utf8(c) if c.is_ascii_hexdigit() => {
                let digit = c.to_digit(16).unwrap_or(0);
                self.char_ref_code = self.char_ref_code.saturating_mul(16).saturating_add(digit);
            }
            Element::Utf8(';') => self.state = State::NumericCharacterReferenceEndState,
            _ => {
                self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                self.stream.unread();
                self.state = State::NumericCharacterReferenceEndState;
            }
        }
        Progress::Continue
    }

    pub(crate) fn step_decimal(&mut self) -> Progress {
        match read_char!(self) {
            Element::Utf8(c) if c.is_ascii_digit() => {
                let digit = c.to_digit(10).unwrap_or(0);
                self.char_ref_code = self.char_ref_code.saturating_mul(10).saturating_add(digit);
            }
            Element::Utf8(';') => self.state = State::NumericCharacterReferenceEndState,
            _ => {
                self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                self.stream.unread();
                self.state = State::NumericCharacterReferenceEndState;
            }
        }
        Progress::Continue
    }

    /// Validates and clamps the accumulated code point, then flushes it
    pub(crate) fn step_numeric_end(&mut self) -> Progress {
        let mut code = self.char_ref_code;

        if code == 0 {
            self.parse_error(ParserError::NullCharacterReference);
            code = CHAR_REPLACEMENT as u32;
        } else if code > 0x10FFFF {
            self.parse_error(ParserError::CharacterReferenceOutsideUnicodeRange);
            code = CHAR_REPLACEMENT as u32;
        } else if (0xD800..=0xDFFF).contains(&code) {
            self.parse_error(ParserError::SurrogateCharacterReference);
            code = CHAR_REPLACEMENT as u32;
        } else if is_noncharacter(code) {
            self.parse_error(ParserError::NoncharacterCharacterReference);
        } else if code == 0x0D || (is_control(code) && !is_ascii_whitespace(code)) {
            self.parse_error(ParserError::ControlCharacterReference);
            code = cp1252_remap(code);
        }

        self.temporary_buffer.clear();
        self.temporary_buffer
            .push(char::from_u32(code).unwrap_or(CHAR_REPLACEMENT));
        self.flush_temporary_buffer();
        self.state = self.return_state;
        Progress::Continue
    }

    /// Resolves the accumulated name against the entity table. Exact match
    /// first when semicolon-terminated, then the longest legacy prefix.
    fn resolve_named_reference(&mut self, semicolon: bool) {
        // strip the leading '&'
        let name = self.temporary_buffer[1..].to_string();

        if semicolon {
            let key = format!("{};", name);
            if let Some(expansion) = ENTITIES.get(key.as_str()) {
                self.temporary_buffer.clear();
                self.flush_text(expansion);
                return;
            }
        }

        let max = name.len().min(*LONGEST_ENTITY_LENGTH);
        let mut matched: Option<(usize, &str)> = None;
        for len in (1..=max).rev() {
            // entity names are ASCII, so byte slicing is safe here
            if let Some(expansion) = ENTITIES.get(&name[..len]) {
                matched = Some((len, expansion));
                break;
            }
        }

        match matched {
            Some((len, expansion)) => {
                // historical attribute rule: a bare reference directly
                // followed by '=' or an alphanumeric stays literal
                let next = if len < name.len() {
                    name[len..].chars().next()
                } else if semicolon {
                    Some(';')
                } else {
                    self.stream.look_ahead(0)
                };
                let in_attribute = self.char_ref_in_attribute();
                let abandoned = in_attribute
                    && matches!(next, Some(c) if c == '=' || c.is_ascii_alphanumeric());

                if abandoned {
                    let mut literal = std::mem::take(&mut self.temporary_buffer);
                    if semicolon {
                        literal.push(';');
                    }
                    self.flush_text(&literal);
                } else {
                    self.parse_error(ParserError::MissingSemicolonAfterCharacterReference);
                    let remainder = {
                        let mut r = name[len..].to_string();
                        if semicolon {
                            r.push(';');
                        }
                        r
                    };
                    self.temporary_buffer.clear();
                    self.flush_text(&expansion.to_string());
                    self.flush_text(&remainder);
                }
            }
            None => {
                if semicolon {
                    self.parse_error(ParserError::UnknownNamedCharacterReference);
                }
                let mut literal = std::mem::take(&mut self.temporary_buffer);
                if semicolon {
                    literal.push(';');
                }
                self.flush_text(&literal);
            }
        }
    }

    /// True when the in-flight character reference is part of an attribute
    /// value
    fn char_ref_in_attribute(&self) -> bool {
        matches!(
            self.return_state,
            State::AttributeValueDoubleQuotedState
                | State::AttributeValueSingleQuotedState
                | State::AttributeValueUnquotedState
        )
    }

    /// Flushes the code points consumed so far: into the attribute value
    /// under construction, or as character tokens
    fn flush_temporary_buffer(&mut self) {
        let buffer = std::mem::take(&mut self.temporary_buffer);
        self.flush_text(&buffer);
    }

    fn flush_text(&mut self, s: &str) {
        if self.char_ref_in_attribute() {
            self.current_attr_value.push_str(s);
        } else {
            for c in s.chars() {
                self.token_queue.push_back(Token::TextToken {
                    value: c.to_string(),
                });
            }
        }
    }
}

fn is_noncharacter(code: u32) -> bool {
    (0xFDD0..=0xFDEF).contains(&code) || matches!(code & 0xFFFF, 0xFFFE | 0xFFFF)
}

fn is_control(code: u32) -> bool {
    code <= 0x1F || (0x7F..=0x9F).contains(&code)
}

fn is_ascii_whitespace(code: u32) -> bool {
    matches!(code, 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}
