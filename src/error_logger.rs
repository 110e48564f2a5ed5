use crate::stream::Position;

// Possible parser errors enumerated
pub enum ParserError {
    AbruptClosingOfEmptyComment,
    AbsenceOfDigitsInNumericCharacterReference,
    CdataInHtmlContent,
    CharacterReferenceOutsideUnicodeRange,
    ControlCharacterReference,
    DuplicateAttribute,
    EndTagWithAttributes,
    EndTagWithTrailingSolidus,
    EofBeforeTagName,
    EofInComment,
    EofInDoctype,
    EofInTag,
    EofInText,
    IncorrectlyClosedComment,
    IncorrectlyOpenedComment,
    InvalidCharacterSequenceAfterDoctypeName,
    InvalidFirstCharacterOfTagName,
    MissingAttributeValue,
    MissingDoctypeName,
    MissingEndTagName,
    MissingSemicolonAfterCharacterReference,
    MissingWhitespaceBeforeDoctypeName,
    MissingWhitespaceBetweenAttributes,
    NoncharacterCharacterReference,
    NullCharacterReference,
    SurrogateCharacterReference,
    UnexpectedCharacterInAttributeName,
    UnexpectedCharacterInUnquotedAttributeValue,
    UnexpectedEqualsSignBeforeAttributeName,
    UnexpectedNullCharacter,
    UnexpectedQuestionMarkInsteadOfTagName,
    UnexpectedSolidusInTag,
    UnknownNamedCharacterReference,

    ExpectedDocTypeButGotChars,
    ExpectedDocTypeButGotStartTag,
    ExpectedDocTypeButGotEndTag,
}

// Parser errors as string representation
impl ParserError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserError::AbruptClosingOfEmptyComment => "abrupt-closing-of-empty-comment",
            ParserError::AbsenceOfDigitsInNumericCharacterReference => {
                "absence-of-digits-in-numeric-character-reference"
            }
            ParserError::CdataInHtmlContent => "cdata-in-html-content",
            ParserError::CharacterReferenceOutsideUnicodeRange => {
                "character-reference-outside-unicode-range"
            }
            ParserError::ControlCharacterReference => "control-character-reference",
            ParserError::DuplicateAttribute => "duplicate-attribute",
            ParserError::EndTagWithAttributes => "end-tag-with-attributes",
            ParserError::EndTagWithTrailingSolidus => "end-tag-with-trailing-solidus",
            ParserError::EofBeforeTagName => "eof-before-tag-name",
            ParserError::EofInComment => "eof-in-comment",
            ParserError::EofInDoctype => "eof-in-doctype",
            ParserError::EofInTag => "eof-in-tag",
            ParserError::EofInText => "eof-in-text",
            ParserError::IncorrectlyClosedComment => "incorrectly-closed-comment",
            ParserError::IncorrectlyOpenedComment => "incorrectly-opened-comment",
            ParserError::InvalidCharacterSequenceAfterDoctypeName => {
                "invalid-character-sequence-after-doctype-name"
            }
            ParserError::InvalidFirstCharacterOfTagName => "invalid-first-character-of-tag-name",
            ParserError::MissingAttributeValue => "missing-attribute-value",
            ParserError::MissingDoctypeName => "missing-doctype-name",
            ParserError::MissingEndTagName => "missing-end-tag-name",
            ParserError::MissingSemicolonAfterCharacterReference => {
                "missing-semicolon-after-character-reference"
            }
            ParserError::MissingWhitespaceBeforeDoctypeName => {
                "missing-whitespace-before-doctype-name"
            }
            ParserError::MissingWhitespaceBetweenAttributes => {
                "missing-whitespace-between-attributes"
            }
            ParserError::NoncharacterCharacterReference => "noncharacter-character-reference",
            ParserError::NullCharacterReference => "null-character-reference",
            ParserError::SurrogateCharacterReference => "surrogate-character-reference",
            ParserError::UnexpectedCharacterInAttributeName => {
                "unexpected-character-in-attribute-name"
            }
            ParserError::UnexpectedCharacterInUnquotedAttributeValue => {
                "unexpected-character-in-unquoted-attribute-value"
            }
            ParserError::UnexpectedEqualsSignBeforeAttributeName => {
                "unexpected-equals-sign-before-attribute-name"
            }
            ParserError::UnexpectedNullCharacter => "unexpected-null-character",
            ParserError::UnexpectedQuestionMarkInsteadOfTagName => {
                "unexpected-question-mark-instead-of-tag-name"
            }
            ParserError::UnexpectedSolidusInTag => "unexpected-solidus-in-tag",
            ParserError::UnknownNamedCharacterReference => "unknown-named-character-reference",

            ParserError::ExpectedDocTypeButGotChars => "expected-doctype-but-got-chars",
            ParserError::ExpectedDocTypeButGotStartTag => "expected-doctype-but-got-start-tag",
            ParserError::ExpectedDocTypeButGotEndTag => "expected-doctype-but-got-end-tag",
        }
    }
}

// Parse error that defines an error (message) on the given position
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String, // Parse message
    pub line: usize,     // Line number of the error
    pub col: usize,      // Offset on the line of the error
    pub offset: usize,   // Position of the error in the stream
}

#[derive(Clone, Default)]
pub struct ErrorLogger {
    errors: Vec<ParseError>, // List of errors that occurred during parsing
}

impl ErrorLogger {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    // Returns a cloned instance of the errors
    pub fn get_errors(&self) -> Vec<ParseError> {
        self.errors.clone()
    }

    // Adds a new error to the error logger
    pub fn add_error(&mut self, pos: Position, message: &str) {
        // Check if the error already exists, if so, don't add it again
        for err in &self.errors {
            if err.line == pos.line && err.col == pos.col && err.message == *message {
                return;
            }
        }

        self.errors.push(ParseError {
            line: pos.line,
            col: pos.col,
            offset: pos.offset,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_suppression() {
        let mut logger = ErrorLogger::new();

        logger.add_error(Position::new(1, 1, 0), "test");
        logger.add_error(Position::new(1, 1, 0), "test");
        logger.add_error(Position::new(1, 1, 0), "test");

        assert_eq!(logger.get_errors().len(), 1);
    }

    #[test]
    fn test_distinct_positions() {
        let mut logger = ErrorLogger::new();

        logger.add_error(Position::new(1, 1, 0), "test");
        logger.add_error(Position::new(1, 2, 1), "test");
        logger.add_error(Position::new(2, 1, 2), "test");
        logger.add_error(Position::new(2, 1, 2), "test");

        assert_eq!(logger.get_errors().len(), 3);
    }

    #[test]
    fn test_distinct_messages() {
        let mut logger = ErrorLogger::new();

        logger.add_error(Position::new(1, 1, 0), "unexpected-null-character");
        logger.add_error(Position::new(1, 1, 0), "eof-in-tag");

        assert_eq!(logger.get_errors().len(), 2);
    }
}
