use std::fmt;

/// The different token types that can be emitted by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    DocTypeToken,
    StartTagToken,
    EndTagToken,
    CommentToken,
    TextToken,
    EofToken,
}

/// Tokens produced by the tokenizer and consumed by the tree builder.
/// Attributes keep their insertion order; duplicates are dropped at emit
/// time with the first occurrence winning.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    DocTypeToken {
        name: Option<String>,
        force_quirks: bool,
    },
    StartTagToken {
        name: String,
        is_self_closing: bool,
        attributes: Vec<(String, String)>,
    },
    EndTagToken {
        name: String,
    },
    CommentToken {
        value: String,
    },
    TextToken {
        value: String,
    },
    EofToken,
}

impl Token {
    pub fn type_of(&self) -> TokenType {
        match self {
            Token::DocTypeToken { .. } => TokenType::DocTypeToken,
            Token::StartTagToken { .. } => TokenType::StartTagToken,
            Token::EndTagToken { .. } => TokenType::EndTagToken,
            Token::CommentToken { .. } => TokenType::CommentToken,
            Token::TextToken { .. } => TokenType::TextToken,
            Token::EofToken => TokenType::EofToken,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Token::EofToken)
    }

    pub fn is_start_tag(&self, tag: &str) -> bool {
        matches!(self, Token::StartTagToken { name, .. } if name == tag)
    }

    pub fn is_any_start_tag(&self, tags: &[&str]) -> bool {
        matches!(self, Token::StartTagToken { name, .. } if tags.contains(&name.as_str()))
    }

    pub fn is_end_tag(&self, tag: &str) -> bool {
        matches!(self, Token::EndTagToken { name } if name == tag)
    }

    pub fn is_any_end_tag(&self, tags: &[&str]) -> bool {
        matches!(self, Token::EndTagToken { name } if tags.contains(&name.as_str()))
    }

    /// Returns true when this is a text token consisting solely of HTML
    /// whitespace characters
    pub fn is_whitespace_text(&self) -> bool {
        match self {
            Token::TextToken { value } => {
                !value.is_empty()
                    && value
                        .chars()
                        .all(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
            }
            _ => false,
        }
    }

    pub fn is_null_text(&self) -> bool {
        matches!(self, Token::TextToken { value } if value.chars().all(|c| c == '\0') && !value.is_empty())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::DocTypeToken { name, .. } => {
                write!(f, "<!DOCTYPE {}>", name.as_deref().unwrap_or(""))
            }
            Token::StartTagToken {
                name,
                is_self_closing,
                attributes,
            } => {
                write!(f, "<{}", name)?;
                for (key, value) in attributes {
                    write!(f, " {}=\"{}\"", key, value)?;
                }
                if *is_self_closing {
                    write!(f, " /")?;
                }
                write!(f, ">")
            }
            Token::EndTagToken { name } => write!(f, "</{}>", name),
            Token::CommentToken { value } => write!(f, "<!--{}-->", value),
            Token::TextToken { value } => write!(f, "{}", value),
            Token::EofToken => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display() {
        let token = Token::StartTagToken {
            name: "div".to_string(),
            is_self_closing: false,
            attributes: vec![("class".to_string(), "x".to_string())],
        };
        assert_eq!(format!("{}", token), "<div class=\"x\">");

        let token = Token::EndTagToken {
            name: "div".to_string(),
        };
        assert_eq!(format!("{}", token), "</div>");

        let token = Token::CommentToken {
            value: " hello ".to_string(),
        };
        assert_eq!(format!("{}", token), "<!-- hello -->");
    }

    #[test]
    fn test_whitespace_text() {
        let token = Token::TextToken {
            value: " \t\n".to_string(),
        };
        assert!(token.is_whitespace_text());

        let token = Token::TextToken {
            value: " x ".to_string(),
        };
        assert!(!token.is_whitespace_text());
    }

    #[test]
    fn test_tag_matching() {
        let token = Token::StartTagToken {
            name: "td".to_string(),
            is_self_closing: false,
            attributes: vec![],
        };
        assert!(token.is_start_tag("td"));
        assert!(token.is_any_start_tag(&["td", "th"]));
        assert!(!token.is_end_tag("td"));
    }
}
