use std::fmt;

/// Position of the reader inside the stream, used for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, col: usize, offset: usize) -> Self {
        Self { line, col, offset }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A single element read from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Utf8(char),
    Eof,
}

/// Result of a read on a stream that might still be growing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadChar {
    Ch(char),
    /// The stream has ended and the cursor is past the last character
    Eof,
    /// No character available yet; more input may arrive through write()
    Pending,
}

/// Append-only character buffer fed in chunks. The cursor never moves back
/// more than one character (reconsume), so consumed chunks could in theory
/// be dropped; we keep them since documents are small.
pub struct ChunkedStream {
    buffer: Vec<char>,
    cursor: usize,
    ended: bool,
    position: Position,
    // position before the most recent read, for a single-level unread()
    last_position: Position,
    // whether the most recent read_char() actually consumed a character;
    // unread() after an Eof or Pending read must be a no-op
    advanced: bool,
    // a chunk ended in CR; a LF at the start of the next chunk is dropped
    pending_cr: bool,
}

impl Default for ChunkedStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedStream {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            ended: false,
            position: Position::default(),
            last_position: Position::default(),
            advanced: false,
            pending_cr: false,
        }
    }

    /// Appends a chunk to the buffer, normalizing CRLF and lone CR to LF.
    /// May be called any number of times before end().
    pub fn write(&mut self, chunk: &str) {
        for c in chunk.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                if c == '\n' {
                    continue;
                }
            }
            if c == '\r' {
                self.pending_cr = true;
                self.buffer.push('\n');
            } else {
                self.buffer.push(c);
            }
        }
    }

    /// Marks the stream as complete. Reads past the last character return
    /// Eof instead of Pending from here on.
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Reads the next character and advances the cursor
    pub fn read_char(&mut self) -> ReadChar {
        if self.cursor >= self.buffer.len() {
            self.advanced = false;
            return if self.ended {
                ReadChar::Eof
            } else {
                ReadChar::Pending
            };
        }

        let c = self.buffer[self.cursor];
        self.cursor += 1;
        self.advanced = true;

        self.last_position = self.position;
        self.position.offset += 1;
        if c == '\n' {
            self.position.line += 1;
            self.position.col = 1;
        } else {
            self.position.col += 1;
        }

        ReadChar::Ch(c)
    }

    /// Moves the cursor back one character. Only a single level of pushback
    /// is supported; the position restore relies on it.
    pub fn unread(&mut self) {
        if self.advanced && self.cursor > 0 {
            self.cursor -= 1;
            self.position = self.last_position;
            self.advanced = false;
        }
    }

    /// Peeks at the character `offset` positions ahead of the cursor without
    /// consuming anything
    pub fn look_ahead(&self, offset: usize) -> Option<char> {
        self.buffer.get(self.cursor + offset).copied()
    }

    /// Case-aware keyword match at the cursor. Returns None when the buffer
    /// does not hold enough characters to decide and the stream has not
    /// ended yet. `keyword` must be lowercase when `insensitive` is set.
    pub fn matches(&self, keyword: &str, insensitive: bool) -> Option<bool> {
        for (i, kc) in keyword.chars().enumerate() {
            match self.buffer.get(self.cursor + i) {
                Some(&c) => {
                    let c = if insensitive { c.to_ascii_lowercase() } else { c };
                    if c != kc {
                        return Some(false);
                    }
                }
                None => {
                    return if self.ended { Some(false) } else { None };
                }
            }
        }
        Some(true)
    }

    /// Consumes `n` characters, keeping the position bookkeeping intact
    pub fn skip(&mut self, n: usize) {
        for _ in 0..n {
            if let ReadChar::Pending | ReadChar::Eof = self.read_char() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_across_chunks() {
        let mut stream = ChunkedStream::new();
        assert_eq!(stream.read_char(), ReadChar::Pending);

        stream.write("ab");
        assert_eq!(stream.read_char(), ReadChar::Ch('a'));
        assert_eq!(stream.read_char(), ReadChar::Ch('b'));
        assert_eq!(stream.read_char(), ReadChar::Pending);

        stream.write("c");
        assert_eq!(stream.read_char(), ReadChar::Ch('c'));

        stream.end();
        assert_eq!(stream.read_char(), ReadChar::Eof);
        assert_eq!(stream.read_char(), ReadChar::Eof);
    }

    #[test]
    fn unread_restores_position() {
        let mut stream = ChunkedStream::new();
        stream.write("a\nb");
        stream.end();

        assert_eq!(stream.read_char(), ReadChar::Ch('a'));
        assert_eq!(stream.read_char(), ReadChar::Ch('\n'));
        let after_newline = stream.position();
        assert_eq!(after_newline.line, 2);

        assert_eq!(stream.read_char(), ReadChar::Ch('b'));
        stream.unread();
        assert_eq!(stream.position(), after_newline);
        assert_eq!(stream.read_char(), ReadChar::Ch('b'));
    }

    #[test]
    fn unread_after_eof_is_noop() {
        let mut stream = ChunkedStream::new();
        stream.write("a");
        stream.end();

        assert_eq!(stream.read_char(), ReadChar::Ch('a'));
        assert_eq!(stream.read_char(), ReadChar::Eof);
        stream.unread();
        assert_eq!(stream.read_char(), ReadChar::Eof);
    }

    #[test]
    fn keyword_matching() {
        let mut stream = ChunkedStream::new();
        stream.write("!DOC");

        assert_eq!(stream.matches("!d", true), Some(true));
        assert_eq!(stream.matches("!doctype", true), None);
        assert_eq!(stream.matches("--", false), Some(false));

        stream.write("TYPE html");
        assert_eq!(stream.matches("!doctype", true), Some(true));

        stream.end();
        assert_eq!(stream.matches("!doctype html x", true), Some(false));
    }

    #[test]
    fn newline_normalization_across_chunks() {
        let mut stream = ChunkedStream::new();
        stream.write("a\r");
        stream.write("\nb\rc\r\nd");
        stream.end();

        let mut out = String::new();
        while let ReadChar::Ch(c) = stream.read_char() {
            out.push(c);
        }
        assert_eq!(out, "a\nb\nc\nd");
    }

    #[test]
    fn utf8_characters() {
        let mut stream = ChunkedStream::new();
        stream.write("f👽f");
        stream.end();
        assert_eq!(stream.read_char(), ReadChar::Ch('f'));
        assert_eq!(stream.read_char(), ReadChar::Ch('👽'));
        assert_eq!(stream.read_char(), ReadChar::Ch('f'));
        assert_eq!(stream.read_char(), ReadChar::Eof);
    }
}
