use std::str::Chars;

pub const EOF_CHAR: char = '\0';

/// Peekable character stream over the source text that keeps track of the
/// byte offset of the next character.
pub struct Cursor<'a> {
    len_remaining: usize,
    source_len: usize,
    chars: Chars<'a>,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            len_remaining: input.len(),
            source_len: input.len(),
            chars: input.chars(),
        }
    }

    /// Peeks the next character without consuming it. Returns `EOF_CHAR` at
    /// the end of the input.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    pub fn second(&self) -> char {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().unwrap_or(EOF_CHAR)
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    /// Byte offset of the next character in the original input.
    pub fn current_pos(&self) -> usize {
        self.source_len - self.chars.as_str().len()
    }

    pub fn len_consumed(&self) -> usize {
        self.len_remaining - self.chars.as_str().len()
    }

    pub fn reset_len_consumed(&mut self) {
        self.len_remaining = self.chars.as_str().len();
    }
}

#[cfg(test)]
mod tests {
    use super::{Cursor, EOF_CHAR};

    #[test]
    fn tracks_byte_positions() {
        let mut cursor = Cursor::new("aé b");

        assert_eq!(cursor.current_pos(), 0);
        cursor.bump();
        assert_eq!(cursor.current_pos(), 1);
        cursor.bump();
        assert_eq!(cursor.current_pos(), 3);
        assert_eq!(cursor.len_consumed(), 3);

        cursor.reset_len_consumed();
        assert_eq!(cursor.first(), ' ');
        assert_eq!(cursor.second(), 'b');
        cursor.bump();
        cursor.bump();
        assert!(cursor.is_eof());
        assert_eq!(cursor.first(), EOF_CHAR);
    }
}
