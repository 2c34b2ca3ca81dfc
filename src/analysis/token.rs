//! Token types flowing through the analysis pipeline.
//!
//! # Examples
//!
//! ```
//! use glaive::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.start_offset, 6);
//! assert_eq!(token.end_offset, 11);
//! ```

use serde::{Deserialize, Serialize};

/// A single unit of text after tokenization.
///
/// Offsets are byte offsets into the text that was analyzed, so a token can
/// always be located again for highlighting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The (possibly normalized) token text.
    pub text: String,

    /// Position in the token stream (0-based).
    pub position: usize,

    /// Byte offset of the first character in the source text.
    pub start_offset: usize,

    /// Byte offset one past the last character in the source text.
    pub end_offset: usize,
}

impl Token {
    /// Create a token without source offsets.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
        }
    }

    /// Create a token located at `start_offset..end_offset` in the source.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }

    /// Return a copy of this token carrying different text.
    pub fn with_text<S: Into<String>>(&self, text: S) -> Self {
        Token {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Length of the token text in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the token text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A stream of tokens produced by a tokenizer or filter.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("hello", 0);
        assert_eq!(token.text, "hello");
        assert_eq!(token.position, 0);
        assert_eq!(token.end_offset, 5);
        assert_eq!(token.len(), 5);
        assert!(!token.is_empty());
    }

    #[test]
    fn test_with_text_keeps_offsets() {
        let token = Token::with_offsets("Hello", 3, 10, 15);
        let lowered = token.with_text("hello");
        assert_eq!(lowered.text, "hello");
        assert_eq!(lowered.position, 3);
        assert_eq!(lowered.start_offset, 10);
        assert_eq!(lowered.end_offset, 15);
    }
}
