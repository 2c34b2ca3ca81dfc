//! Index terms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::keyword_field;

/// A term: a field name paired with the text indexed under it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term {
    field: String,
    text: String,
}

impl Term {
    /// A term in an analyzed field.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }

    /// The exact, verbatim term for `value` in `field`.
    pub fn keyword<T: Into<String>>(field: &str, value: T) -> Self {
        Term {
            field: keyword_field(field),
            text: value.into(),
        }
    }

    /// Field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Term text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_term_uses_keyword_field() {
        let term = Term::keyword("category", "Finance");
        assert_eq!(term.field(), "category.keyword");
        assert_eq!(term.text(), "Finance");
        assert_eq!(term.to_string(), "category.keyword:Finance");
        assert_ne!(term, Term::new("category", "Finance"));
    }

    #[test]
    fn test_ordering_is_field_then_text() {
        let mut terms = vec![
            Term::new("title", "b"),
            Term::new("body", "z"),
            Term::new("title", "a"),
        ];
        terms.sort();
        assert_eq!(terms[0], Term::new("body", "z"));
        assert_eq!(terms[1], Term::new("title", "a"));
    }
}
