//! The query tree.

use std::fmt;

use ahash::AHashSet;

use crate::index::term::Term;

/// How a clause takes part in a boolean query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match.
    Must,
    /// The clause may match; at least one should-clause must match when a
    /// query has no must-clause.
    Should,
}

/// A query matching documents that contain a term.
#[derive(Clone, Debug, PartialEq)]
pub struct TermQuery {
    term: Term,
    boost: f32,
}

impl TermQuery {
    /// Match `term`.
    pub fn new(term: Term) -> Self {
        TermQuery { term, boost: 1.0 }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The term.
    pub fn term(&self) -> &Term {
        &self.term
    }

    /// The boost factor.
    pub fn boost(&self) -> f32 {
        self.boost
    }
}

/// One clause of a boolean query.
#[derive(Clone, Debug, PartialEq)]
pub struct BooleanClause {
    pub occur: Occur,
    pub query: Query,
}

/// A combination of clauses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
}

impl BooleanQuery {
    /// An empty boolean query, which matches nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required clause.
    pub fn must(mut self, query: Query) -> Self {
        self.clauses.push(BooleanClause {
            occur: Occur::Must,
            query,
        });
        self
    }

    /// Add an optional clause.
    pub fn should(mut self, query: Query) -> Self {
        self.clauses.push(BooleanClause {
            occur: Occur::Should,
            query,
        });
        self
    }

    /// The clauses.
    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether there are no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// A query tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    Term(TermQuery),
    Boolean(BooleanQuery),
    /// Matches no document.
    MatchNone,
}

impl Query {
    /// A term query on an analyzed field.
    pub fn term<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Query::Term(TermQuery::new(Term::new(field, text)))
    }

    /// An exact-match query on the keyword form of `field`.
    pub fn keyword<T: Into<String>>(field: &str, value: T) -> Self {
        Query::Term(TermQuery::new(Term::keyword(field, value)))
    }

    /// Every term query in the tree.
    pub fn term_queries(&self) -> Vec<&TermQuery> {
        let mut found = Vec::new();
        self.collect_term_queries(&mut found);
        found
    }

    fn collect_term_queries<'a>(&'a self, found: &mut Vec<&'a TermQuery>) {
        match self {
            Query::Term(query) => found.push(query),
            Query::Boolean(query) => {
                for clause in query.clauses() {
                    clause.query.collect_term_queries(found);
                }
            }
            Query::MatchNone => {}
        }
    }

    /// Texts of the terms this query looks for in `field`.
    pub fn field_terms(&self, field: &str) -> AHashSet<String> {
        self.term_queries()
            .into_iter()
            .filter(|query| query.term().field() == field)
            .map(|query| query.term().text().to_string())
            .collect()
    }
}

impl From<TermQuery> for Query {
    fn from(query: TermQuery) -> Self {
        Query::Term(query)
    }
}

impl From<BooleanQuery> for Query {
    fn from(query: BooleanQuery) -> Self {
        Query::Boolean(query)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term(query) => write!(f, "{}", query.term()),
            Query::Boolean(query) => {
                write!(f, "(")?;
                for (i, clause) in query.clauses().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    if clause.occur == Occur::Must {
                        write!(f, "+")?;
                    }
                    write!(f, "{}", clause.query)?;
                }
                write!(f, ")")
            }
            Query::MatchNone => write!(f, "<none>"),
        }
    }
}
