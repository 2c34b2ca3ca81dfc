//! Query evaluation over a snapshot.

use ahash::AHashMap;
use log::debug;

use crate::error::{GlaiveError, Result};
use crate::index::reader::{DocAddress, IndexSnapshot, SegmentReader};
use crate::index::term::Term;
use crate::search::collector::{ScoredDoc, TopDocsCollector};
use crate::search::query::{BooleanQuery, Occur, Query, TermQuery};
use crate::search::scoring::Bm25;

/// Ranked results of one search.
#[derive(Debug, Clone, Default)]
pub struct TopDocs {
    /// Number of matching documents, beyond the ones returned.
    pub total_hits: u64,
    /// The best documents, in non-increasing score order.
    pub docs: Vec<ScoredDoc>,
}

/// Snapshot-wide statistics of one term.
#[derive(Clone, Copy, Debug)]
struct TermWeight {
    idf: f32,
    avg_field_length: f32,
}

type DocScores = AHashMap<u32, f32>;

/// Evaluates queries against one snapshot.
#[derive(Debug)]
pub struct Searcher<'a> {
    snapshot: &'a IndexSnapshot,
    bm25: Bm25,
}

impl<'a> Searcher<'a> {
    /// Search `snapshot` with default BM25 parameters.
    pub fn new(snapshot: &'a IndexSnapshot) -> Self {
        Self::with_bm25(snapshot, Bm25::default())
    }

    /// Search `snapshot` with the given BM25 parameters.
    pub fn with_bm25(snapshot: &'a IndexSnapshot, bm25: Bm25) -> Self {
        Searcher { snapshot, bm25 }
    }

    /// The searched snapshot.
    pub fn snapshot(&self) -> &IndexSnapshot {
        self.snapshot
    }

    /// Return the `limit` best documents matching `query`.
    pub fn search(&self, query: &Query, limit: usize) -> Result<TopDocs> {
        if limit == 0 {
            return Err(GlaiveError::validation("Result limit must be positive"));
        }

        let weights = self.term_weights(query);
        let mut collector = TopDocsCollector::new(limit);
        for (segment, reader) in self.snapshot.segments().iter().enumerate() {
            let scores = self.evaluate(query, reader, &weights);
            for (doc, score) in scores {
                collector.collect(DocAddress { segment, doc }, score);
            }
        }

        let total_hits = collector.total_hits();
        let docs = collector.into_sorted();
        debug!(
            "Query {query} matched {total_hits} documents, returning {}",
            docs.len()
        );
        Ok(TopDocs { total_hits, docs })
    }

    /// Number of documents matching `query`.
    pub fn count(&self, query: &Query) -> u64 {
        let weights = self.term_weights(query);
        self.snapshot
            .segments()
            .iter()
            .map(|reader| self.evaluate(query, reader, &weights).len() as u64)
            .sum()
    }

    fn term_weights(&self, query: &Query) -> AHashMap<Term, TermWeight> {
        let doc_count = self.snapshot.num_docs();
        let mut weights = AHashMap::new();
        for term_query in query.term_queries() {
            let term = term_query.term();
            if weights.contains_key(term) {
                continue;
            }
            let doc_freq = self.snapshot.doc_freq(term);
            let stats = self.snapshot.field_stats(term.field());
            weights.insert(
                term.clone(),
                TermWeight {
                    idf: self.bm25.idf(doc_freq, doc_count),
                    avg_field_length: stats.average_length(),
                },
            );
        }
        weights
    }

    fn evaluate(
        &self,
        query: &Query,
        reader: &SegmentReader,
        weights: &AHashMap<Term, TermWeight>,
    ) -> DocScores {
        match query {
            Query::Term(term_query) => self.evaluate_term(term_query, reader, weights),
            Query::Boolean(boolean) => self.evaluate_boolean(boolean, reader, weights),
            Query::MatchNone => DocScores::new(),
        }
    }

    fn evaluate_term(
        &self,
        query: &TermQuery,
        reader: &SegmentReader,
        weights: &AHashMap<Term, TermWeight>,
    ) -> DocScores {
        let term = query.term();
        let (Some(postings), Some(weight)) = (reader.segment().postings(term), weights.get(term))
        else {
            return DocScores::new();
        };

        postings
            .iter()
            .filter(|&(doc, _)| reader.is_live(doc))
            .map(|(doc, freq)| {
                let length = reader.segment().field_length(term.field(), doc);
                let score = self
                    .bm25
                    .score(weight.idf, freq, length, weight.avg_field_length);
                (doc, score * query.boost())
            })
            .collect()
    }

    fn evaluate_boolean(
        &self,
        query: &BooleanQuery,
        reader: &SegmentReader,
        weights: &AHashMap<Term, TermWeight>,
    ) -> DocScores {
        let mut required: Option<DocScores> = None;
        let mut optional = DocScores::new();

        for clause in query.clauses() {
            let scores = self.evaluate(&clause.query, reader, weights);
            match clause.occur {
                Occur::Must => {
                    required = Some(match required {
                        None => scores,
                        Some(acc) => acc
                            .into_iter()
                            .filter_map(|(doc, score)| {
                                scores.get(&doc).map(|other| (doc, score + other))
                            })
                            .collect(),
                    });
                    if required.as_ref().is_some_and(|acc| acc.is_empty()) {
                        return DocScores::new();
                    }
                }
                Occur::Should => {
                    for (doc, score) in scores {
                        *optional.entry(doc).or_insert(0.0) += score;
                    }
                }
            }
        }

        match required {
            Some(mut acc) => {
                for (doc, score) in acc.iter_mut() {
                    if let Some(extra) = optional.get(doc) {
                        *score += extra;
                    }
                }
                acc
            }
            None => optional,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::document::{ContentRecord, encode};
    use crate::index::segment::SegmentBuilder;

    fn snapshot(records: &[ContentRecord]) -> IndexSnapshot {
        let mut builder = SegmentBuilder::new(Arc::new(StandardAnalyzer::new()));
        for record in records {
            builder.add_document(encode(record)).unwrap();
        }
        let reader = SegmentReader::new(Arc::new(builder.build("seg_1")));
        IndexSnapshot::new(1, vec![reader])
    }

    fn sample() -> IndexSnapshot {
        snapshot(&[
            ContentRecord::new("Quarterly report", "report report report")
                .with_id(1)
                .with_category("finance"),
            ContentRecord::new("Weekly notes", "a short report")
                .with_id(2)
                .with_category("ops"),
            ContentRecord::new("Holiday plan", "beach").with_id(3),
        ])
    }

    #[test]
    fn test_term_query_ranks_by_frequency() {
        let snapshot = sample();
        let searcher = Searcher::new(&snapshot);
        let top = searcher.search(&Query::term("body", "report"), 10).unwrap();

        assert_eq!(top.total_hits, 2);
        assert_eq!(top.docs[0].address.doc, 0);
        assert!(top.docs[0].score > top.docs[1].score);
    }

    #[test]
    fn test_must_intersects() {
        let snapshot = sample();
        let searcher = Searcher::new(&snapshot);
        let query = Query::Boolean(
            BooleanQuery::new()
                .must(Query::term("body", "report"))
                .must(Query::keyword("category", "ops")),
        );

        let top = searcher.search(&query, 10).unwrap();
        assert_eq!(top.docs.len(), 1);
        assert_eq!(top.docs[0].address.doc, 1);
    }

    #[test]
    fn test_should_unions_and_empty_boolean_matches_nothing() {
        let snapshot = sample();
        let searcher = Searcher::new(&snapshot);
        let query = Query::Boolean(
            BooleanQuery::new()
                .should(Query::term("title", "holiday"))
                .should(Query::term("title", "weekly")),
        );

        assert_eq!(searcher.count(&query), 2);
        assert_eq!(searcher.count(&Query::Boolean(BooleanQuery::new())), 0);
        assert_eq!(searcher.count(&Query::MatchNone), 0);
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let snapshot = sample();
        let err = Searcher::new(&snapshot)
            .search(&Query::term("body", "report"), 0)
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
