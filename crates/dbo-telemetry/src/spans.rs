//! Span helpers for crawl passes

use crate::attributes::*;
use tracing::Span;

/// Span covering one collector's work on one database during a pass.
///
/// Outcome fields start empty and are filled by [`record_pass_outcome`].
pub fn crawl_pass_span(collector: &str, database: &str) -> Span {
    tracing::info_span!(
        "crawl_database",
        { DBO_COLLECTOR } = %collector,
        { DBO_DATABASE } = %database,
        { DBO_TABLES_DISCOVERED } = tracing::field::Empty,
        { DBO_TABLES_FAILED } = tracing::field::Empty,
    )
}

/// Record how many tables were discovered and how many definitions failed
pub fn record_pass_outcome(span: &Span, discovered: usize, failed: usize) {
    span.record(DBO_TABLES_DISCOVERED, discovered as u64);
    span.record(DBO_TABLES_FAILED, failed as u64);
}
