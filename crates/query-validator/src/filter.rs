//! Query filtering: split, validate, rebuild.

use thiserror::Error;

use crate::decode::{all_decodable, is_decodable};

/// Default segment delimiter.
pub const DEFAULT_DELIMITER: &str = "&";

/// Result of filtering a query string with one or more undecodable
/// segments.
///
/// Carries everything a handler needs to correct the request: the
/// delimiter the query was split on and the original, kept and dropped
/// segment lists, all in original order. An invalid query is the expected
/// alternate outcome of [`QueryFilter::check`], reported as data rather
/// than raised.
#[derive(Clone, Debug, Error)]
#[error("invalid query param(s) detected")]
pub struct InvalidQuery {
    /// Delimiter the query was split on.
    pub delimiter: String,
    /// All segments of the original query, in order.
    pub original: Vec<String>,
    /// Segments that decoded cleanly, in original order.
    pub kept: Vec<String>,
    /// Segments dropped because they failed decoding, in original order.
    ///
    /// Segments are classified in place, so a failing segment occurring
    /// several times is reported once per occurrence.
    pub dropped: Vec<String>,
}

impl InvalidQuery {
    /// The corrected query string: kept segments rejoined with the
    /// delimiter. Empty when nothing survived.
    #[must_use]
    pub fn corrected_query(&self) -> String {
        self.kept.join(&self.delimiter)
    }
}

/// Checks that every segment of a raw query string can be
/// percent-decoded.
///
/// The raw query is split on the configured delimiter and each segment is
/// validated whole with [`is_decodable`]; a failing segment is never
/// partially repaired, only dropped. The filter holds no state across
/// calls, the delimiter is fixed at construction.
#[derive(Clone, Debug)]
#[must_use]
pub struct QueryFilter {
    delimiter: String,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl QueryFilter {
    /// Create a new `QueryFilter` splitting on `delimiter`.
    #[inline]
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    /// The delimiter segments are split on.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Check `raw`, returning [`InvalidQuery`] if any segment fails to
    /// decode.
    ///
    /// An empty query is always valid. On failure the kept and dropped
    /// segments are computed positionally: the rebuilt query re-split on
    /// the delimiter is exactly the ordered subsequence of original
    /// segments that decode.
    pub fn check(&self, raw: &str) -> Result<(), InvalidQuery> {
        if raw.is_empty() {
            return Ok(());
        }
        let original: Vec<String> = raw.split(self.delimiter.as_str()).map(Into::into).collect();
        if all_decodable(original.iter().map(String::as_str)) {
            return Ok(());
        }
        let (kept, dropped) = original
            .iter()
            .cloned()
            .partition(|segment: &String| is_decodable(segment));
        Err(InvalidQuery {
            delimiter: self.delimiter.clone(),
            original,
            kept,
            dropped,
        })
    }
}
