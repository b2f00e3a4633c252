//! Date-range lookups over the metadata index.

use crate::{
    context::RequestContext,
    errors::{InboxError, InboxResult},
    models::file_record::FileRecord,
    services::metadata_index::MetadataIndex,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::{Instrument, debug};

/// Bound format accepted from clients besides RFC 3339, e.g. `2024-03-07_13:45:00`.
pub const BOUND_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";
pub const DEFAULT_LIMIT: u32 = 5;
pub const MAX_LIMIT: u32 = 1000;

#[derive(Clone)]
pub struct QueryService {
    index: Arc<dyn MetadataIndex>,
}

impl QueryService {
    pub fn new(index: Arc<dyn MetadataIndex>) -> Self {
        Self { index }
    }

    /// Records registered between `lower` and `upper` (inclusive).
    ///
    /// An empty result is reported as `NoMatchingRecords`, which is also what a
    /// `limit` of 0 produces. The bounds are validated before the index is touched.
    pub async fn by_date_range(
        &self,
        ctx: &RequestContext,
        lower: &str,
        upper: &str,
        limit: u32,
    ) -> InboxResult<Vec<FileRecord>> {
        let lower = parse_bound(lower)?;
        let upper = parse_bound(upper)?;
        if lower > upper {
            return Err(InboxError::InvalidRange(format!(
                "lower bound {} is after upper bound {}",
                lower, upper
            )));
        }
        let limit = limit.min(MAX_LIMIT);

        async {
            let records = self.index.range_query(lower, upper, limit).await?;
            debug!(
                "{} records between {} and {} (limit {})",
                records.len(),
                lower,
                upper,
                limit
            );
            if records.is_empty() {
                return Err(InboxError::NoMatchingRecords);
            }
            Ok(records)
        }
        .instrument(ctx.span().clone())
        .await
    }
}

/// Parse a bound given as RFC 3339 or as `YYYY-MM-DD_HH:MM:SS` (read as UTC).
pub fn parse_bound(raw: &str) -> InboxResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, BOUND_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| InboxError::InvalidRange(format!("cannot parse `{}`: {}", raw, err)))
}
