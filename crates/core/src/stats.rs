//! Aggregation helpers for the integration statistics endpoint.

use std::collections::BTreeMap;

/// Bucket label for calls that never produced an HTTP response.
pub const TRANSPORT_ERROR_BUCKET: &str = "error";

/// Map an HTTP status code to its class label (`"2xx"`, `"4xx"`, ...).
///
/// `None` (no response at all) maps to [`TRANSPORT_ERROR_BUCKET`]; codes
/// outside 100..=599 are reported as `"other"`.
pub fn status_class(status_code: Option<i32>) -> &'static str {
    match status_code {
        None => TRANSPORT_ERROR_BUCKET,
        Some(100..=199) => "1xx",
        Some(200..=299) => "2xx",
        Some(300..=399) => "3xx",
        Some(400..=499) => "4xx",
        Some(500..=599) => "5xx",
        Some(_) => "other",
    }
}

/// Fold `(status_code, count)` rows into status-class buckets.
///
/// All five standard classes are always present (possibly zero) so clients
/// can render a fixed chart.
pub fn bucket_status_codes<I>(rows: I) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = (Option<i32>, i64)>,
{
    let mut buckets: BTreeMap<String, i64> = ["1xx", "2xx", "3xx", "4xx", "5xx"]
        .into_iter()
        .map(|class| (class.to_string(), 0))
        .collect();

    for (code, count) in rows {
        *buckets.entry(status_class(code).to_string()).or_insert(0) += count;
    }
    buckets
}

/// Fold `(label, count)` rows into a map that lists every known label.
pub fn counts_with_defaults<I>(known: &[&str], rows: I) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut counts: BTreeMap<String, i64> =
        known.iter().map(|label| (label.to_string(), 0)).collect();
    for (label, count) in rows {
        *counts.entry(label).or_insert(0) += count;
    }
    counts
}
