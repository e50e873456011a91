#![allow(missing_docs)]
#![allow(dead_code)]

use futures::executor::block_on;
use jsonrows::{JsonStreamReader, ReaderOptions, chunk_utils::ChunkedReader};

/// A successful view response with a leading row count, two rows and a
/// trailing attribute.
pub const VIEW_SUCCESS: &str = r#"{
    "total_rows": 116,
    "rows": [
        {
            "id": "21st_amendment_brewery_cafe",
            "key": "21st_amendment_brewery_cafe",
            "value": {"name": "21st Amendment Brewery Cafe", "city": "San Francisco"}
        },
        {
            "id": "21st_amendment_brewery_cafe-21a_ipa",
            "key": "21st_amendment_brewery_cafe-21a_ipa",
            "value": {"name": "21A IPA", "abv": 7.2}
        }
    ],
    "took_ms": 5
}"#;

pub const VIEW_EMPTY: &str = r#"{"total_rows": 0, "rows": []}"#;

/// A view error document: no rows at all.
pub const VIEW_NOT_FOUND: &str = r#"{"error": "not_found", "reason": "missing"}"#;

/// A reduced view response: rows carry no document id.
pub const VIEW_REDUCED: &str = r#"{"rows": [{"key": null, "value": 7303}]}"#;

/// A successful query response with metadata on both sides of `results`.
pub const QUERY_SUCCESS: &str = r#"{
    "requestID": "b7a6b094-4699-4edb-b576-9092ab1404cb",
    "clientContextID": "1e6df61d-29ef-4821-9e49-02b3edd06ce5",
    "signature": {"*": "*"},
    "results": [
        {"name": "21A IPA", "abv": 7.2, "updatedUnixMillis": 1302739470000},
        {"name": "563 Stout", "abv": 5.0, "updatedUnixMillis": 1302739470000},
        {"name": "Amendment Pale Ale", "abv": 5.2, "updatedUnixMillis": 1302739470000}
    ],
    "status": "success",
    "metrics": {
        "elapsedTime": "4.0158ms",
        "executionTime": "3.9938ms",
        "resultCount": 3,
        "resultSize": 409
    }
}"#;

/// A query rejected by the service: errors and no `results` member.
pub const QUERY_FATAL: &str = r#"{
    "requestID": "922e2f93-e3fb-4aa4-9a2b-8c4bd05c9ff6",
    "errors": [{"code": 3000, "msg": "syntax error - at end of input"}],
    "status": "FATAL",
    "metrics": {"elapsedTime": "1.1ms", "executionTime": "1.0ms", "resultCount": 0, "resultSize": 0, "errorCount": 1}
}"#;

/// A query that timed out after producing part of its results.
pub const QUERY_TIMEOUT: &str = r#"{
    "requestID": "6b23ab3c-4a5a-4b8e-a6c5-2e4d1d61f2b1",
    "results": [{"id": 1}],
    "errors": [{"code": 1080, "msg": "Timeout 1ms exceeded"}],
    "warnings": [{"code": 5190, "msg": "partial result"}],
    "status": "timeout"
}"#;

/// A reader over `json` served `chunk_size` bytes per read.
pub fn reader(json: &str, chunk_size: usize) -> JsonStreamReader<ChunkedReader> {
    JsonStreamReader::new(
        ChunkedReader::new(json.as_bytes(), chunk_size),
        ReaderOptions {
            buffer_size: 64,
            ..Default::default()
        },
    )
}

pub fn run<F: std::future::Future>(future: F) -> F::Output {
    block_on(future)
}
