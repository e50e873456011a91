use std::{fmt, str::FromStr};

use futures::io::AsyncRead;
use serde::{Deserialize, Serialize};

use super::{ResponseAttributes, StreamingResult};
use crate::{
    decoder::{SerdeDecoder, TypeDecoder},
    error::Error,
    reader::JsonStreamReader,
    token::JsonToken,
    value::ValueKind,
};

/// Execution status reported by the query service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// The request is still executing.
    Running,
    /// Completed without errors.
    Success,
    /// Completed with errors.
    Errors,
    /// Completed; errors, if any, are in `errors`.
    Completed,
    /// Stopped by the client.
    Stopped,
    /// Ran out of time; the rows are partial.
    Timeout,
    /// The connection closed before completion.
    Closed,
    /// Failed before producing results.
    Fatal,
    /// Aborted by the service.
    Aborted,
    /// The service did not know the status.
    Unknown,
}

impl QueryStatus {
    const ALL: [Self; 10] = [
        Self::Running,
        Self::Success,
        Self::Errors,
        Self::Completed,
        Self::Stopped,
        Self::Timeout,
        Self::Closed,
        Self::Fatal,
        Self::Aborted,
        Self::Unknown,
    ];

    /// The status as the service spells it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Errors => "errors",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Timeout => "timeout",
            Self::Closed => "closed",
            Self::Fatal => "fatal",
            Self::Aborted => "aborted",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned for status strings the service is not known to send.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized query status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for QueryStatus {
    type Err = UnknownStatus;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// The `metrics` object of a query response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryMetrics {
    /// Wall-clock time, as a duration string such as `"4.0158ms"`.
    pub elapsed_time: Option<String>,
    /// Time spent executing, as a duration string.
    pub execution_time: Option<String>,
    /// Number of rows returned.
    pub result_count: u64,
    /// Size of the results in bytes.
    pub result_size: u64,
    /// Documents changed by a mutating statement.
    pub mutation_count: Option<u64>,
    /// Rows sorted, when the statement sorted.
    pub sort_count: Option<u64>,
    /// Number of entries in `errors`.
    pub error_count: Option<u64>,
    /// Number of entries in `warnings`.
    pub warning_count: Option<u64>,
}

/// An entry of the `errors` or `warnings` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryProblem {
    /// Service error code.
    pub code: i64,
    /// Human-readable message.
    pub msg: String,
}

/// Attributes of a query response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMetaData {
    /// `requestID`, assigned by the service.
    pub request_id: Option<String>,
    /// `clientContextID`, echoed back from the request.
    pub client_context_id: Option<String>,
    /// Final status. Usually arrives after the rows.
    pub status: Option<QueryStatus>,
    /// Shape of the result rows.
    pub signature: Option<JsonToken>,
    /// Name of the prepared plan, when the statement was prepared.
    pub prepared: Option<String>,
    /// Execution profile, when one was requested.
    pub profile: Option<JsonToken>,
    /// Execution metrics.
    pub metrics: QueryMetrics,
    /// Errors reported by the service.
    pub errors: Vec<QueryProblem>,
    /// Warnings reported by the service.
    pub warnings: Vec<QueryProblem>,
}

impl QueryMetaData {
    /// Whether the service reported `success`.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(QueryStatus::Success)
    }
}

impl ResponseAttributes for QueryMetaData {
    fn rows_property(&self) -> &str {
        "results"
    }

    async fn read_attribute<R, D>(
        &mut self,
        path: &str,
        reader: &mut JsonStreamReader<R, D>,
    ) -> Result<(), Error>
    where
        R: AsyncRead + Unpin,
        D: TypeDecoder,
    {
        let kind = reader.current_value_kind();
        match (path, kind) {
            ("requestID", Some(ValueKind::String)) => {
                self.request_id = Some(reader.read_object_or_scalar().await?);
            }
            ("clientContextID", Some(ValueKind::String)) => {
                self.client_context_id = Some(reader.read_object_or_scalar().await?);
            }
            ("status", Some(ValueKind::String)) => {
                let status: String = reader.read_object_or_scalar().await?;
                match status.parse() {
                    Ok(status) => self.status = Some(status),
                    Err(e) => log::debug!("{e}"),
                }
            }
            ("prepared", Some(ValueKind::String)) => {
                self.prepared = Some(reader.read_object_or_scalar().await?);
            }
            ("signature", _) => self.signature = Some(reader.read_token().await?),
            ("profile", _) => self.profile = Some(reader.read_token().await?),
            ("errors", None) => self.errors = reader.read_object_or_scalar().await?,
            ("warnings", None) => self.warnings = reader.read_object_or_scalar().await?,
            // The metrics object is walked member by member.
            ("metrics.elapsedTime", Some(ValueKind::String)) => {
                self.metrics.elapsed_time = Some(reader.read_object_or_scalar().await?);
            }
            ("metrics.executionTime", Some(ValueKind::String)) => {
                self.metrics.execution_time = Some(reader.read_object_or_scalar().await?);
            }
            ("metrics.resultCount", Some(ValueKind::Integer)) => {
                self.metrics.result_count = reader.read_object_or_scalar().await?;
            }
            ("metrics.resultSize", Some(ValueKind::Integer)) => {
                self.metrics.result_size = reader.read_object_or_scalar().await?;
            }
            ("metrics.mutationCount", Some(ValueKind::Integer)) => {
                self.metrics.mutation_count = Some(reader.read_object_or_scalar().await?);
            }
            ("metrics.sortCount", Some(ValueKind::Integer)) => {
                self.metrics.sort_count = Some(reader.read_object_or_scalar().await?);
            }
            ("metrics.errorCount", Some(ValueKind::Integer)) => {
                self.metrics.error_count = Some(reader.read_object_or_scalar().await?);
            }
            ("metrics.warningCount", Some(ValueKind::Integer)) => {
                self.metrics.warning_count = Some(reader.read_object_or_scalar().await?);
            }
            _ => {}
        }
        Ok(())
    }
}

/// A streamed query response with rows of type `T`.
pub type QueryResult<'r, R, T, D = SerdeDecoder> = StreamingResult<'r, R, D, QueryMetaData, T>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("success", QueryStatus::Success)]
    #[case("SUCCESS", QueryStatus::Success)]
    #[case("Timeout", QueryStatus::Timeout)]
    #[case("fatal", QueryStatus::Fatal)]
    fn status_parses_case_insensitively(#[case] text: &str, #[case] expected: QueryStatus) {
        assert_eq!(text.parse::<QueryStatus>().unwrap(), expected);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "succeeded".parse::<QueryStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized query status 'succeeded'");
    }

    #[test]
    fn success_follows_status() {
        let mut meta = QueryMetaData::default();
        assert!(!meta.success());
        meta.status = Some(QueryStatus::Errors);
        assert!(!meta.success());
        meta.status = Some(QueryStatus::Success);
        assert!(meta.success());
    }

    #[test]
    fn metrics_deserialize_from_camel_case() {
        let metrics: QueryMetrics = serde_json::from_str(
            r#"{"elapsedTime": "3.2ms", "executionTime": "3.1ms", "resultCount": 2, "resultSize": 120, "sortCount": 2}"#,
        )
        .unwrap();
        assert_eq!(metrics.elapsed_time.as_deref(), Some("3.2ms"));
        assert_eq!(metrics.result_count, 2);
        assert_eq!(metrics.sort_count, Some(2));
        assert_eq!(metrics.mutation_count, None);
    }
}
