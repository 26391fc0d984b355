//! BigQuery query client using the REST `jobs.query` endpoint.
//!
//! Uses blocking `ureq`. Parameters are sent in `NAMED` mode, so query text
//! references them as `@name`. A job still running when `jobs.query`
//! returns is polled through `jobs.getQueryResults` until it completes or
//! the configured timeout elapses. Rows are decoded lazily against the
//! response schema, one per `next()`; further result pages are fetched
//! only when the rows already received run out.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use bqspec_core::bqtype::{parse_date, parse_datetime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use super::{QueryClient, QueryError, RowStream};
use crate::numeric::parse_time;
use crate::spec::{ParamValue, QueryParam};
use crate::types::{Row, Value};

pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings. Credentials are a ready OAuth2 access token.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub project: String,
    pub access_token: String,
    pub endpoint: String,
    pub location: Option<String>,
    pub timeout: Duration,
    pub max_results: Option<u32>,
}

impl BigQueryConfig {
    pub fn new(project: impl Into<String>, access_token: impl Into<String>) -> Self {
        BigQueryConfig {
            project: project.into(),
            access_token: access_token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            location: None,
            timeout: DEFAULT_TIMEOUT,
            max_results: None,
        }
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.endpoint.trim_end_matches('/'),
            self.project
        )
    }

    /// `jobs.getQueryResults` URL for one job.
    fn results_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.queries_url(), job_id)
    }
}

pub struct BigQueryClient {
    config: BigQueryConfig,
    agent: ureq::Agent,
}

impl BigQueryClient {
    pub fn new(config: BigQueryConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        BigQueryClient { config, agent }
    }

    /// The `jobs.query` request body.
    pub fn request_body(
        &self,
        query: &str,
        params: &[QueryParam],
    ) -> Result<serde_json::Value, QueryError> {
        let parameters = params
            .iter()
            .map(param_json)
            .collect::<Result<Vec<_>, _>>()?;

        let mut body = serde_json::json!({
            "query": query,
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": parameters,
            "timeoutMs": self.config.timeout.as_millis() as u64,
        });
        if let Some(location) = &self.config.location {
            body["location"] = serde_json::Value::String(location.clone());
        }
        if let Some(max_results) = self.config.max_results {
            body["maxResults"] = serde_json::Value::from(max_results);
        }
        Ok(body)
    }
}

impl QueryClient for BigQueryClient {
    fn query(&self, query: &str, params: &[QueryParam]) -> Result<RowStream, QueryError> {
        let deadline = Instant::now() + self.config.timeout;
        let body = self.request_body(query, params)?;
        let url = self.config.queries_url();
        tracing::debug!(url = %url, params = params.len(), "submitting query");

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.config.access_token))
            .header("content-type", "application/json")
            .send_json(&body)
            .map_err(classify_http_error)?;
        let resp = read_response(response.into_body())?;

        let pages = ResultPages {
            config: self.config.clone(),
            agent: self.agent.clone(),
        };
        decode_response(resp, pages, deadline)
    }

    fn client_id(&self) -> &str {
        "bigquery"
    }
}

fn classify_http_error(err: ureq::Error) -> QueryError {
    let message = match err {
        ureq::Error::StatusCode(401) => "401 Unauthorized: check the access token".to_string(),
        ureq::Error::StatusCode(403) => "403 Forbidden: insufficient permissions".to_string(),
        ureq::Error::StatusCode(404) => "404 Not Found: check the project id".to_string(),
        ureq::Error::StatusCode(code) => format!("http status {}", code),
        other => other.to_string(),
    };
    QueryError::Request { message }
}

fn read_response(mut body: ureq::Body) -> Result<QueryResponse, QueryError> {
    body.read_json().map_err(|e| QueryError::Decode {
        message: format!("failed to parse query response: {}", e),
    })
}

// ──────────────────────────────────────────────
// Result pages
// ──────────────────────────────────────────────

/// Fetches `jobs.getQueryResults` responses for a submitted job.
///
/// Without a page token the call also serves as the completion poll:
/// BigQuery holds it open for up to `timeoutMs` while the job runs.
trait PageSource {
    fn fetch(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
        wait: Duration,
    ) -> Result<QueryResponse, QueryError>;
}

struct ResultPages {
    config: BigQueryConfig,
    agent: ureq::Agent,
}

impl PageSource for ResultPages {
    fn fetch(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
        wait: Duration,
    ) -> Result<QueryResponse, QueryError> {
        let url = self.config.results_url(job.id()?);
        tracing::debug!(url = %url, page_token, "fetching query results");

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {}", self.config.access_token))
            .query("timeoutMs", wait.as_millis().to_string());
        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }
        if let Some(location) = job.location.as_deref().or(self.config.location.as_deref()) {
            request = request.query("location", location);
        }
        if let Some(max_results) = self.config.max_results {
            request = request.query("maxResults", max_results.to_string());
        }

        let response = request.call().map_err(classify_http_error)?;
        read_response(response.into_body())
    }
}

// ──────────────────────────────────────────────
// Parameters
// ──────────────────────────────────────────────

fn param_json(param: &QueryParam) -> Result<serde_json::Value, QueryError> {
    Ok(serde_json::json!({
        "name": param.name,
        "parameterType": { "type": param.scalar_type.name() },
        "parameterValue": { "value": param_text(&param.value)? },
    }))
}

/// Canonical text form of a parameter value.
fn param_text(value: &ParamValue) -> Result<String, QueryError> {
    let encode_error = |e: time::error::Format| QueryError::Config {
        message: format!("cannot encode parameter value: {}", e),
    };
    Ok(match value {
        ParamValue::String(s) => s.clone(),
        ParamValue::Int64(n) => n.to_string(),
        ParamValue::Float64(f) if f.is_nan() => "NaN".to_string(),
        ParamValue::Float64(f) if f.is_infinite() => {
            let text = if *f > 0.0 { "Infinity" } else { "-Infinity" };
            text.to_string()
        }
        ParamValue::Float64(f) => f.to_string(),
        ParamValue::Bool(b) => b.to_string(),
        ParamValue::Timestamp(ts) => ts
            .to_offset(UtcOffset::UTC)
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]+00:00"
            ))
            .map_err(encode_error)?,
        ParamValue::Datetime(dt) => dt
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
            ))
            .map_err(encode_error)?,
        ParamValue::Date(d) => d
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(encode_error)?,
    })
}

// ──────────────────────────────────────────────
// Response decoding
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<serde_json::Value>,
    page_token: Option<String>,
    total_rows: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: Option<String>,
    location: Option<String>,
}

impl JobReference {
    fn id(&self) -> Result<&str, QueryError> {
        self.job_id
            .as_deref()
            .ok_or_else(|| decode_error("response has no job reference".to_string()))
    }

    fn incomplete(&self) -> QueryError {
        QueryError::Incomplete {
            job_id: self.job_id.clone().unwrap_or_else(|| "<unknown>".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

impl FieldSchema {
    fn is_repeated(&self) -> bool {
        self.mode.as_deref() == Some("REPEATED")
    }
}

/// Wait for the job to finish, then stream its rows page by page.
fn decode_response<S: PageSource + 'static>(
    resp: QueryResponse,
    source: S,
    deadline: Instant,
) -> Result<RowStream, QueryError> {
    let resp = await_completion(resp, &source, deadline)?;
    let job = resp.job_reference.unwrap_or_default();
    tracing::debug!(
        job_id = job.job_id.as_deref().unwrap_or("?"),
        received = resp.rows.len(),
        total = resp.total_rows.as_deref().unwrap_or("?"),
        more = resp.page_token.is_some(),
        "query complete"
    );

    Ok(Box::new(RowDecoder {
        source,
        job,
        fields: Arc::new(resp.schema.map(|s| s.fields).unwrap_or_default()),
        rows: resp.rows.into_iter(),
        page_token: resp.page_token,
    }))
}

/// Poll `jobs.getQueryResults` until `jobComplete`, giving up at `deadline`.
fn await_completion(
    mut resp: QueryResponse,
    source: &dyn PageSource,
    deadline: Instant,
) -> Result<QueryResponse, QueryError> {
    while !resp.job_complete {
        let job = resp.job_reference.take().unwrap_or_default();
        let wait = deadline.saturating_duration_since(Instant::now());
        if wait.is_zero() || job.job_id.is_none() {
            return Err(job.incomplete());
        }
        tracing::debug!(job_id = job.job_id.as_deref().unwrap_or("?"), "job still running");
        resp = source.fetch(&job, None, wait)?;
        if resp.job_reference.is_none() {
            resp.job_reference = Some(job);
        }
    }
    Ok(resp)
}

/// Decodes one raw `{"f": [...]}` row per `next()`, fetching the next
/// page when the current one is exhausted.
struct RowDecoder<S> {
    source: S,
    job: JobReference,
    fields: Arc<Vec<FieldSchema>>,
    rows: std::vec::IntoIter<serde_json::Value>,
    page_token: Option<String>,
}

impl<S: PageSource> Iterator for RowDecoder<S> {
    type Item = Result<Row, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(raw) = self.rows.next() {
                return Some(decode_record(&self.fields, &raw));
            }
            let token = self.page_token.take()?;
            match self.source.fetch(&self.job, Some(&token), DEFAULT_TIMEOUT) {
                Ok(page) => {
                    self.rows = page.rows.into_iter();
                    self.page_token = page.page_token;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn decode_error(message: String) -> QueryError {
    QueryError::Decode { message }
}

/// Decode a `{"f": [{"v": ...}, ...]}` record against its fields.
fn decode_record(fields: &[FieldSchema], raw: &serde_json::Value) -> Result<Row, QueryError> {
    let cells = raw
        .get("f")
        .and_then(|f| f.as_array())
        .ok_or_else(|| decode_error("row without 'f' cell list".to_string()))?;
    if cells.len() != fields.len() {
        return Err(decode_error(format!(
            "row has {} cells but schema has {} fields",
            cells.len(),
            fields.len()
        )));
    }

    let mut row = Row::new();
    for (field, cell) in fields.iter().zip(cells) {
        let v = cell.get("v").unwrap_or(&serde_json::Value::Null);
        row.insert(field.name.clone(), decode_field(field, v)?);
    }
    Ok(row)
}

fn decode_field(field: &FieldSchema, v: &serde_json::Value) -> Result<Value, QueryError> {
    if !field.is_repeated() {
        return decode_scalar(field, v);
    }
    match v {
        serde_json::Value::Null => Ok(Value::List(Vec::new())),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| decode_scalar(field, item.get("v").unwrap_or(&serde_json::Value::Null)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Err(decode_error(format!(
            "repeated field '{}' is not a list: {}",
            field.name, other
        ))),
    }
}

fn decode_scalar(field: &FieldSchema, v: &serde_json::Value) -> Result<Value, QueryError> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    if matches!(field.field_type.as_str(), "RECORD" | "STRUCT") {
        return decode_record(&field.fields, v).map(Value::Record);
    }

    let text = v.as_str().ok_or_else(|| {
        decode_error(format!("field '{}' cell is not text: {}", field.name, v))
    })?;
    let invalid = || {
        decode_error(format!(
            "invalid {} value for field '{}': {}",
            field.field_type, field.name, text
        ))
    };

    let value = match field.field_type.as_str() {
        "INTEGER" | "INT64" => Value::Int(text.parse().map_err(|_| invalid())?),
        "FLOAT" | "FLOAT64" => Value::Float(text.parse().map_err(|_| invalid())?),
        "NUMERIC" | "BIGNUMERIC" | "BIGDECIMAL" => Value::Numeric(
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|_| invalid())?,
        ),
        "BOOLEAN" | "BOOL" => match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        "BYTES" => Value::Bytes(
            base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|_| invalid())?,
        ),
        "TIMESTAMP" => Value::Timestamp(epoch_seconds(text).ok_or_else(invalid)?),
        "DATE" => Value::Date(parse_date(text).ok_or_else(invalid)?),
        "DATETIME" => Value::DateTime(parse_datetime(text).ok_or_else(invalid)?),
        "TIME" => Value::Time(parse_time(text).ok_or_else(invalid)?),
        _ => Value::Text(text.to_string()),
    };
    Ok(value)
}

/// TIMESTAMP cells are epoch seconds, possibly fractional or in
/// scientific notation (`1.7040672E9`).
fn epoch_seconds(text: &str) -> Option<OffsetDateTime> {
    let secs = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()?;
    let nanos = secs.checked_mul(Decimal::from(1_000_000_000u64))?.trunc().to_i128()?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bqspec_core::ScalarType;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use time::macros::{date, datetime};

    fn response(json: serde_json::Value) -> QueryResponse {
        serde_json::from_value(json).unwrap()
    }

    /// Serves canned `getQueryResults` responses in order and records the
    /// page token of every request.
    struct CannedPages {
        responses: RefCell<VecDeque<serde_json::Value>>,
        tokens: Rc<RefCell<Vec<Option<String>>>>,
    }

    impl CannedPages {
        fn new(responses: Vec<serde_json::Value>) -> Self {
            CannedPages {
                responses: RefCell::new(responses.into()),
                tokens: Rc::default(),
            }
        }
    }

    impl PageSource for CannedPages {
        fn fetch(
            &self,
            job: &JobReference,
            page_token: Option<&str>,
            _wait: Duration,
        ) -> Result<QueryResponse, QueryError> {
            assert_eq!(job.id()?, "job_1");
            self.tokens.borrow_mut().push(page_token.map(str::to_string));
            let next = self.responses.borrow_mut().pop_front().ok_or_else(|| {
                QueryError::Request {
                    message: "http status 500".into(),
                }
            })?;
            Ok(response(next))
        }
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn rows_of(json: serde_json::Value) -> Vec<Row> {
        decode_response(response(json), CannedPages::new(Vec::new()), later())
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn ints(rows: &[Row]) -> Vec<Value> {
        rows.iter().map(|r| r["n"].clone()).collect()
    }

    #[test]
    fn request_body_uses_named_parameters() {
        let mut config = BigQueryConfig::new("proj", "token");
        config.location = Some("EU".into());
        config.max_results = Some(500);
        let client = BigQueryClient::new(config);
        let params = vec![
            QueryParam {
                name: "n".into(),
                scalar_type: ScalarType::Int64,
                value: ParamValue::Int64(3),
            },
            QueryParam {
                name: "since".into(),
                scalar_type: ScalarType::Timestamp,
                value: ParamValue::Timestamp(datetime!(2024-01-31 10:00 +02:00)),
            },
            QueryParam {
                name: "day".into(),
                scalar_type: ScalarType::Date,
                value: ParamValue::Date(date!(2024 - 01 - 31)),
            },
        ];
        let body = client.request_body("SELECT @n", &params).unwrap();
        assert_eq!(body["parameterMode"], "NAMED");
        assert_eq!(body["useLegacySql"], false);
        assert_eq!(body["location"], "EU");
        assert_eq!(body["maxResults"], 500);
        assert_eq!(
            body["queryParameters"][0],
            serde_json::json!({
                "name": "n",
                "parameterType": {"type": "INT64"},
                "parameterValue": {"value": "3"},
            })
        );
        assert_eq!(
            body["queryParameters"][1]["parameterValue"]["value"],
            "2024-01-31 08:00:00.000000+00:00"
        );
        assert_eq!(body["queryParameters"][2]["parameterValue"]["value"], "2024-01-31");
    }

    #[test]
    fn queries_url_joins_endpoint_and_project() {
        let mut config = BigQueryConfig::new("my-proj", "t");
        config.endpoint = "http://localhost:9050/bigquery/v2/".into();
        assert_eq!(
            config.queries_url(),
            "http://localhost:9050/bigquery/v2/projects/my-proj/queries"
        );
    }

    #[test]
    fn decodes_typed_rows() {
        let rows = rows_of(serde_json::json!({
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "id", "type": "INTEGER"},
                {"name": "amount", "type": "NUMERIC"},
                {"name": "rate", "type": "FLOAT"},
                {"name": "ok", "type": "BOOLEAN"},
                {"name": "at", "type": "TIMESTAMP"},
                {"name": "day", "type": "DATE"},
                {"name": "raw", "type": "BYTES"},
                {"name": "note", "type": "STRING"},
            ]},
            "rows": [
                {"f": [
                    {"v": "1"}, {"v": "10.50"}, {"v": "0.25"}, {"v": "true"},
                    {"v": "1.7040672E9"}, {"v": "2024-01-01"}, {"v": "aGk="}, {"v": null},
                ]},
            ],
        }));
        let row = &rows[0];
        assert_eq!(row["id"], Value::Int(1));
        assert_eq!(row["amount"], Value::Numeric(Decimal::from_str("10.5").unwrap()));
        assert_eq!(row["rate"], Value::Float(0.25));
        assert_eq!(row["ok"], Value::Bool(true));
        assert_eq!(row["at"], Value::Timestamp(datetime!(2024-01-01 00:00 UTC)));
        assert_eq!(row["day"], Value::Date(date!(2024 - 01 - 01)));
        assert_eq!(row["raw"], Value::Bytes(b"hi".to_vec()));
        assert_eq!(row["note"], Value::Null);
    }

    #[test]
    fn decodes_repeated_and_nested_fields() {
        let rows = rows_of(serde_json::json!({
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "tags", "type": "STRING", "mode": "REPEATED"},
                {"name": "owner", "type": "RECORD", "fields": [
                    {"name": "name", "type": "STRING"},
                    {"name": "age", "type": "INT64"},
                ]},
            ]},
            "rows": [
                {"f": [
                    {"v": [{"v": "a"}, {"v": "b"}]},
                    {"v": {"f": [{"v": "ann"}, {"v": "40"}]}},
                ]},
            ],
        }));
        assert_eq!(
            rows[0]["tags"],
            Value::List(vec![Value::Text("a".into()), Value::Text("b".into())])
        );
        match &rows[0]["owner"] {
            Value::Record(fields) => assert_eq!(fields["age"], Value::Int(40)),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn incomplete_job_past_deadline_is_an_error() {
        let err = decode_response(
            response(serde_json::json!({
                "jobComplete": false,
                "jobReference": {"jobId": "job_123"},
            })),
            CannedPages::new(Vec::new()),
            Instant::now(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, QueryError::Incomplete { job_id } if job_id == "job_123"));
    }

    #[test]
    fn running_job_is_polled_until_complete() {
        let pages = CannedPages::new(vec![
            serde_json::json!({"jobComplete": false}),
            serde_json::json!({
                "jobComplete": true,
                "schema": {"fields": [{"name": "n", "type": "INT64"}]},
                "rows": [{"f": [{"v": "7"}]}],
            }),
        ]);
        let tokens = Rc::clone(&pages.tokens);
        let first = response(serde_json::json!({
            "jobComplete": false,
            "jobReference": {"jobId": "job_1", "location": "EU"},
        }));

        let rows = decode_response(first, pages, later())
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(ints(&rows), vec![Value::Int(7)]);
        assert_eq!(*tokens.borrow(), vec![None, None]);
    }

    #[test]
    fn page_tokens_are_followed_lazily() {
        let pages = CannedPages::new(vec![
            serde_json::json!({
                "jobComplete": true,
                "rows": [{"f": [{"v": "2"}]}],
                "pageToken": "p3",
            }),
            serde_json::json!({"jobComplete": true, "rows": [], "pageToken": "p4"}),
            serde_json::json!({"jobComplete": true, "rows": [{"f": [{"v": "3"}]}]}),
        ]);
        let tokens = Rc::clone(&pages.tokens);
        let first = response(serde_json::json!({
            "jobComplete": true,
            "jobReference": {"jobId": "job_1"},
            "schema": {"fields": [{"name": "n", "type": "INT64"}]},
            "rows": [{"f": [{"v": "1"}]}],
            "pageToken": "p2",
            "totalRows": "3",
        }));

        let mut stream = decode_response(first, pages, later()).unwrap();
        assert_eq!(stream.next().unwrap().unwrap()["n"], Value::Int(1));
        assert!(tokens.borrow().is_empty());

        let rest = stream.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(ints(&rest), vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(
            *tokens.borrow(),
            vec![Some("p2".to_string()), Some("p3".to_string()), Some("p4".to_string())]
        );
    }

    #[test]
    fn failed_page_fetch_ends_the_stream_with_an_error() {
        let first = response(serde_json::json!({
            "jobComplete": true,
            "jobReference": {"jobId": "job_1"},
            "schema": {"fields": [{"name": "n", "type": "INT64"}]},
            "rows": [{"f": [{"v": "1"}]}],
            "pageToken": "p2",
        }));
        let mut stream = decode_response(first, CannedPages::new(Vec::new()), later()).unwrap();
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(stream.next().unwrap(), Err(QueryError::Request { .. })));
        assert!(stream.next().is_none());
    }

    #[test]
    fn results_url_names_the_job() {
        let config = BigQueryConfig::new("my-proj", "t");
        assert_eq!(
            config.results_url("job_1"),
            "https://bigquery.googleapis.com/bigquery/v2/projects/my-proj/queries/job_1"
        );
    }

    #[test]
    fn bad_cell_fails_only_that_row() {
        let mut stream = decode_response(
            response(serde_json::json!({
                "jobComplete": true,
                "schema": {"fields": [{"name": "n", "type": "INT64"}]},
                "rows": [{"f": [{"v": "1"}]}, {"f": [{"v": "x"}]}],
            })),
            CannedPages::new(Vec::new()),
            later(),
        )
        .unwrap();
        assert!(stream.next().unwrap().is_ok());
        assert!(matches!(stream.next().unwrap(), Err(QueryError::Decode { .. })));
        assert!(stream.next().is_none());
    }

    #[test]
    fn empty_result_has_no_rows() {
        let rows = rows_of(serde_json::json!({
            "jobComplete": true,
            "schema": {"fields": [{"name": "n", "type": "INT64"}]},
            "totalRows": "0",
        }));
        assert!(rows.is_empty());
    }
}
