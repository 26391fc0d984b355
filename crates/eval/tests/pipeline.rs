//! End-to-end pipeline: YAML text -> schema validation -> raw spec ->
//! value validation -> build -> verification against fixture rows.

use bqspec_core::{parse_document, validate_schema, validate_values, RawSpec, ResourcePath};
use bqspec_eval::{build, run_spec, verify, FixtureClient, QueryClient, Row, RunError, Spec, Value};

// ──────────────────────────────────────────────
// Test helpers
// ──────────────────────────────────────────────

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("query.sql"), "SELECT amount, status FROM t").unwrap();
        Workspace { dir }
    }

    fn query_path(&self) -> String {
        self.dir.path().join("query.sql").display().to_string()
    }

    /// Run the document through both validators and the builder.
    fn spec(&self, body: &str) -> Spec {
        let yaml = format!("query_path: {:?}\n{}", self.query_path(), body);
        let doc = parse_document(&yaml).unwrap();
        assert_eq!(validate_schema(&doc), Vec::new());
        let raw = RawSpec::from_document(&doc).unwrap();
        assert_eq!(validate_values(&raw, &ResourcePath::root()), Vec::new());
        build(&raw).unwrap()
    }
}

fn rows(json: &str) -> Vec<Row> {
    FixtureClient::parse_rows(json).unwrap()
}

fn run(spec: &Spec, json: &str) -> bqspec_eval::Verification {
    verify(spec, rows(json).into_iter().map(Ok)).unwrap()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn invariant_violation_is_reported_with_row() {
    let ws = Workspace::new();
    let spec = ws.spec("invariants:\n  - amount > 0\n");
    let v = run(&spec, r#"[{"amount": 10}, {"amount": -1}]"#);

    assert_eq!(v.invariant_failures.len(), 1);
    let failure = &v.invariant_failures[0];
    assert_eq!(failure.row.get("amount"), Some(&Value::Int(-1)));
    assert_eq!(failure.failed, vec!["amount > 0".to_string()]);
    assert_eq!(bqspec_eval::format_row(&failure.row), "{amount: -1}");
}

#[test]
fn case_guard_selects_rows() {
    let ws = Workspace::new();
    let spec = ws.spec(
        r#"
cases:
  - where: ["status == 'done'"]
    expected: ["amount > 0"]
"#,
    );
    let v = run(
        &spec,
        r#"[{"status": "done", "amount": -1}, {"status": "open", "amount": -1}]"#,
    );

    assert_eq!(v.case_failures.len(), 1);
    assert_eq!(v.case_failures[0].len(), 1);
    assert_eq!(v.case_failures[0][0].row_index, 0);
    assert!(v.invariant_failures.is_empty());
}

#[test]
fn verification_is_repeatable() {
    let ws = Workspace::new();
    let spec = ws.spec(
        r#"
columns: [amount, status]
invariants: ["amount != 0"]
cases:
  - where: ["status == 'open'"]
    expected: ["amount < 100", "amount > 1"]
"#,
    );
    let data = r#"[
        {"status": "open", "amount": 500},
        {"status": "open", "amount": 0},
        {"status": "done", "amount": 1, "extra": true}
    ]"#;
    assert_eq!(run(&spec, data), run(&spec, data));
}

#[test]
fn unknown_columns_come_from_first_row_only() {
    let ws = Workspace::new();
    let spec = ws.spec("columns: [amount]\ninvariants: [amount >= 0]\n");
    let v = run(
        &spec,
        r#"[{"amount": 1, "region": "eu"}, {"amount": 2, "country": "fr"}]"#,
    );

    let unknown = v
        .unknown_columns
        .as_ref()
        .expect("first row has an undeclared column");
    assert_eq!(unknown.messages, vec!["unknown column: region".to_string()]);
    assert!(v.is_success());
}

#[test]
fn build_preserves_every_condition_in_order() {
    let ws = Workspace::new();
    let yaml = format!(
        r#"
query_path: {:?}
params:
  - {{type: int64, name: limit, value: 10}}
  - {{type: DATE, name: day, value: "2024-01-31"}}
invariants: ["a > 0", "b > 0"]
cases:
  - where: ["c == 1", "d == 2"]
    expected: ["e == 3"]
  - where: ["f == 4"]
    expected: ["g == 5", "h == 6"]
"#,
        ws.query_path()
    );
    let doc = parse_document(&yaml).unwrap();
    let raw = RawSpec::from_document(&doc).unwrap();
    let spec = build(&raw).unwrap();

    let built: Vec<&str> = spec.conditions().map(|c| c.source.as_str()).collect();
    assert_eq!(built, raw.condition_texts());
    assert_eq!(spec.cases.len(), 2);
    assert_eq!(spec.params.len(), 2);
}

#[test]
fn run_spec_reads_query_and_uses_client() {
    let ws = Workspace::new();
    let spec = ws.spec("invariants: [\"amount > 0\"]\n");
    let client = FixtureClient::with_rows(rows(r#"[{"amount": 3}]"#));
    assert_eq!(client.client_id(), "fixture");
    let v = run_spec(&spec, &client).unwrap();
    assert_eq!(v.rows_checked, 1);
    assert!(v.is_success());
}

#[test]
fn run_spec_reports_missing_query_file() {
    let ws = Workspace::new();
    let mut spec = ws.spec("invariants: [\"amount > 0\"]\n");
    spec.query_path = ws.dir.path().join("gone.sql").display().to_string();
    let client = FixtureClient::with_rows(Vec::new());
    assert!(matches!(
        run_spec(&spec, &client),
        Err(RunError::ReadQuery { .. })
    ));
}

#[test]
fn evaluation_error_names_row_and_condition() {
    let ws = Workspace::new();
    let spec = ws.spec("invariants: [\"amount / divisor > 1\"]\n");
    let client = FixtureClient::with_rows(rows(r#"[{"amount": 4, "divisor": 2}, {"amount": 4, "divisor": 0}]"#));
    let err = run_spec(&spec, &client).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("row 1"), "{}", message);
    assert!(message.contains("amount / divisor > 1"), "{}", message);
    assert!(message.contains("division by zero"), "{}", message);
}
