mod common;

use common::{ScriptedOracle, TestWorkspace, UnreachableOracle, fixture_path};
use csv_redact::data::{CellValue, Dataset};
use csv_redact::loader::TabularSource;
use csv_redact::oracle::OracleSettings;
use csv_redact::pattern::{PatternSource, branch_count};
use csv_redact::pipeline::{OracleBinding, ProcessRequest, process};
use csv_redact::vocabulary::{GENERIC_PATTERN, category};

fn shown(dataset: &Dataset, row: usize, column: &str) -> Option<String> {
    dataset.cell(row, column).map(CellValue::as_display)
}

fn email_pattern() -> &'static str {
    category("email").and_then(|c| c.pattern).expect("email pattern")
}

#[test]
fn redacts_dedicated_email_column_offline() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("contacts.csv", "id,contact_email\n1,jane@x.com\n");
    let request = ProcessRequest::new("redact emails", "[REDACTED]");

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.pattern_source, Some(PatternSource::Fallback));
    assert_eq!(outcome.target_columns, vec!["contact_email"]);
    assert_eq!(outcome.regex_pattern, email_pattern());
    assert_eq!(outcome.replacement_stats.get("contact_email"), Some(&1));
    assert_eq!(
        shown(&outcome.processed_data, 0, "contact_email").as_deref(),
        Some("[REDACTED]")
    );
    assert_eq!(
        shown(&outcome.original_data, 0, "contact_email").as_deref(),
        Some("jane@x.com")
    );
    assert_eq!(outcome.columns, vec!["id", "contact_email"]);
    assert_eq!(outcome.text_columns, vec!["contact_email"]);
}

#[test]
fn phone_and_ip_request_leaves_notes_alone() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source(
        "hosts.csv",
        "phone,server_ip,notes\n555-123-4567,10.0.0.1,call me\n",
    );
    let request = ProcessRequest::new("remove phone and IP", "***");

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(outcome.success);
    assert_eq!(outcome.target_columns, vec!["phone", "server_ip"]);
    assert_eq!(branch_count(&outcome.regex_pattern), 2);
    assert_eq!(outcome.replacement_stats.get("phone"), Some(&1));
    assert_eq!(outcome.replacement_stats.get("server_ip"), Some(&1));
    assert!(!outcome.replacement_stats.contains_key("notes"));
    assert_eq!(
        shown(&outcome.processed_data, 0, "notes").as_deref(),
        Some("call me")
    );
    assert_eq!(
        shown(&outcome.processed_data, 0, "server_ip").as_deref(),
        Some("***")
    );
}

#[test]
fn unknown_oracle_columns_fall_back_entirely() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("contacts.csv", "contact_email,notes\njane@x.com,hello\n");
    let oracle = ScriptedOracle::new(
        r#"{"target_columns": ["ghost_column"], "regex": "\\d+", "explanation": "digits"}"#,
    );
    let request = ProcessRequest::new("redact emails", "[X]");

    let outcome = process(&source, &request, OracleBinding::Custom(&oracle));

    assert!(outcome.success);
    assert_eq!(outcome.pattern_source, Some(PatternSource::Fallback));
    assert_eq!(outcome.target_columns, vec!["contact_email"]);
    assert_eq!(outcome.regex_pattern, email_pattern());
    assert!(outcome.explanation.contains("fallback"));

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("contact_email"));
    assert!(prompts[0].contains("jane@x.com"));
}

#[test]
fn invalid_oracle_pattern_keeps_validated_columns() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source(
        "notes.csv",
        "contact_email,notes\njane@x.com,write to jane@x.com today\n",
    );
    let oracle = ScriptedOracle::new(
        r#"{"target_columns": ["notes", "ghost"], "regex": "(unclosed", "explanation": "broken"}"#,
    );
    let request = ProcessRequest::new("hide emails", "[X]");

    let outcome = process(&source, &request, OracleBinding::Custom(&oracle));

    assert!(outcome.success);
    assert_eq!(outcome.pattern_source, Some(PatternSource::Repaired));
    assert_eq!(outcome.target_columns, vec!["notes"]);
    assert_eq!(outcome.regex_pattern, email_pattern());
    assert_eq!(
        shown(&outcome.processed_data, 0, "notes").as_deref(),
        Some("write to [X] today")
    );
    assert_eq!(
        shown(&outcome.processed_data, 0, "contact_email").as_deref(),
        Some("jane@x.com")
    );
}

#[test]
fn pattern_missing_requested_kinds_is_discarded() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source(
        "people.csv",
        "full_name,contact_email,notes\nJane Doe,jane@x.com,hello\n",
    );
    let oracle = ScriptedOracle::new(
        r#"{"target_columns": ["notes"], "regex": "\\\\S+@\\\\S+", "explanation": "emails"}"#,
    );
    let request = ProcessRequest::new("emails and names", "[X]");

    let outcome = process(&source, &request, OracleBinding::Custom(&oracle));

    assert!(outcome.success);
    assert_eq!(outcome.pattern_source, Some(PatternSource::Fallback));
    assert_eq!(outcome.target_columns, vec!["full_name", "contact_email"]);
    assert_eq!(branch_count(&outcome.regex_pattern), 2);
    assert_eq!(
        shown(&outcome.processed_data, 0, "notes").as_deref(),
        Some("hello")
    );
}

#[test]
fn accepted_oracle_pattern_substitutes_inside_free_text() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("log.csv", "id,notes\n1,call 555-1234 now\n2,nothing\n");
    let oracle = ScriptedOracle::new(
        "```json\n{\"target_columns\": [\"notes\"], \"regex\": \"\\\\b\\\\d{3}-\\\\d{4}\\\\b\", \"explanation\": \"Seven digit phone numbers\"}\n```",
    );
    let request = ProcessRequest::new("phone numbers", "[P]");

    let outcome = process(&source, &request, OracleBinding::Custom(&oracle));

    assert!(outcome.success);
    assert_eq!(outcome.pattern_source, Some(PatternSource::Oracle));
    assert_eq!(outcome.regex_pattern, r"\b\d{3}-\d{4}\b");
    assert_eq!(outcome.explanation, "Seven digit phone numbers");
    assert_eq!(outcome.replacement_stats.get("notes"), Some(&1));
    assert_eq!(
        shown(&outcome.processed_data, 0, "notes").as_deref(),
        Some("call [P] now")
    );
    assert_eq!(
        shown(&outcome.processed_data, 1, "notes").as_deref(),
        Some("nothing")
    );
}

#[test]
fn unreachable_oracle_is_not_fatal() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("contacts.csv", "contact_email\njane@x.com\n");
    let request = ProcessRequest::new("redact emails", "[X]");

    let outcome = process(&source, &request, OracleBinding::Custom(&UnreachableOracle));

    assert!(outcome.success);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.pattern_source, Some(PatternSource::Fallback));
}

#[test]
fn missing_credential_fails_before_loading() {
    let settings = OracleSettings::default();
    let source = TabularSource::from_path("does-not-exist.csv").expect("csv extension");
    let request = ProcessRequest::new("redact emails", "[X]");

    for credential in [None, Some("   ")] {
        let outcome = process(
            &source,
            &request,
            OracleBinding::Remote {
                settings: &settings,
                credential,
            },
        );
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap_or_default().contains("API key"));
        assert!(outcome.original_data.is_empty());
        assert!(outcome.target_columns.is_empty());
    }
}

#[test]
fn numeric_only_dataset_is_fatal() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("numbers.csv", "a,b\n1,2.5\n3,4\n");
    let request = ProcessRequest::new("everything", "[X]");

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(!outcome.success);
    assert!(outcome.error.as_deref().unwrap_or_default().contains("No textual columns"));
    assert!(outcome.columns.is_empty());
    assert!(outcome.processed_data.is_empty());
    assert!(outcome.replacement_stats.is_empty());
}

#[test]
fn unreadable_workbook_is_fatal() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_bytes("broken.xlsx", b"this is not a zip archive");
    let source = TabularSource::from_path(path).expect("xlsx extension");
    let request = ProcessRequest::new("redact emails", "[X]");

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(!outcome.success);
    assert!(outcome.error.is_some());
    assert!(outcome.original_data.is_empty());
    assert!(outcome.regex_pattern.is_empty());
}

#[test]
fn explicit_column_overrides_selection() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source(
        "contacts.csv",
        "id,contact_email,notes\n1,jane@x.com,mail jane@x.com\n",
    );
    let request =
        ProcessRequest::new("redact emails", "[X]").with_column(Some("notes".to_string()));

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(outcome.success);
    assert_eq!(outcome.target_columns, vec!["notes"]);
    assert_eq!(
        shown(&outcome.processed_data, 0, "notes").as_deref(),
        Some("mail [X]")
    );
    assert_eq!(
        shown(&outcome.processed_data, 0, "contact_email").as_deref(),
        Some("jane@x.com")
    );
}

#[test]
fn non_textual_explicit_column_is_ignored() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("contacts.csv", "id,contact_email\n1,jane@x.com\n");
    let request = ProcessRequest::new("redact emails", "[X]").with_column(Some("id".to_string()));

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(outcome.success);
    assert_eq!(outcome.target_columns, vec!["contact_email"]);
}

#[test]
fn unmatched_description_targets_every_text_column() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("misc.csv", "owner,remarks\nJane Doe,top secret\n");
    let request = ProcessRequest::new("hide secrets", "[X]");

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(outcome.success);
    assert_eq!(outcome.regex_pattern, GENERIC_PATTERN);
    assert_eq!(outcome.target_columns, outcome.text_columns);
    assert_eq!(
        shown(&outcome.processed_data, 0, "remarks").as_deref(),
        Some("[X] [X]")
    );
}

#[test]
fn outcome_serializes_records_and_source() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("contacts.csv", "id,contact_email\n1,jane@x.com\n");
    let request = ProcessRequest::new("redact emails", "[X]");

    let outcome = process(&source, &request, OracleBinding::Offline);
    let json = serde_json::to_value(&outcome).expect("serialize outcome");

    assert_eq!(json["success"], true);
    assert!(json.get("error").is_none());
    assert_eq!(json["pattern_source"], "fallback");
    assert_eq!(json["original_data"][0]["id"], 1);
    assert_eq!(json["processed_data"][0]["contact_email"], "[X]");
    assert_eq!(json["replacement_stats"]["contact_email"], 1);
}

#[test]
fn compound_phone_words_select_phone_columns() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source(
        "phones.csv",
        "mobile_phone,notes\n555-123-4567,call 555-123-4567 after six\n",
    );
    let request = ProcessRequest::new("mask telephone numbers", "[P]");

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.target_columns, vec!["mobile_phone"]);
    assert_eq!(
        Some(outcome.regex_pattern.as_str()),
        category("phone").and_then(|c| c.pattern)
    );
    assert_eq!(
        shown(&outcome.processed_data, 0, "mobile_phone").as_deref(),
        Some("[P]")
    );
    assert_eq!(
        shown(&outcome.processed_data, 0, "notes").as_deref(),
        Some("call 555-123-4567 after six")
    );
}

#[test]
fn empty_matching_oracle_pattern_is_repaired() {
    let workspace = TestWorkspace::new();
    let source = workspace.csv_source("contacts.csv", "contact_email,notes\njane@x.com,hello\n");
    let oracle =
        ScriptedOracle::new(r#"{"target_columns":["notes"],"regex":"","explanation":"e"}"#);
    let request = ProcessRequest::new("redact emails", "[X]");

    let outcome = process(&source, &request, OracleBinding::Custom(&oracle));

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.pattern_source, Some(PatternSource::Repaired));
    assert_eq!(outcome.target_columns, vec!["notes"]);
    assert_eq!(outcome.regex_pattern, email_pattern());
    assert_eq!(outcome.replacement_stats.get("notes"), Some(&0));
    assert_eq!(
        shown(&outcome.processed_data, 0, "notes").as_deref(),
        Some("hello")
    );
}

#[test]
fn workbook_error_cell_only_blocks_its_own_column() {
    let source = TabularSource::from_path(fixture_path("people.xlsx")).expect("xlsx extension");
    let request = ProcessRequest::new("names, emails and notes", "[X]");

    let outcome = process(&source, &request, OracleBinding::Offline);

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.target_columns, vec!["name", "email", "notes"]);
    assert_eq!(outcome.replacement_stats.get("notes"), Some(&0));
    assert_eq!(
        shown(&outcome.processed_data, 0, "notes").as_deref(),
        Some("mail jane@x.com")
    );
    assert_eq!(
        shown(&outcome.processed_data, 1, "notes").as_deref(),
        Some("#DIV/0!")
    );
    assert_eq!(outcome.replacement_stats.get("email"), Some(&2));
    assert_eq!(
        shown(&outcome.processed_data, 1, "email").as_deref(),
        Some("[X]")
    );
}
