//! End-to-end pipeline scenarios driven through a scripted model client.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use csv_rewrite::llm::{ColumnSelection, ModelClient, TransformRule};
use csv_rewrite::normalize::{CleanTable, DEFAULT_MAX_BLANK_SCAN, normalize};
use csv_rewrite::rewrite::run_pipeline;
use csv_rewrite::sample::DEFAULT_SAMPLE_SIZE;

#[derive(Default)]
struct ScriptedClient {
    selection: Option<ColumnSelection>,
    rules: HashMap<String, TransformRule>,
    fail_selection: bool,
    fail_rules: bool,
}

impl ScriptedClient {
    fn selecting(columns: &[&str]) -> Self {
        Self {
            selection: Some(ColumnSelection {
                target_columns: columns.iter().map(|c| c.to_string()).collect(),
                confidence: 0.95,
                rationale: "scripted".to_string(),
            }),
            ..Self::default()
        }
    }

    fn with_rule(mut self, column: &str, pattern: &str, flags: &str, replacement: &str) -> Self {
        self.rules.insert(
            column.to_string(),
            TransformRule {
                pattern: pattern.to_string(),
                flags: flags.to_string(),
                replacement: replacement.to_string(),
                rationale: "scripted".to_string(),
                error: None,
            },
        );
        self
    }
}

impl ModelClient for ScriptedClient {
    fn select_columns(&self, _instruction: &str, _columns: &[String]) -> Result<ColumnSelection> {
        if self.fail_selection {
            return Err(anyhow!("scripted selection outage"));
        }
        Ok(self
            .selection
            .clone()
            .unwrap_or_else(ColumnSelection::fallback))
    }

    fn infer_rule(
        &self,
        _instruction: &str,
        column: &str,
        samples: &[String],
    ) -> Result<TransformRule> {
        assert!(
            samples.len() <= DEFAULT_SAMPLE_SIZE,
            "sampler leaked more than the cap"
        );
        if self.fail_rules {
            return Err(anyhow!("scripted rule outage"));
        }
        self.rules
            .get(column)
            .cloned()
            .ok_or_else(|| anyhow!("no scripted rule for column '{column}'"))
    }
}

fn contact_raw_table() -> Vec<Vec<String>> {
    let mut raw = vec![Vec::new(), Vec::new()];
    raw.push(vec!["Name".to_string(), "Email".to_string()]);
    raw.push(vec!["Alice".to_string(), "a@x.com".to_string()]);
    raw.push(vec!["Bob".to_string(), "b@x.com".to_string()]);
    raw
}

fn column(table: &CleanTable, name: &str) -> Vec<String> {
    let index = table.column_index(name).expect("column exists");
    table.rows.iter().map(|row| row[index].clone()).collect()
}

#[test]
fn redacts_emails_after_skipping_leading_blank_rows() {
    let mut table = normalize(contact_raw_table(), DEFAULT_MAX_BLANK_SCAN);
    assert_eq!(table.columns, vec!["Name", "Email"]);

    let client = ScriptedClient::selecting(&["Email"]).with_rule("Email", "@.*", "", "");
    let report = run_pipeline(&mut table, "redact emails", &client, DEFAULT_SAMPLE_SIZE);

    assert_eq!(column(&table, "Email"), vec!["a", "b"]);
    assert_eq!(column(&table, "Name"), vec!["Alice", "Bob"]);
    assert_eq!(report.match_stats["Email"], 2);
    assert_eq!(report.regex_info.target_columns, vec!["Email"]);
    assert!(report.regex_info.by_column["Email"].error.is_none());
}

#[test]
fn hallucinated_selection_leaves_table_unchanged() {
    let mut table = normalize(contact_raw_table(), DEFAULT_MAX_BLANK_SCAN);
    let before = table.clone();

    let client = ScriptedClient::selecting(&["Ghost"]);
    let report = run_pipeline(&mut table, "redact emails", &client, DEFAULT_SAMPLE_SIZE);

    assert_eq!(table, before);
    assert!(report.regex_info.target_columns.is_empty());
    assert!(report.regex_info.by_column.is_empty());
    assert!(report.match_stats.is_empty());
    // The raw call-A payload is preserved for auditing, ghost included.
    assert_eq!(report.regex_info.call_a.target_columns, vec!["Ghost"]);
}

#[test]
fn bad_pattern_is_isolated_to_its_own_column() {
    let mut table = normalize(contact_raw_table(), DEFAULT_MAX_BLANK_SCAN);

    let client = ScriptedClient::selecting(&["Name", "Email"])
        .with_rule("Name", "(unbalanced", "", "X")
        .with_rule("Email", "@.*", "", "");
    let report = run_pipeline(&mut table, "redact", &client, DEFAULT_SAMPLE_SIZE);

    // Name survives its broken rule untouched, Email still processes.
    assert_eq!(column(&table, "Name"), vec!["Alice", "Bob"]);
    assert_eq!(column(&table, "Email"), vec!["a", "b"]);
    assert_eq!(report.match_stats["Name"], 0);
    assert_eq!(report.match_stats["Email"], 2);
    let name_rule = &report.regex_info.by_column["Name"];
    assert!(name_rule.error.as_deref().unwrap().contains("Invalid pattern"));
}

#[test]
fn selection_outage_degrades_to_a_no_op() {
    let mut table = normalize(contact_raw_table(), DEFAULT_MAX_BLANK_SCAN);
    let before = table.clone();

    let client = ScriptedClient {
        fail_selection: true,
        ..ScriptedClient::default()
    };
    let report = run_pipeline(&mut table, "redact emails", &client, DEFAULT_SAMPLE_SIZE);

    assert_eq!(table, before);
    assert_eq!(report.regex_info.call_a, ColumnSelection::fallback());
    assert!(report.match_stats.is_empty());
}

#[test]
fn rule_outage_records_the_fallback_rule() {
    let mut table = normalize(contact_raw_table(), DEFAULT_MAX_BLANK_SCAN);
    let before = table.clone();

    let client = ScriptedClient {
        selection: ScriptedClient::selecting(&["Email"]).selection,
        fail_rules: true,
        ..ScriptedClient::default()
    };
    let report = run_pipeline(&mut table, "redact emails", &client, DEFAULT_SAMPLE_SIZE);

    assert_eq!(table, before);
    assert_eq!(report.match_stats["Email"], 0);
    assert_eq!(report.regex_info.by_column["Email"], TransformRule::fallback());
}

#[test]
fn case_insensitive_flag_reaches_the_matcher() {
    let raw = vec![
        vec!["Status".to_string()],
        vec!["SHIPPED".to_string()],
        vec!["shipped".to_string()],
        vec!["pending".to_string()],
    ];
    let mut table = normalize(raw, DEFAULT_MAX_BLANK_SCAN);

    let client = ScriptedClient::selecting(&["Status"]).with_rule("Status", "^shipped$", "i", "done");
    let report = run_pipeline(&mut table, "mark shipped as done", &client, DEFAULT_SAMPLE_SIZE);

    assert_eq!(column(&table, "Status"), vec!["done", "done", "pending"]);
    assert_eq!(report.match_stats["Status"], 2);
}

#[test]
fn report_serializes_both_metadata_blocks() {
    let mut table = normalize(contact_raw_table(), DEFAULT_MAX_BLANK_SCAN);
    let client = ScriptedClient::selecting(&["Email"]).with_rule("Email", "@.*", "", "");
    let report = run_pipeline(&mut table, "redact emails", &client, DEFAULT_SAMPLE_SIZE);

    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["regex_info"]["target_columns"][0], "Email");
    assert_eq!(json["regex_info"]["call_a"]["rationale"], "scripted");
    assert_eq!(json["match_stats"]["Email"], 2);
}
