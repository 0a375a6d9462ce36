//! End-to-end tests for the approvalctl binary

use approval_types::{Flow, Instance, Node, UserId};
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

const FLOWS: &str = r#"
[[flows]]
flow_code = "ECN_FLOW"
flow_name = "Engineering change"
module_name = "ECN"
first_node_timeout = 24

[[flows.nodes]]
node_code = "review"
node_name = "Engineering review"
sequence = 1

[[flows.nodes]]
node_code = "director"
node_name = "Director sign-off"
sequence = 2
condition_expression = "entity.estimated_cost > 10000"

[[flows.nodes]]
node_code = "archive"
node_name = "Document control"
sequence = 3
"#;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("approvalctl-{}-{}", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

fn approvalctl() -> Command {
    let mut cmd = Command::cargo_bin("approvalctl").unwrap();
    cmd.env_remove("APPROVAL_CONFIG").env_remove("RUST_LOG");
    cmd
}

// ── eval ─────────────────────────────────────────────────────────────

#[test]
fn eval_reads_nested_context() {
    approvalctl()
        .args([
            "eval",
            "entity.estimated_cost > 10000 && form.urgent",
            "--context",
            r#"{"entity": {"estimated_cost": "25000"}, "form": {"urgent": true}}"#,
        ])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn eval_missing_field_is_falsy() {
    approvalctl()
        .args(["eval", "entity.missing == 1"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn eval_json_lists_paths() {
    approvalctl()
        .args(["--output", "json", "eval", "a.b >= 2 || c"])
        .args(["--context", r#"{"a": {"b": 3}}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"result\": true"))
        .stdout(predicate::str::contains("\"a.b\""))
        .stdout(predicate::str::contains("\"c\""));
}

#[test]
fn eval_rejects_malformed_expression() {
    approvalctl()
        .args(["eval", "((a > 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Condition"));
}

#[test]
fn eval_honours_configured_length_limit() {
    let config = write_temp("limits.toml", "[condition]\nmax_expression_len = 8\n");
    approvalctl()
        .arg("--config")
        .arg(&config)
        .args(["eval", "amount > 100000"])
        .assert()
        .failure();
}

// ── route ────────────────────────────────────────────────────────────

#[test]
fn route_splits_sales_invoices_by_amount() {
    approvalctl()
        .args(["route", "SALES_INVOICE", "--payload", r#"{"amount": 50000}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("route:   SALES_INVOICE_MULTI"))
        .stdout(predicate::str::contains("default: SALES_INVOICE_FLOW"));

    approvalctl()
        .args(["route", "SALES_INVOICE", "--payload", r#"{"amount": "49999.99"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("route:   SALES_INVOICE_SINGLE"));
}

#[test]
fn route_unknown_type_has_no_flow() {
    approvalctl()
        .args(["route", "TIMESHEET"])
        .assert()
        .success()
        .stdout(predicate::str::contains("route:   -"))
        .stdout(predicate::str::contains("default: -"));
}

// ── flows ────────────────────────────────────────────────────────────

#[test]
fn flows_lists_and_shows_nodes() {
    let flows = write_temp("list.toml", FLOWS);
    approvalctl()
        .arg("flows")
        .arg("--file")
        .arg(&flows)
        .assert()
        .success()
        .stdout(predicate::str::contains("ECN_FLOW"))
        .stdout(predicate::str::contains("3 nodes"));

    approvalctl()
        .arg("flows")
        .arg("--file")
        .arg(&flows)
        .args(["--show", "ECN"])
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout=24h"))
        .stdout(predicate::str::contains("entity.estimated_cost > 10000"))
        .stdout(predicate::str::contains("(always)"));
}

#[test]
fn flows_show_unknown_code_fails() {
    let flows = write_temp("unknown.toml", FLOWS);
    approvalctl()
        .arg("flows")
        .arg("--file")
        .arg(&flows)
        .args(["--show", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOPE"));
}

#[test]
fn flows_rejects_duplicate_sequences() {
    let broken = FLOWS.replace("sequence = 3", "sequence = 2");
    let flows = write_temp("dup.toml", &broken);
    approvalctl()
        .arg("flows")
        .arg("--file")
        .arg(&flows)
        .assert()
        .failure();
}

// ── expired ──────────────────────────────────────────────────────────

#[test]
fn expired_compares_due_date() {
    let flow = Flow::new("ECN_FLOW", "Engineering change", "ECN")
        .with_node(Node::new("review", "Review", 1))
        .unwrap();
    let instance = Instance::new(
        "AP-TEST".to_string(),
        &flow,
        "ECN",
        "ecn-1",
        "Bracket change",
        UserId::new("alice"),
        24,
    );
    let path = write_temp("instance.json", &serde_json::to_string(&instance).unwrap());

    approvalctl()
        .arg("expired")
        .arg("--instance")
        .arg(&path)
        .assert()
        .success()
        .stdout("false\n");

    approvalctl()
        .arg("expired")
        .arg("--instance")
        .arg(&path)
        .args(["--at", "2999-01-01T00:00:00Z"])
        .assert()
        .success()
        .stdout("true\n");
}

// ── simulate ─────────────────────────────────────────────────────────

#[test]
fn simulate_skips_gated_node_for_cheap_change() {
    let flows = write_temp("cheap.toml", FLOWS);
    approvalctl()
        .arg("simulate")
        .arg("--flows")
        .arg(&flows)
        .args(["--flow", "ECN_FLOW", "--business-type", "ECN"])
        .args(["--entity", r#"{"estimated_cost": 5000}"#])
        .args(["--step", "approve", "--step", "approve"])
        .assert()
        .success()
        .stdout(predicate::str::contains("node=archive"))
        .stdout(predicate::str::contains("node=director").not())
        .stdout(predicate::str::contains("APPROVED"));
}

#[test]
fn simulate_visits_gated_node_for_expensive_change() {
    let flows = write_temp("expensive.toml", FLOWS);
    approvalctl()
        .arg("simulate")
        .arg("--flows")
        .arg(&flows)
        .args(["--flow", "ECN_FLOW", "--business-type", "ECN"])
        .args(["--entity", r#"{"estimated_cost": 25000}"#])
        .args(["--step", "approve", "--step", "reject"])
        .assert()
        .success()
        .stdout(predicate::str::contains("node=director"))
        .stdout(predicate::str::contains("REJECTED"));
}

#[test]
fn simulate_stops_on_decision_after_terminal() {
    let flows = write_temp("terminal.toml", FLOWS);
    approvalctl()
        .arg("simulate")
        .arg("--flows")
        .arg(&flows)
        .args(["--flow", "ECN_FLOW"])
        .args(["--step", "withdraw", "--step", "approve"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NoActiveNode"));
}

// ── config ───────────────────────────────────────────────────────────

#[test]
fn config_prints_defaults() {
    approvalctl()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("default_timeout_hours = 48"))
        .stdout(predicate::str::contains("instance_no_prefix = \"AP\""));
}
