//! Subcommand implementations

use crate::error::{CliError, CliResult};
use crate::flow_file::load_store;
use crate::OutputFormat;
use approval_condition::{Condition, Context, Limits, Value};
use approval_engine::{
    ApprovalRouter, EngineConfig, EntitySnapshotRegistry, FlowResolver, StaticSnapshotProvider,
    WorkflowEngine,
};
use approval_storage::{FlowStore, InMemoryApprovalStorage};
use approval_types::{Decision, Instance, UserId};
use chrono::{DateTime, Utc};
use serde_json::{json, Map};
use std::path::Path;
use std::sync::Arc;

/// Parse a JSON object given inline or as `@path`
pub fn parse_object(arg: Option<&str>) -> CliResult<Map<String, serde_json::Value>> {
    let Some(arg) = arg else {
        return Ok(Map::new());
    };
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => arg.to_string(),
    };
    match serde_json::from_str(&text)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(CliError::InvalidInput(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn print_json(value: &serde_json::Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── eval ─────────────────────────────────────────────────────────────

pub fn eval(
    expression: &str,
    context: Map<String, serde_json::Value>,
    limits: &Limits,
    format: OutputFormat,
) -> CliResult<()> {
    let condition = Condition::parse(expression, limits)?;
    let mut ctx = Context::new();
    for (name, value) in context {
        ctx.insert(name, Value::from(value));
    }
    let value = condition.evaluate(&ctx)?;
    let result = value.truthy();

    match format {
        OutputFormat::Text => println!("{}", result),
        OutputFormat::Json => print_json(&json!({
            "expression": condition.source(),
            "value": value.to_string(),
            "result": result,
            "paths": condition.expr().paths(),
        }))?,
    }
    Ok(())
}

// ── route ────────────────────────────────────────────────────────────

pub fn route(
    business_type: &str,
    payload: Map<String, serde_json::Value>,
    flows: Option<&Path>,
    format: OutputFormat,
) -> CliResult<()> {
    let store = Arc::new(load_store(flows)?);
    let router = ApprovalRouter::new(Arc::clone(&store));
    let resolver = FlowResolver::new(store);

    let routed = router.determine_approval_flow(business_type, &payload);
    let default = resolver.determine_approval_flow(business_type);
    let by_module = router.get_approval_flow(business_type).map(|f| f.flow_code);

    match format {
        OutputFormat::Text => {
            println!("route:   {}", routed.as_deref().unwrap_or("-"));
            println!("default: {}", default.unwrap_or("-"));
            if flows.is_some() {
                println!("module:  {}", by_module.as_deref().unwrap_or("-"));
            }
        }
        OutputFormat::Json => print_json(&json!({
            "business_type": business_type,
            "route": routed,
            "default": default,
            "module_flow": by_module,
        }))?,
    }
    Ok(())
}

// ── flows ────────────────────────────────────────────────────────────

pub fn flows(path: &Path, show: Option<&str>, format: OutputFormat) -> CliResult<()> {
    let store = Arc::new(load_store(Some(path))?);

    if let Some(identifier) = show {
        let flow = FlowResolver::new(store).get_approval_flow(identifier)?;
        match format {
            OutputFormat::Json => print_json(&serde_json::to_value(&flow)?)?,
            OutputFormat::Text => {
                println!(
                    "{} v{} ({}) module={} timeout={}h",
                    flow.flow_code,
                    flow.version,
                    flow.flow_name,
                    flow.module_name,
                    flow.timeout_hours(approval_types::DEFAULT_TIMEOUT_HOURS)
                );
                for node in flow.ordered_nodes() {
                    println!(
                        "  {:>4}  {:<16} {:<10} {}",
                        node.sequence,
                        node.node_code,
                        node.role_type,
                        node.gate().unwrap_or("(always)")
                    );
                }
            }
        }
        return Ok(());
    }

    let all = store.list_flows()?;
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&all)?)?,
        OutputFormat::Text => {
            for flow in &all {
                println!(
                    "{:<24} v{:<3} {:<8} {:<20} {} nodes",
                    flow.flow_code,
                    flow.version,
                    if flow.is_active { "active" } else { "inactive" },
                    flow.module_name,
                    flow.node_count()
                );
            }
        }
    }
    Ok(())
}

// ── expired ──────────────────────────────────────────────────────────

pub fn expired(
    instance_path: &Path,
    flows: Option<&Path>,
    at: Option<DateTime<Utc>>,
    config: EngineConfig,
    format: OutputFormat,
) -> CliResult<()> {
    let instance: Instance = serde_json::from_str(&std::fs::read_to_string(instance_path)?)?;
    let engine = WorkflowEngine::new(Arc::new(load_store(flows)?)).with_config(config);
    let now = at.unwrap_or_else(Utc::now);
    let expired = engine.is_expired_at(&instance, now);

    match format {
        OutputFormat::Text => println!("{}", expired),
        OutputFormat::Json => print_json(&json!({
            "instance_no": instance.instance_no,
            "status": instance.current_status,
            "due_date": instance.due_date,
            "checked_at": now,
            "expired": expired,
        }))?,
    }
    Ok(())
}

// ── simulate ─────────────────────────────────────────────────────────

/// One scripted action of a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Step {
    Approve,
    Reject,
    Withdraw,
}

/// Parameters of a simulated approval run
pub struct Simulation<'a> {
    pub flows: &'a Path,
    pub flow: &'a str,
    pub business_type: &'a str,
    pub business_id: &'a str,
    pub entity: Map<String, serde_json::Value>,
    pub form: Map<String, serde_json::Value>,
    pub submitter: UserId,
    pub approver: UserId,
    pub steps: &'a [Step],
}

pub fn simulate(sim: Simulation<'_>, config: EngineConfig, format: OutputFormat) -> CliResult<()> {
    let store: Arc<InMemoryApprovalStorage> = Arc::new(load_store(Some(sim.flows))?);
    let entities = EntitySnapshotRegistry::new().with_provider(
        sim.business_type,
        StaticSnapshotProvider::new().with_document(sim.business_id, sim.entity),
    );
    let engine = WorkflowEngine::new(store)
        .with_config(config)
        .with_entities(entities);

    let mut instance = engine.create_instance(
        sim.flow,
        sim.business_type,
        sim.business_id,
        sim.business_id,
        &sim.submitter,
        Some(sim.form),
    )?;
    let mut trace = vec![snapshot(&engine, &instance, "create")];

    for step in sim.steps {
        instance = match step {
            Step::Approve => {
                engine.submit_approval(&instance, &sim.approver, Decision::Approved, None)?
            }
            Step::Reject => {
                engine.submit_approval(&instance, &sim.approver, Decision::Rejected, None)?
            }
            Step::Withdraw => engine.withdraw(&instance, &sim.submitter)?,
        };
        let label = format!("{:?}", step).to_lowercase();
        trace.push(snapshot(&engine, &instance, &label));
    }

    match format {
        OutputFormat::Text => {
            for entry in &trace {
                println!(
                    "{:<9} {:<12} node={:<16} {}/{}",
                    entry["step"].as_str().unwrap_or_default(),
                    entry["status"].as_str().unwrap_or_default(),
                    entry["node"].as_str().unwrap_or("-"),
                    entry["completed_nodes"],
                    entry["total_nodes"],
                );
            }
        }
        OutputFormat::Json => print_json(&json!({
            "instance": instance,
            "trace": trace,
            "records": engine.records_for(&instance.id)?,
        }))?,
    }
    Ok(())
}

fn snapshot(engine: &WorkflowEngine, instance: &Instance, step: &str) -> serde_json::Value {
    json!({
        "step": step,
        "status": instance.current_status.as_str(),
        "node": engine.get_current_node(instance).map(|n| n.node_code.as_str()),
        "completed_nodes": instance.completed_nodes,
        "total_nodes": instance.total_nodes,
    })
}
