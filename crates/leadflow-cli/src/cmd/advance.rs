use crate::cmd::{open_engine, open_store, parse_id};
use crate::output::print_json;
use leadflow_core::engine::Outcome;
use leadflow_core::types::Stage;
use std::path::Path;

pub fn run(root: &Path, id: &str, stage: &str, trigger: &str, json: bool) -> anyhow::Result<()> {
    let (config, db) = open_store(root)?;
    let id = parse_id(id)?;
    let target: Stage = stage.parse()?;

    let engine = open_engine(&config, db)?;
    let outcome = engine.advance(id, target, trigger)?;
    // Drain notification + reminder scheduling before the process exits.
    engine.shutdown();

    if json {
        let body = match &outcome {
            Outcome::Advanced { from, to } => serde_json::json!({
                "advanced": true,
                "from": from.map(Stage::as_str),
                "to": to.as_str(),
            }),
            Outcome::Rejected { current, target } => serde_json::json!({
                "advanced": false,
                "current": current.map(Stage::as_str),
                "target": target.as_str(),
            }),
            Outcome::NotFound => serde_json::json!({ "advanced": false, "found": false }),
        };
        print_json(&body)?;
        return Ok(());
    }

    match outcome {
        Outcome::Advanced { from, to } => {
            let from = from
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(not in pipeline)".to_string());
            println!("Advanced: {from} → {to}");
        }
        Outcome::Rejected { current, target } => {
            let current = current
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(not in pipeline)".to_string());
            println!("No-op: lead is at {current}; {target} is not forward of it");
        }
        Outcome::NotFound => {
            println!("No-op: lead '{id}' not found");
        }
    }
    Ok(())
}
