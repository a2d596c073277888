use crate::cmd::{open_store, parse_id};
use crate::output::{print_json, print_table};
use std::path::Path;

pub fn run(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_store(root)?;
    let id = parse_id(id)?;
    let records = db.list_activity(id)?;

    if json {
        print_json(&records)?;
        return Ok(());
    }

    if records.is_empty() {
        println!("No activity yet.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|a| {
            vec![
                a.created_at.format("%Y-%m-%d %H:%M").to_string(),
                a.actor.clone(),
                a.action.clone(),
                a.metadata.to_string(),
            ]
        })
        .collect();
    print_table(&["TIME", "ACTOR", "ACTION", "DETAILS"], rows);
    Ok(())
}
