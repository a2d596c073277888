use crate::cmd::{open_engine, open_store, parse_id};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use leadflow_core::lead::Lead;
use leadflow_core::types::Stage;
use std::path::Path;

#[derive(Subcommand)]
pub enum LeadSubcommand {
    /// Intake a new lead
    Create {
        name: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// List all leads
    List,
    /// Show lead details
    Show { id: String },
    /// Manually override a lead's stage (always applies, unlike advance)
    SetStage {
        id: String,
        stage: String,
        /// Acting user recorded in the activity log
        #[arg(long, default_value = "cli")]
        actor: String,
    },
}

pub fn run(root: &Path, subcmd: LeadSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        LeadSubcommand::Create {
            name,
            company,
            assignee,
        } => create(root, name, company, assignee, json),
        LeadSubcommand::List => list(root, json),
        LeadSubcommand::Show { id } => show(root, &id, json),
        LeadSubcommand::SetStage { id, stage, actor } => set_stage(root, &id, &stage, &actor, json),
    }
}

fn stage_label(stage: Option<Stage>) -> String {
    match stage {
        Some(s) => s.to_string(),
        None => "(not in pipeline)".to_string(),
    }
}

fn create(
    root: &Path,
    name: String,
    company: Option<String>,
    assignee: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let (_config, db) = open_store(root)?;

    let mut lead = Lead::new(name);
    lead.company = company;
    lead.assignee = assignee;
    db.insert_lead(&lead)
        .with_context(|| format!("failed to create lead '{}'", lead.name))?;

    if json {
        print_json(&lead)?;
    } else {
        println!("Created lead: {} — {}", lead.id, lead.name);
        println!("Next: leadflow advance {} contacted", lead.id);
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_store(root)?;
    let leads = db.list_leads().context("failed to list leads")?;

    if json {
        print_json(&leads)?;
        return Ok(());
    }

    if leads.is_empty() {
        println!("No leads yet.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = leads
        .iter()
        .map(|l| {
            vec![
                l.id.to_string(),
                l.name.clone(),
                stage_label(l.stage),
                l.assignee.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "STAGE", "ASSIGNEE"], rows);
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_store(root)?;
    let id = parse_id(id)?;
    let lead = db
        .get_lead(id)?
        .ok_or_else(|| anyhow::anyhow!("lead '{id}' not found"))?;

    if json {
        print_json(&lead)?;
        return Ok(());
    }

    println!("Lead:     {} — {}", lead.id, lead.name);
    if let Some(ref company) = lead.company {
        println!("Company:  {company}");
    }
    println!("Stage:    {}", stage_label(lead.stage));
    if let Some(ref assignee) = lead.assignee {
        println!("Assignee: {assignee}");
    }
    if let Some(changed) = lead.stage_changed_at {
        println!("Changed:  {}", changed.format("%Y-%m-%d %H:%M"));
    }
    if let Some(contacted) = lead.last_contacted_at {
        println!("Contact:  {}", contacted.format("%Y-%m-%d %H:%M"));
    }
    println!("Created:  {}", lead.created_at.format("%Y-%m-%d %H:%M"));
    Ok(())
}

fn set_stage(root: &Path, id: &str, stage: &str, actor: &str, json: bool) -> anyhow::Result<()> {
    let (config, db) = open_store(root)?;
    let id = parse_id(id)?;
    let target: Stage = stage.parse()?;

    let engine = open_engine(&config, db)?;
    let previous = engine.set_stage(id, target, actor)?;
    engine.shutdown();

    if json {
        print_json(&serde_json::json!({
            "id": id,
            "stage": target.as_str(),
            "previous": previous.map(Stage::as_str),
        }))?;
    } else {
        println!("Stage set: {} → {}", stage_label(previous), target);
    }
    Ok(())
}
