use crate::cmd::{open_store, parse_id};
use crate::output::{print_json, print_table};
use chrono::Utc;
use clap::Subcommand;
use leadflow_core::reminder::Reminder;
use std::path::Path;

#[derive(Subcommand)]
pub enum ReminderSubcommand {
    /// List reminders: the due queue by default, or everything for one lead
    List {
        /// Show all reminders for this lead instead of the due queue
        #[arg(long)]
        lead: Option<String>,
    },
    /// Dismiss a reminder
    Dismiss { id: String },
    /// Mark a reminder as sent
    Sent { id: String },
}

pub fn run(root: &Path, subcmd: ReminderSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ReminderSubcommand::List { lead } => list(root, lead.as_deref(), json),
        ReminderSubcommand::Dismiss { id } => dismiss(root, &id, json),
        ReminderSubcommand::Sent { id } => sent(root, &id, json),
    }
}

fn list(root: &Path, lead: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_store(root)?;
    let reminders: Vec<Reminder> = match lead {
        Some(lead) => db.list_reminders_for(parse_id(lead)?)?,
        None => db.list_due_reminders(Utc::now())?,
    };

    if json {
        print_json(&reminders)?;
        return Ok(());
    }

    if reminders.is_empty() {
        match lead {
            Some(_) => println!("No reminders for this lead."),
            None => println!("Nothing due."),
        }
        return Ok(());
    }

    let rows: Vec<Vec<String>> = reminders
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.lead_id.to_string(),
                r.due_at.format("%Y-%m-%d").to_string(),
                r.status.to_string(),
                r.assignee.clone().unwrap_or_default(),
                r.reason.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "LEAD", "DUE", "STATUS", "ASSIGNEE", "REASON"], rows);
    Ok(())
}

fn dismiss(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_store(root)?;
    let id = parse_id(id)?;
    db.dismiss_reminder(id)?;
    if json {
        print_json(&serde_json::json!({ "id": id, "status": "dismissed" }))?;
    } else {
        println!("Dismissed reminder {id}");
    }
    Ok(())
}

fn sent(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_config, db) = open_store(root)?;
    let id = parse_id(id)?;
    db.mark_reminder_sent(id)?;
    if json {
        print_json(&serde_json::json!({ "id": id, "status": "sent" }))?;
    } else {
        println!("Marked reminder {id} as sent");
    }
    Ok(())
}
