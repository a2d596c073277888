use crate::output::print_json;
use leadflow_core::config::{Config, DATA_DIR};
use leadflow_core::db::Db;
use leadflow_core::error::LeadflowError;
use leadflow_core::io;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    io::ensure_dir(&root.join(DATA_DIR))?;

    let config = match Config::load(root) {
        Ok(config) => config,
        Err(LeadflowError::NotInitialized) => {
            let config = Config::default();
            config.save(root)?;
            config
        }
        Err(e) => return Err(e.into()),
    };

    // Opening creates the schema.
    let db_path = config.db_path(root);
    Db::open(&db_path)?;

    if json {
        print_json(&serde_json::json!({
            "root": root,
            "config": Config::config_path(root),
            "database": db_path,
        }))?;
    } else {
        println!("Initialized leadflow in {}", root.join(DATA_DIR).display());
        println!("Next: leadflow lead create \"Acme Corp\"");
    }
    Ok(())
}
