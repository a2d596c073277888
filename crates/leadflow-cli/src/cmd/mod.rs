pub mod activity;
pub mod advance;
pub mod init;
pub mod lead;
pub mod reminder;
pub mod serve;

use anyhow::{anyhow, Context};
use leadflow_core::config::Config;
use leadflow_core::db::Db;
use leadflow_core::engine::Engine;
use leadflow_core::notify;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Load the config and open the database under `root`.
pub fn open_store(root: &Path) -> anyhow::Result<(Config, Arc<Db>)> {
    let config = Config::load(root)?;
    let db = Arc::new(Db::open(&config.db_path(root)).context("failed to open database")?);
    Ok((config, db))
}

/// Build an engine over the store with the configured notifier. Callers must
/// `shutdown()` the engine before exiting so queued side effects drain.
pub fn open_engine(config: &Config, db: Arc<Db>) -> anyhow::Result<Engine> {
    let notifier = notify::from_config(&config.notify);
    let engine = Engine::new(db, config.followups.clone(), notifier)?;
    Ok(engine)
}

pub fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| anyhow!("invalid lead id '{id}'"))
}
