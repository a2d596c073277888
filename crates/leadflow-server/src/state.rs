use std::sync::Arc;

use leadflow_core::config::Config;
use leadflow_core::db::Db;
use leadflow_core::engine::Engine;
use leadflow_core::notify::{self, FanoutNotifier, Notifier};
use tokio::sync::broadcast;

use crate::notify::SseNotifier;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub engine: Arc<Engine>,
    pub config: Arc<Config>,
    pub event_tx: broadcast::Sender<String>,
}

impl AppState {
    /// Wire the engine's notifier fan-out: the configured sink (webhook or
    /// log) plus the SSE broadcast channel feeding `/api/events`.
    pub fn new(db: Arc<Db>, config: Config) -> anyhow::Result<Self> {
        let (event_tx, _) = broadcast::channel(64);

        let targets: Vec<Arc<dyn Notifier>> = vec![
            notify::from_config(&config.notify),
            Arc::new(SseNotifier::new(event_tx.clone())),
        ];
        let notifier = Arc::new(FanoutNotifier::new(targets));

        let engine = Arc::new(Engine::new(
            Arc::clone(&db),
            config.followups.clone(),
            notifier,
        )?);

        Ok(Self {
            db,
            engine,
            config: Arc::new(config),
            event_tx,
        })
    }
}
