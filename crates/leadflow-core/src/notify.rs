use std::sync::Arc;
use std::time::Duration;

use crate::effects::TransitionEvent;
use crate::error::{LeadflowError, Result};
use crate::types::Stage;

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Stage-change notification sink. Implementations must isolate their own
/// failures; the dispatcher logs and discards whatever they return.
pub trait Notifier: Send + Sync {
    fn notify_stage_change(&self, event: &TransitionEvent) -> Result<()>;
}

fn stage_label(stage: Option<Stage>) -> &'static str {
    stage.map(Stage::as_str).unwrap_or("(not in pipeline)")
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Default sink when no webhook is configured: the transition goes to the
/// log and nowhere else.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_stage_change(&self, event: &TransitionEvent) -> Result<()> {
        tracing::info!(
            lead = %event.lead_id,
            name = %event.lead_name,
            from = stage_label(event.from),
            to = event.to.as_str(),
            trigger = %event.trigger,
            "stage changed"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WebhookNotifier
// ---------------------------------------------------------------------------

/// POSTs a JSON payload to a configured URL.
///
/// The blocking client is created lazily on first use: notifications run on
/// the side-effect worker thread, never inside an async runtime, which is
/// the only context where a blocking reqwest client may be built.
pub struct WebhookNotifier {
    url: String,
    client: std::sync::OnceLock<reqwest::blocking::Client>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: std::sync::OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LeadflowError::Notify(e.to_string()))?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl Notifier for WebhookNotifier {
    fn notify_stage_change(&self, event: &TransitionEvent) -> Result<()> {
        let payload = serde_json::json!({
            "event": "stage_changed",
            "lead_id": event.lead_id,
            "lead_name": event.lead_name,
            "from": event.from.map(Stage::as_str),
            "to": event.to.as_str(),
            "trigger": event.trigger,
        });
        let response = self
            .client()?
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| LeadflowError::Notify(e.to_string()))?;
        if !response.status().is_success() {
            return Err(LeadflowError::Notify(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Build the configured sink: webhook when a URL is set, log-only otherwise.
pub fn from_config(cfg: &crate::config::NotifyConfig) -> Arc<dyn Notifier> {
    match &cfg.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    }
}

// ---------------------------------------------------------------------------
// FanoutNotifier
// ---------------------------------------------------------------------------

/// Delivers to every target; one failing channel does not stop the others.
/// Reports the first failure after all targets were tried.
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

impl Notifier for FanoutNotifier {
    fn notify_stage_change(&self, event: &TransitionEvent) -> Result<()> {
        let mut first_failure = None;
        for target in &self.targets {
            if let Err(e) = target.notify_stage_change(event) {
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
