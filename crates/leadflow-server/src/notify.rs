use leadflow_core::effects::TransitionEvent;
use leadflow_core::notify::Notifier;
use leadflow_core::types::Stage;
use tokio::sync::broadcast;

/// Bridges engine transitions onto the broadcast channel behind
/// `/api/events`. Send is non-blocking and having no subscribers is not a
/// failure, so this sink never errors.
pub struct SseNotifier {
    tx: broadcast::Sender<String>,
}

impl SseNotifier {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Notifier for SseNotifier {
    fn notify_stage_change(&self, event: &TransitionEvent) -> leadflow_core::Result<()> {
        let payload = serde_json::json!({
            "lead_id": event.lead_id,
            "lead_name": event.lead_name,
            "from": event.from.map(Stage::as_str),
            "to": event.to.as_str(),
            "trigger": event.trigger,
        });
        let _ = self.tx.send(payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn subscribers_receive_the_payload() {
        let (tx, mut rx) = broadcast::channel(8);
        let notifier = SseNotifier::new(tx);
        let event = TransitionEvent {
            lead_id: Uuid::new_v4(),
            lead_name: "Acme".to_string(),
            from: None,
            to: Stage::Contacted,
            assignee: None,
            trigger: "t".to_string(),
        };
        notifier.notify_stage_change(&event).unwrap();

        let payload = rx.try_recv().unwrap();
        let json: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(json["to"], "contacted");
        assert_eq!(json["from"], serde_json::Value::Null);
    }

    #[test]
    fn no_subscribers_is_not_an_error() {
        let (tx, _) = broadcast::channel(8);
        let notifier = SseNotifier::new(tx);
        let event = TransitionEvent {
            lead_id: Uuid::new_v4(),
            lead_name: "Acme".to_string(),
            from: Some(Stage::Contacted),
            to: Stage::ProposalSent,
            assignee: None,
            trigger: "t".to_string(),
        };
        assert!(notifier.notify_stage_change(&event).is_ok());
    }
}
