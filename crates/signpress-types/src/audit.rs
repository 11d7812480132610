//! Append-only audit trail for document lifecycle events

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Uploaded,
    Viewed,
    LinkSent,
    SignaturePlaced { page: u32 },
    SignedViaLink,
    Finalized { signatures: usize },
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub document_id: String,
    pub action: AuditAction,
    pub actor_email: Option<String>,
    pub detail: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

impl AuditEvent {
    /// Create a new audit event, stamped now.
    pub fn new(
        document_id: &str,
        action: AuditAction,
        actor_email: Option<&str>,
        detail: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            action,
            actor_email: actor_email.map(str::to_string),
            detail,
            ip_address: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }
}

/// Sink that lifecycle events are appended to.
///
/// The production implementation persists rows; `AuditTrail` is the
/// in-memory implementation used in tests and single-process setups.
pub trait EventSink {
    fn append(&mut self, event: AuditEvent);
}

/// In-memory append-only trail of events for one document.
///
/// Events are only ever pushed; the newest-first accessor mirrors how
/// the trail is displayed.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    events: Vec<AuditEvent>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in append order.
    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    /// Events newest first, as the audit timeline shows them.
    pub fn newest_first(&self) -> impl Iterator<Item = &AuditEvent> {
        self.events.iter().rev()
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize audit trail: {}", e))
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to deserialize audit trail: {}", e))
    }
}

impl EventSink for AuditTrail {
    fn append(&mut self, event: AuditEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut trail = AuditTrail::new();
        trail.append(AuditEvent::new("doc-1", AuditAction::Uploaded, None, None));
        trail.append(AuditEvent::new(
            "doc-1",
            AuditAction::SignaturePlaced { page: 2 },
            Some("signer@example.com"),
            Some("Signature placed on page 2".to_string()),
        ));
        trail.append(AuditEvent::new(
            "doc-1",
            AuditAction::Finalized { signatures: 1 },
            None,
            None,
        ));

        assert_eq!(trail.len(), 3);
        assert_eq!(trail.events()[0].action, AuditAction::Uploaded);
        assert_eq!(
            trail.events()[2].action,
            AuditAction::Finalized { signatures: 1 }
        );
    }

    #[test]
    fn test_newest_first_reverses_append_order() {
        let mut trail = AuditTrail::new();
        trail.append(AuditEvent::new("doc-1", AuditAction::Uploaded, None, None));
        trail.append(AuditEvent::new("doc-1", AuditAction::Viewed, None, None));

        let newest: Vec<_> = trail.newest_first().collect();
        assert_eq!(newest[0].action, AuditAction::Viewed);
        assert_eq!(newest[1].action, AuditAction::Uploaded);
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&AuditAction::LinkSent).unwrap();
        assert_eq!(json, "\"link_sent\"");

        let json = serde_json::to_string(&AuditAction::Finalized { signatures: 3 }).unwrap();
        assert!(json.contains("finalized"));
    }
}
