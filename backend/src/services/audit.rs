//! Fire-and-forget audit and notification sink.
//!
//! Once a financial mutation has committed, a failed audit entry or
//! notification must never fail the request. Every call here swallows its
//! error after logging it, so callers can invoke the sink unconditionally.

use shared::NotificationType;

use crate::database::Database;

pub struct AuditSink;

impl AuditSink {
    pub async fn log(
        database: &Database,
        user_id: Option<i64>,
        action: &str,
        details: serde_json::Value,
    ) {
        if let Err(e) = database.insert_audit_entry(user_id, action, details).await {
            tracing::warn!("Audit entry '{}' dropped: {}", action, e);
        }
    }

    pub async fn notify(
        database: &Database,
        user_id: i64,
        title: &str,
        message: &str,
        notif_type: NotificationType,
        link: &str,
    ) {
        if let Err(e) = database
            .insert_notification(user_id, title, message, notif_type.as_str(), link)
            .await
        {
            tracing::warn!("Notification '{}' for user {} dropped: {}", title, user_id, e);
        }
    }
}
