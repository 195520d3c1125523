//! Channel-specific payload construction.
//!
//! Each builder turns a [`NotificationContext`] plus a [`ChannelConfig`]
//! into an [`OutboundMessage`] for its provider's wire format. A builder
//! returns `None` (after a warning) when the channel is missing required
//! configuration; bad channel config never fails a dispatch.

use serde_json::{Value, json};
use tracing::warn;

use vigil_alerts::{Alert, ChannelConfig, ChannelKind, Severity};
use vigil_incidents::Incident;

use crate::transport::OutboundMessage;

/// PagerDuty Events v2 enqueue endpoint.
pub const PAGERDUTY_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

/// Maximum description length carried in an SMS body.
pub const SMS_DESCRIPTION_LIMIT: usize = 100;

/// Everything a payload builder needs to render a notification.
#[derive(Debug, Clone)]
pub struct NotificationContext {
    /// The alert being notified.
    pub alert: Alert,
    /// The incident the alert was correlated into, if any.
    pub incident: Option<Incident>,
    /// The service name stamped into payloads.
    pub service: String,
    /// The deployment environment stamped into payloads.
    pub environment: String,
    /// Notification time, epoch milliseconds.
    pub timestamp: i64,
}

/// Maps a severity to the attachment colour used by chat providers.
#[must_use]
pub const fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "#dc3545",
        Severity::Error => "#fd7e14",
        Severity::Warning => "#ffc107",
        Severity::Info => "#0d6efd",
    }
}

/// Builds the message for a channel, dispatching on its kind.
///
/// Returns `None` when required configuration is missing.
#[must_use]
pub fn build_message(channel: &ChannelConfig, ctx: &NotificationContext) -> Option<OutboundMessage> {
    match channel.kind {
        ChannelKind::Slack => slack_message(channel, ctx),
        ChannelKind::Email => email_message(channel, ctx),
        ChannelKind::Sms => sms_message(channel, ctx),
        ChannelKind::Webhook => webhook_message(channel, ctx),
        ChannelKind::Pagerduty => pagerduty_message(channel, ctx),
    }
}

fn iso_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

fn skip_missing(channel: &ChannelConfig, alert: &Alert, key: &str) {
    warn!(
        kind = %channel.kind,
        alert_id = %alert.id,
        missing = key,
        "notification channel missing required config, skipping"
    );
}

/// Slack incoming-webhook attachment payload.
///
/// The destination is the `webhook_url` when configured; otherwise a
/// `slack:{channel}` logical destination the transport resolves itself.
#[must_use]
pub fn slack_message(channel: &ChannelConfig, ctx: &NotificationContext) -> Option<OutboundMessage> {
    let destination = match (channel.config_str("webhook_url"), channel.config_str("channel")) {
        (Some(url), _) => url.to_string(),
        (None, Some(name)) => format!("slack:{name}"),
        (None, None) => {
            skip_missing(channel, &ctx.alert, "webhook_url");
            return None;
        }
    };

    let alert = &ctx.alert;
    let mut fields = vec![
        json!({ "title": "Severity", "value": alert.severity.as_str(), "short": true }),
        json!({ "title": "Category", "value": alert.category.as_str(), "short": true }),
        json!({ "title": "Source", "value": alert.source, "short": true }),
        json!({ "title": "Time", "value": iso_timestamp(alert.timestamp), "short": true }),
    ];
    if let Some(incident) = &ctx.incident {
        fields.push(json!({ "title": "Incident", "value": incident.id, "short": true }));
        fields.push(json!({
            "title": "Incident Status",
            "value": incident.status.as_str(),
            "short": true,
        }));
    }

    let mut body = json!({
        "attachments": [{
            "color": severity_color(alert.severity),
            "title": alert.title,
            "text": alert.description,
            "fields": fields,
            "footer": format!("{} · {}", ctx.service, ctx.environment),
            "ts": alert.timestamp / 1000,
        }],
    });
    if let Some(slack_channel) = channel.config_str("channel") {
        body["channel"] = Value::String(slack_channel.to_string());
    }

    Some(OutboundMessage::new(destination, body))
}

/// Plain-text email payload.
#[must_use]
pub fn email_message(channel: &ChannelConfig, ctx: &NotificationContext) -> Option<OutboundMessage> {
    let recipients = channel.config_str_list("recipients");
    if recipients.is_empty() {
        skip_missing(channel, &ctx.alert, "recipients");
        return None;
    }

    let alert = &ctx.alert;
    let mut text = format!(
        "Alert: {}\nSeverity: {}\nCategory: {}\nSource: {}\nTime: {}\n\n{}\n",
        alert.title,
        alert.severity,
        alert.category,
        alert.source,
        iso_timestamp(alert.timestamp),
        alert.description,
    );
    if let Some(incident) = &ctx.incident {
        text.push_str(&format!(
            "\nIncident: {} ({})\n",
            incident.id, incident.status
        ));
    }
    text.push_str(&format!("\n-- {} / {}\n", ctx.service, ctx.environment));

    let body = json!({
        "to": recipients,
        "subject": format!("[{}] {}", alert.severity.as_str().to_uppercase(), alert.title),
        "body": text,
    });

    Some(OutboundMessage::new(recipients.join(","), body))
}

/// Single-line SMS payload with a capped description.
#[must_use]
pub fn sms_message(channel: &ChannelConfig, ctx: &NotificationContext) -> Option<OutboundMessage> {
    let numbers = channel.config_str_list("phone_numbers");
    if numbers.is_empty() {
        skip_missing(channel, &ctx.alert, "phone_numbers");
        return None;
    }

    let alert = &ctx.alert;
    let description: String = alert.description.chars().take(SMS_DESCRIPTION_LIMIT).collect();
    let message = format!(
        "[{}] {}: {}",
        alert.severity.as_str().to_uppercase(),
        alert.title,
        description,
    );

    let body = json!({ "to": numbers, "message": message });
    Some(OutboundMessage::new(numbers.join(","), body))
}

/// Generic JSON webhook envelope.
#[must_use]
pub fn webhook_message(
    channel: &ChannelConfig,
    ctx: &NotificationContext,
) -> Option<OutboundMessage> {
    let Some(url) = channel.config_str("url") else {
        skip_missing(channel, &ctx.alert, "url");
        return None;
    };

    let body = json!({
        "type": "alert",
        "alert": ctx.alert,
        "incident": ctx.incident,
        "service": ctx.service,
        "environment": ctx.environment,
        "timestamp": ctx.timestamp,
    });

    let mut message = OutboundMessage::new(url, body);
    if let Some(headers) = channel.config.get("headers").and_then(Value::as_object) {
        for (key, value) in headers {
            if let Some(value) = value.as_str() {
                message = message.header(key.clone(), value);
            }
        }
    }

    Some(message)
}

/// PagerDuty Events v2 trigger payload.
///
/// Severities map one to one; `dedup_key` is the alert id so repeated
/// notifications of the same alert collapse on the PagerDuty side.
#[must_use]
pub fn pagerduty_message(
    channel: &ChannelConfig,
    ctx: &NotificationContext,
) -> Option<OutboundMessage> {
    let Some(routing_key) = channel.config_str("routing_key") else {
        skip_missing(channel, &ctx.alert, "routing_key");
        return None;
    };

    let alert = &ctx.alert;
    let mut details = json!({
        "alert_id": alert.id,
        "description": alert.description,
        "category": alert.category.as_str(),
        "metadata": alert.metadata,
        "service": ctx.service,
        "environment": ctx.environment,
    });
    if let Some(incident) = &ctx.incident {
        details["incident_id"] = Value::String(incident.id.clone());
    }

    let body = json!({
        "routing_key": routing_key,
        "event_action": "trigger",
        "dedup_key": alert.id,
        "payload": {
            "summary": alert.title,
            "source": alert.source,
            "severity": alert.severity.as_str(),
            "timestamp": iso_timestamp(alert.timestamp),
            "custom_details": details,
        },
    });

    Some(OutboundMessage::new(PAGERDUTY_EVENTS_URL, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_alerts::AlertCategory;

    fn context() -> NotificationContext {
        NotificationContext {
            alert: Alert::manual(
                "High latency",
                "API latency above SLO",
                Severity::Critical,
                AlertCategory::ApiPerformance,
                1_700_000_000_000,
            ),
            incident: None,
            service: "vigil".to_string(),
            environment: "production".to_string(),
            timestamp: 1_700_000_000_000,
        }
    }

    mod slack_tests {
        use super::*;

        #[test]
        fn builds_attachment_with_color() {
            let channel =
                ChannelConfig::new(ChannelKind::Slack).option("webhook_url", json!("https://hooks.example"));
            let message = slack_message(&channel, &context()).unwrap();

            assert_eq!(message.destination, "https://hooks.example");
            let color = message.body["attachments"][0]["color"].as_str().unwrap();
            assert_eq!(color, "#dc3545");
        }

        #[test]
        fn unconfigured_channel_skips() {
            let channel = ChannelConfig::new(ChannelKind::Slack);
            assert!(slack_message(&channel, &context()).is_none());
        }

        #[test]
        fn channel_name_fallback_destination() {
            let channel = ChannelConfig::slack("#alerts");
            let message = slack_message(&channel, &context()).unwrap();
            assert_eq!(message.destination, "slack:#alerts");
            assert_eq!(message.body["channel"].as_str().unwrap(), "#alerts");
        }

        #[test]
        fn incident_fields_included() {
            let channel =
                ChannelConfig::new(ChannelKind::Slack).option("webhook_url", json!("https://hooks.example"));
            let mut ctx = context();
            let incident = Incident::from_alert(&ctx.alert, 1_700_000_000_000);
            ctx.incident = Some(incident.clone());

            let message = slack_message(&channel, &ctx).unwrap();
            let fields = message.body["attachments"][0]["fields"].as_array().unwrap();
            assert!(
                fields
                    .iter()
                    .any(|f| f["value"].as_str() == Some(incident.id.as_str()))
            );
        }
    }

    mod email_tests {
        use super::*;

        #[test]
        fn builds_subject_and_body() {
            let channel = ChannelConfig::new(ChannelKind::Email)
                .option("recipients", json!(["ops@example.com"]));
            let message = email_message(&channel, &context()).unwrap();

            assert_eq!(
                message.body["subject"].as_str().unwrap(),
                "[CRITICAL] High latency"
            );
            assert!(message.body["body"].as_str().unwrap().contains("API latency"));
        }

        #[test]
        fn no_recipients_skips() {
            let channel = ChannelConfig::new(ChannelKind::Email);
            assert!(email_message(&channel, &context()).is_none());
        }
    }

    mod sms_tests {
        use super::*;

        #[test]
        fn caps_description() {
            let channel =
                ChannelConfig::new(ChannelKind::Sms).option("phone_numbers", json!(["+15551234"]));
            let mut ctx = context();
            ctx.alert.description = "x".repeat(500);

            let message = sms_message(&channel, &ctx).unwrap();
            let text = message.body["message"].as_str().unwrap();
            assert!(text.starts_with("[CRITICAL] High latency: "));
            assert!(text.len() < 200);
        }

        #[test]
        fn no_numbers_skips() {
            let channel = ChannelConfig::new(ChannelKind::Sms);
            assert!(sms_message(&channel, &context()).is_none());
        }
    }

    mod webhook_tests {
        use super::*;

        #[test]
        fn envelope_shape() {
            let channel =
                ChannelConfig::new(ChannelKind::Webhook).option("url", json!("https://example.com/hook"));
            let message = webhook_message(&channel, &context()).unwrap();

            assert_eq!(message.body["type"].as_str().unwrap(), "alert");
            assert_eq!(message.body["service"].as_str().unwrap(), "vigil");
            assert!(message.body["alert"]["id"].is_string());
        }

        #[test]
        fn custom_headers_carried() {
            let channel = ChannelConfig::new(ChannelKind::Webhook)
                .option("url", json!("https://example.com/hook"))
                .option("headers", json!({ "x-token": "abc" }));
            let message = webhook_message(&channel, &context()).unwrap();
            assert_eq!(
                message.headers.get("x-token").map(String::as_str),
                Some("abc")
            );
        }
    }

    mod pagerduty_tests {
        use super::*;

        #[test]
        fn events_v2_shape() {
            let channel =
                ChannelConfig::new(ChannelKind::Pagerduty).option("routing_key", json!("rk-123"));
            let ctx = context();
            let message = pagerduty_message(&channel, &ctx).unwrap();

            assert_eq!(message.destination, PAGERDUTY_EVENTS_URL);
            assert_eq!(message.body["event_action"].as_str().unwrap(), "trigger");
            assert_eq!(
                message.body["dedup_key"].as_str().unwrap(),
                ctx.alert.id.as_str()
            );
            assert_eq!(
                message.body["payload"]["severity"].as_str().unwrap(),
                "critical"
            );
            let details = &message.body["payload"]["custom_details"];
            assert_eq!(
                details["alert_id"].as_str().unwrap(),
                ctx.alert.id.as_str()
            );
            assert!(details["incident_id"].is_null());
        }

        #[test]
        fn incident_id_carried_in_details() {
            let channel =
                ChannelConfig::new(ChannelKind::Pagerduty).option("routing_key", json!("rk-123"));
            let mut ctx = context();
            let incident = Incident::from_alert(&ctx.alert, 1_700_000_000_000);
            ctx.incident = Some(incident.clone());

            let message = pagerduty_message(&channel, &ctx).unwrap();
            let details = &message.body["payload"]["custom_details"];
            assert_eq!(
                details["incident_id"].as_str().unwrap(),
                incident.id.as_str()
            );
        }

        #[test]
        fn missing_routing_key_skips() {
            let channel = ChannelConfig::new(ChannelKind::Pagerduty);
            assert!(pagerduty_message(&channel, &context()).is_none());
        }
    }

    #[test]
    fn severity_colors() {
        assert_eq!(severity_color(Severity::Critical), "#dc3545");
        assert_eq!(severity_color(Severity::Error), "#fd7e14");
        assert_eq!(severity_color(Severity::Warning), "#ffc107");
        assert_eq!(severity_color(Severity::Info), "#0d6efd");
    }
}
