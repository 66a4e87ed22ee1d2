//! Outbound analytics event shape and the rules that build it.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::PropertiesMode;
use crate::payload::schema::{
    ACTOR_FIELDS, LABELS, ORGANIZATION_NAME, TEMPLATE_NAME, TEMPLATE_VERSION, USER_NAME,
    USER_USERNAME, WORKSPACE_NAME,
};
use crate::payload::PayloadSchema;
use crate::util::normalize_event_name;

use super::error::ForwardError;

/// Candidate `properties` keys and the root-relative fields they come from.
const PROPERTY_FIELDS: &[(&str, &str)] = &[
    ("workspace_name", WORKSPACE_NAME),
    ("template_name", TEMPLATE_NAME),
    ("template_version", TEMPLATE_VERSION),
    ("user_name", USER_NAME),
    ("username", USER_USERNAME),
    ("organization_name", ORGANIZATION_NAME),
    ("labels", LABELS),
];

/// Event body accepted by the analytics `events.track` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Event name as received from Coder
    pub name: String,
    /// Identity the event is attributed to
    pub email: String,
    /// Sender timestamp, or the relay's receive time
    pub timestamp: String,
    /// Context fields; never holds nulls
    pub properties: Map<String, Value>,
}

/// Which payload field identifies the person an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSource {
    /// Workspace-scoped events: the workspace owner
    Owner,
    /// User-account events: the affected user
    User,
}

impl EmailSource {
    pub fn for_event(event_name: &str) -> Option<Self> {
        let normalized = normalize_event_name(event_name);
        if normalized.contains("workspace") {
            Some(Self::Owner)
        } else if normalized.contains("user") || normalized.contains("account") {
            Some(Self::User)
        } else {
            None
        }
    }
}

/// Resolve the target email for an event, if one applies and is present.
pub fn resolve_email<'a>(
    schema: &PayloadSchema,
    doc: &'a Value,
    event_name: &str,
) -> Option<&'a str> {
    let email = match EmailSource::for_event(event_name)? {
        EmailSource::Owner => schema.owner_email(doc),
        EmailSource::User => schema.user_email(doc),
    }?;

    let email = email.trim();
    (!email.is_empty()).then_some(email)
}

/// Assemble the outbound `properties` object.
pub fn build_properties(
    schema: &PayloadSchema,
    mode: PropertiesMode,
    doc: &Value,
) -> Map<String, Value> {
    match mode {
        PropertiesMode::Fields => PROPERTY_FIELDS
            .iter()
            .filter_map(|(key, field)| {
                let value = strip_nulls(schema.field(doc, field)?.clone())?;
                Some((key.to_string(), value))
            })
            .collect(),
        PropertiesMode::Payload => {
            let Some(Value::Object(root)) = schema.root(doc) else {
                return Map::new();
            };
            root.iter()
                .filter(|(key, _)| !ACTOR_FIELDS.contains(&key.as_str()))
                .filter_map(|(key, value)| Some((key.clone(), strip_nulls(value.clone())?)))
                .collect()
        }
    }
}

/// Build the outbound event for a tracked payload.
pub fn build_event(
    schema: &PayloadSchema,
    mode: PropertiesMode,
    doc: &Value,
) -> Result<AnalyticsEvent, ForwardError> {
    let name = schema.event_name(doc).unwrap_or_default().to_string();

    let email = resolve_email(schema, doc, &name)
        .ok_or_else(|| ForwardError::MissingEmail {
            event_name: name.clone(),
        })?
        .to_string();

    // Coder does not send a timestamp; use receive time when absent.
    let timestamp = schema
        .timestamp(doc)
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    Ok(AnalyticsEvent {
        name,
        email,
        timestamp,
        properties: build_properties(schema, mode, doc),
    })
}

/// Drop nulls, including null members of nested objects.
fn strip_nulls(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| Some((k, strip_nulls(v)?)))
                .collect(),
        )),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SchemaVariant;
    use chrono::DateTime;
    use serde_json::json;

    fn nested() -> PayloadSchema {
        PayloadSchema::new(SchemaVariant::Nested)
    }

    fn workspace_payload() -> Value {
        json!({
            "_version": "1.1",
            "msg_id": "5d8f1c1e",
            "payload": {
                "notification_name": "Workspace Created",
                "user_id": "u-1",
                "user_email": "admin@example.com",
                "user_name": "Admin",
                "user_username": "admin",
                "labels": {
                    "name": "dev-box",
                    "template_name": "docker",
                    "template_version_name": "v3",
                    "initiator": null
                },
                "data": {
                    "owner_email": "owner@example.com",
                    "organization_name": null
                }
            }
        })
    }

    #[test]
    fn test_email_source_rules() {
        assert_eq!(EmailSource::for_event("Workspace Created"), Some(EmailSource::Owner));
        assert_eq!(EmailSource::for_event("User Account Suspended"), Some(EmailSource::User));
        assert_eq!(EmailSource::for_event("Your Account Activated"), Some(EmailSource::User));
        assert_eq!(EmailSource::for_event("Template Deleted"), None);
    }

    #[test]
    fn test_resolve_email_workspace_uses_owner() {
        let doc = workspace_payload();
        assert_eq!(
            resolve_email(&nested(), &doc, "Workspace Created"),
            Some("owner@example.com")
        );
    }

    #[test]
    fn test_resolve_email_user_event_uses_user_email() {
        let doc = json!({"payload": {"user_email": " member@example.com "}});
        assert_eq!(
            resolve_email(&nested(), &doc, "User Account Created"),
            Some("member@example.com")
        );
    }

    #[test]
    fn test_resolve_email_blank_is_unresolved() {
        let doc = json!({"payload": {"data": {"owner_email": "  "}}});
        assert_eq!(resolve_email(&nested(), &doc, "Workspace Created"), None);
    }

    #[test]
    fn test_build_event_fields_mode() {
        let doc = workspace_payload();
        let event = build_event(&nested(), PropertiesMode::Fields, &doc).unwrap();

        assert_eq!(event.name, "Workspace Created");
        assert_eq!(event.email, "owner@example.com");
        assert_eq!(event.properties["workspace_name"], "dev-box");
        assert_eq!(event.properties["template_name"], "docker");
        assert_eq!(event.properties["template_version"], "v3");
        assert_eq!(event.properties["username"], "admin");
        assert!(!event.properties.contains_key("organization_name"));
        assert_eq!(event.properties["labels"], json!({"name": "dev-box", "template_name": "docker", "template_version_name": "v3"}));
    }

    #[test]
    fn test_properties_never_contain_null() {
        let doc = workspace_payload();
        for mode in [PropertiesMode::Fields, PropertiesMode::Payload] {
            let props = build_properties(&nested(), mode, &doc);
            let rendered = serde_json::to_string(&props).unwrap();
            assert!(!rendered.contains("null"), "{mode}: {rendered}");
        }
    }

    #[test]
    fn test_payload_mode_redacts_actor_fields() {
        let doc = workspace_payload();
        let props = build_properties(&nested(), PropertiesMode::Payload, &doc);

        for field in ACTOR_FIELDS {
            assert!(!props.contains_key(*field), "{field} should be redacted");
        }
        assert_eq!(props["notification_name"], "Workspace Created");
        assert_eq!(props["data"], json!({"owner_email": "owner@example.com"}));
    }

    #[test]
    fn test_build_event_missing_email() {
        let doc = json!({"payload": {"notification_name": "Template Deleted"}});
        let err = build_event(&nested(), PropertiesMode::Fields, &doc).unwrap_err();
        assert!(matches!(err, ForwardError::MissingEmail { ref event_name } if event_name == "Template Deleted"));
    }

    #[test]
    fn test_timestamp_passthrough_and_synthesis() {
        let mut doc = workspace_payload();
        let event = build_event(&nested(), PropertiesMode::Fields, &doc).unwrap();
        assert!(DateTime::parse_from_rfc3339(&event.timestamp).is_ok());

        doc["payload"]["timestamp"] = json!("2024-05-01T12:00:00Z");
        let event = build_event(&nested(), PropertiesMode::Fields, &doc).unwrap();
        assert_eq!(event.timestamp, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn test_unusable_timestamp_is_replaced_with_now() {
        for bad in [json!(true), json!(""), json!("  "), json!({"at": 1}), json!([1])] {
            let mut doc = workspace_payload();
            doc["payload"]["timestamp"] = bad.clone();

            let event = build_event(&nested(), PropertiesMode::Fields, &doc).unwrap();
            assert!(
                DateTime::parse_from_rfc3339(&event.timestamp).is_ok(),
                "{bad} gave {:?}",
                event.timestamp
            );
        }
    }

    #[test]
    fn test_numeric_timestamp_passes_through() {
        let mut doc = workspace_payload();
        doc["payload"]["timestamp"] = json!(1714521600);
        let event = build_event(&nested(), PropertiesMode::Fields, &doc).unwrap();
        assert_eq!(event.timestamp, "1714521600");
    }

    #[test]
    fn test_flat_schema_event() {
        let schema = PayloadSchema::new(SchemaVariant::Flat);
        let doc = json!({
            "notification_name": "User Account Activated",
            "user_email": "new@example.com",
            "user_name": "New User"
        });
        let event = build_event(&schema, PropertiesMode::Fields, &doc).unwrap();
        assert_eq!(event.email, "new@example.com");
        assert_eq!(event.properties.len(), 1);
        assert_eq!(event.properties["user_name"], "New User");
    }
}
