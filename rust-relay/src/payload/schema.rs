//! Field layout of inbound webhook bodies.
//!
//! Coder has shipped more than one webhook body layout. The `nested` variant
//! keeps the notification under a top-level `payload` key:
//!
//! ```text
//! {"_version": "1.1", "msg_id": "...", "payload": {"notification_name": "...", ...}}
//! ```
//!
//! The `flat` variant carries the same fields at the document root. Every
//! path below is relative to that schema root.

use std::fmt;

use serde_json::Value;

use super::fields::{lookup, lookup_str, lookup_timestamp};

pub const EVENT_NAME: &str = "/notification_name";
pub const TIMESTAMP: &str = "/timestamp";
pub const USER_EMAIL: &str = "/user_email";
pub const OWNER_EMAIL: &str = "/data/owner_email";
pub const USER_NAME: &str = "/user_name";
pub const USER_USERNAME: &str = "/user_username";
pub const WORKSPACE_NAME: &str = "/labels/name";
pub const TEMPLATE_NAME: &str = "/labels/template_name";
pub const TEMPLATE_VERSION: &str = "/labels/template_version_name";
pub const ORGANIZATION_NAME: &str = "/data/organization_name";
pub const LABELS: &str = "/labels";

/// Actor identity members stripped when the whole payload is forwarded.
pub const ACTOR_FIELDS: &[&str] = &["user_id", "user_email", "user_name", "user_username"];

/// Which body layout the relay expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVariant {
    /// Fields under the top-level `payload` object
    #[default]
    Nested,
    /// Fields at the document root
    Flat,
}

impl SchemaVariant {
    /// Parse a variant name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "nested" => Some(Self::Nested),
            "flat" => Some(Self::Flat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nested => "nested",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path resolver for one schema variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadSchema {
    variant: SchemaVariant,
}

impl PayloadSchema {
    pub fn new(variant: SchemaVariant) -> Self {
        Self { variant }
    }

    /// The JSON pointer prefix of the schema root.
    fn prefix(&self) -> &'static str {
        match self.variant {
            SchemaVariant::Nested => "/payload",
            SchemaVariant::Flat => "",
        }
    }

    /// Full pointer for a root-relative field path.
    pub fn pointer(&self, field: &str) -> String {
        format!("{}{}", self.prefix(), field)
    }

    /// The object holding the notification fields, if present.
    pub fn root<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        match self.variant {
            SchemaVariant::Nested => lookup(doc, "/payload").filter(|v| v.is_object()),
            SchemaVariant::Flat => Some(doc).filter(|v| v.is_object()),
        }
    }

    /// Look up any root-relative field.
    pub fn field<'a>(&self, doc: &'a Value, field: &str) -> Option<&'a Value> {
        lookup(doc, &self.pointer(field))
    }

    pub fn str_field<'a>(&self, doc: &'a Value, field: &str) -> Option<&'a str> {
        lookup_str(doc, &self.pointer(field))
    }

    pub fn event_name<'a>(&self, doc: &'a Value) -> Option<&'a str> {
        self.str_field(doc, EVENT_NAME)
    }

    pub fn user_email<'a>(&self, doc: &'a Value) -> Option<&'a str> {
        self.str_field(doc, USER_EMAIL)
    }

    pub fn owner_email<'a>(&self, doc: &'a Value) -> Option<&'a str> {
        self.str_field(doc, OWNER_EMAIL)
    }

    /// Timestamp supplied by the sender, checked at the schema root first and
    /// then at the document root.
    pub fn timestamp(&self, doc: &Value) -> Option<String> {
        lookup_timestamp(doc, &self.pointer(TIMESTAMP))
            .or_else(|| lookup_timestamp(doc, TIMESTAMP))
    }
}
