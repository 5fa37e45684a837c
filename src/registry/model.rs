//! Records shared between the watch list store, the live unit provider, and the
//! reconciled view served over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for operator metadata that was never supplied, so the merged view
/// always carries a printable value.
pub const UNSET_METADATA: &str = "/";

/// Category discriminator for everything the registry handles. The two kinds keep
/// separate watch lists and never share identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Service,
    Task,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Task => "task",
        }
    }

    /// File name of the persisted watch list document for this kind.
    pub fn document_name(self) -> &'static str {
        match self {
            Self::Service => "services.json",
            Self::Task => "tasks.json",
        }
    }
}

/// One persisted watch list record. Field names match the on-disk document format,
/// which is also the request body format for add operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    #[serde(rename = "Identity")]
    pub identity: String,
    #[serde(rename = "Port", default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WatchEntry {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            port: None,
            description: None,
        }
    }

    /// Identity comparison is case-insensitive and whitespace-preserving.
    pub fn matches(&self, identity: &str) -> bool {
        self.identity.eq_ignore_ascii_case(identity)
    }
}

/// A resource as currently reported by the host. Never persisted; rebuilt on every
/// enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveResource {
    pub identity: String,
    pub display_name: String,
    pub detail: LiveDetail,
}

/// Kind-specific live state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiveDetail {
    Service {
        status: String,
        startup_mode: String,
        is_active: bool,
    },
    Task {
        enabled: bool,
        state: String,
        last_run: Option<DateTime<Utc>>,
        next_run: Option<DateTime<Utc>>,
    },
}

/// The externally visible record: live state merged with the watch entry's operator
/// metadata. Superseded wholesale by the next reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoredEntry {
    pub identity: String,
    pub display_name: String,
    pub port: String,
    pub description: String,
    #[serde(flatten)]
    pub detail: LiveDetail,
}

impl MonitoredEntry {
    pub fn merge(live: LiveResource, watch: &WatchEntry) -> Self {
        Self {
            identity: live.identity,
            display_name: live.display_name,
            port: watch
                .port
                .clone()
                .unwrap_or_else(|| UNSET_METADATA.to_string()),
            description: watch
                .description
                .clone()
                .unwrap_or_else(|| UNSET_METADATA.to_string()),
            detail: live.detail,
        }
    }
}
