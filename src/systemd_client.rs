//! Live host state via the systemd dbus API.
//!
//! `ResourceKind::Service` maps to `.service` units, `ResourceKind::Task` to
//! `.timer` units. All dbus-specific representations stay inside this module; the
//! registry only ever sees [`LiveResource`] values.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use zbus::{zvariant::OwnedObjectPath, Connection, Proxy};

use crate::errors::RegistryError;
use crate::registry::model::{LiveDetail, LiveResource, ResourceKind};

type ListUnitRecord = (
    String,
    String,
    String,
    String,
    String,
    String,
    OwnedObjectPath,
    u32,
    String,
    OwnedObjectPath,
);

/// `ListUnitFiles` row: unit file path plus install state.
type ListUnitFileRecord = (String, String);

#[derive(Debug, Clone)]
struct RawUnit {
    name: String,
    description: String,
    active_state: String,
    sub_state: String,
    unit_path: OwnedObjectPath,
}

/// Enumerates the current host resources of one kind. Stateless; a fresh
/// enumeration on every call, no caching of its own.
#[async_trait]
pub trait LiveResourceProvider: Send + Sync {
    async fn enumerate(&self, kind: ResourceKind) -> Result<Vec<LiveResource>, RegistryError>;
}

#[derive(Debug, Default)]
pub struct DbusSystemdClient;

impl DbusSystemdClient {
    pub fn new() -> Self {
        Self
    }
}

/// Startup probe: fails fast when the systemd manager is unreachable instead of
/// surfacing the problem on the first request.
pub async fn ensure_systemd_available() -> Result<(), RegistryError> {
    let connection = connect().await?;
    let manager = manager_proxy(&connection).await?;
    let _version: String = manager.get_property("Version").await.map_err(|err| {
        RegistryError::collaborator(format!("failed to query systemd manager: {err}"))
    })?;
    Ok(())
}

#[async_trait]
impl LiveResourceProvider for DbusSystemdClient {
    async fn enumerate(&self, kind: ResourceKind) -> Result<Vec<LiveResource>, RegistryError> {
        let connection = connect().await?;
        let manager = manager_proxy(&connection).await?;

        let rows: Vec<ListUnitRecord> = manager.call("ListUnits", &()).await.map_err(|err| {
            RegistryError::collaborator(format!("failed to list units from systemd: {err}"))
        })?;
        let unit_files: Vec<ListUnitFileRecord> =
            manager.call("ListUnitFiles", &()).await.map_err(|err| {
                RegistryError::collaborator(format!(
                    "failed to list unit files from systemd: {err}"
                ))
            })?;
        let install_states = index_unit_file_states(unit_files);

        let raw_units = collect_units_of_kind(rows, kind);

        match kind {
            ResourceKind::Service => Ok(map_service_units(raw_units, &install_states)),
            ResourceKind::Task => {
                let mut resources = Vec::with_capacity(raw_units.len());
                for unit in raw_units {
                    let (last_run, next_run) = timer_run_times(&connection, &unit.unit_path).await?;
                    resources.push(map_timer_unit(unit, &install_states, last_run, next_run));
                }
                Ok(resources)
            }
        }
    }
}

async fn connect() -> Result<Connection, RegistryError> {
    Connection::system()
        .await
        .map_err(|err| RegistryError::collaborator(format!("failed to connect to system dbus: {err}")))
}

async fn manager_proxy(connection: &Connection) -> Result<Proxy<'_>, RegistryError> {
    Proxy::new(
        connection,
        "org.freedesktop.systemd1",
        "/org/freedesktop/systemd1",
        "org.freedesktop.systemd1.Manager",
    )
    .await
    .map_err(|err| {
        RegistryError::collaborator(format!("failed to create systemd dbus proxy: {err}"))
    })
}

/// `LastTriggerUSec` / `NextElapseUSecRealtime` off the timer unit's own object
/// path; zero means the timer never fired or has no scheduled elapse.
async fn timer_run_times(
    connection: &Connection,
    unit_path: &OwnedObjectPath,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), RegistryError> {
    let proxy = Proxy::new(
        connection,
        "org.freedesktop.systemd1",
        unit_path.as_str(),
        "org.freedesktop.systemd1.Timer",
    )
    .await
    .map_err(|err| {
        RegistryError::collaborator(format!("failed to create timer dbus proxy: {err}"))
    })?;

    let last_usec: u64 = proxy.get_property("LastTriggerUSec").await.map_err(|err| {
        RegistryError::collaborator(format!("failed to read timer last trigger: {err}"))
    })?;
    let next_usec: u64 = proxy
        .get_property("NextElapseUSecRealtime")
        .await
        .map_err(|err| {
            RegistryError::collaborator(format!("failed to read timer next elapse: {err}"))
        })?;

    Ok((usec_to_utc(last_usec), usec_to_utc(next_usec)))
}

fn unit_suffix(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Service => ".service",
        ResourceKind::Task => ".timer",
    }
}

fn collect_units_of_kind(rows: Vec<ListUnitRecord>, kind: ResourceKind) -> Vec<RawUnit> {
    let suffix = unit_suffix(kind);
    rows.into_iter()
        .filter(|row| row.0.ends_with(suffix))
        .map(
            |(
                name,
                description,
                _load_state,
                active_state,
                sub_state,
                _following,
                unit_path,
                _job_id,
                _job_type,
                _job_path,
            )| {
                RawUnit {
                    name,
                    description,
                    active_state,
                    sub_state,
                    unit_path,
                }
            },
        )
        .collect()
}

fn index_unit_file_states(records: Vec<ListUnitFileRecord>) -> HashMap<String, String> {
    records
        .into_iter()
        .filter_map(|(path, state)| {
            path.rsplit('/')
                .next()
                .map(|name| (name.to_string(), state))
        })
        .collect()
}

fn display_name(unit: &RawUnit) -> String {
    if unit.description.trim().is_empty() {
        unit.name.clone()
    } else {
        unit.description.clone()
    }
}

fn map_service_units(
    raw_units: Vec<RawUnit>,
    install_states: &HashMap<String, String>,
) -> Vec<LiveResource> {
    raw_units
        .into_iter()
        .map(|unit| {
            let startup_mode = install_states
                .get(&unit.name)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            // A unit still starting up counts as active for monitoring purposes.
            let is_active = matches!(unit.active_state.as_str(), "active" | "activating");
            let display_name = display_name(&unit);

            LiveResource {
                identity: unit.name,
                display_name,
                detail: LiveDetail::Service {
                    status: unit.active_state,
                    startup_mode,
                    is_active,
                },
            }
        })
        .collect()
}

fn map_timer_unit(
    unit: RawUnit,
    install_states: &HashMap<String, String>,
    last_run: Option<DateTime<Utc>>,
    next_run: Option<DateTime<Utc>>,
) -> LiveResource {
    let enabled = install_states
        .get(&unit.name)
        .is_some_and(|state| state == "enabled");
    let display_name = display_name(&unit);

    LiveResource {
        identity: unit.name,
        display_name,
        detail: LiveDetail::Task {
            enabled,
            state: unit.sub_state,
            last_run,
            next_run,
        },
    }
}

fn usec_to_utc(usec: u64) -> Option<DateTime<Utc>> {
    if usec == 0 || usec == u64::MAX {
        return None;
    }

    let secs = (usec / 1_000_000) as i64;
    let nanos = (usec % 1_000_000) as u32 * 1_000;
    Utc.timestamp_opt(secs, nanos).single()
}
