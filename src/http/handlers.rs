//! Axum HTTP handlers for the monitoring dashboard and watch list mutations.

use std::time::Instant;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::errors::RegistryError;
use crate::registry::model::{MonitoredEntry, ResourceKind, WatchEntry};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// The combined dashboard payload: both kinds reconciled, with counts and the
/// time the pass took.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub service_name: &'static str,
    pub services: Vec<MonitoredEntry>,
    pub service_count: usize,
    pub tasks: Vec<MonitoredEntry>,
    pub task_count: usize,
    pub duration_ms: u128,
    pub generated_at_utc: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub identity: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, RegistryError> {
    let started_at = Instant::now();

    let services = state.registry.read(ResourceKind::Service).await?;
    let tasks = state.registry.read(ResourceKind::Task).await?;

    Ok(Json(DashboardResponse {
        service_name: env!("CARGO_PKG_NAME"),
        service_count: services.len(),
        services,
        task_count: tasks.len(),
        tasks,
        duration_ms: started_at.elapsed().as_millis(),
        generated_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub async fn add_service(
    State(state): State<AppState>,
    Json(entry): Json<WatchEntry>,
) -> Result<Json<MonitoredEntry>, RegistryError> {
    let merged = state.registry.add(ResourceKind::Service, entry).await?;
    Ok(Json(merged))
}

pub async fn add_task(
    State(state): State<AppState>,
    Json(entry): Json<WatchEntry>,
) -> Result<Json<MonitoredEntry>, RegistryError> {
    let merged = state.registry.add(ResourceKind::Task, entry).await?;
    Ok(Json(merged))
}

pub async fn delete_service(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<DeleteResponse>, RegistryError> {
    state
        .registry
        .delete(ResourceKind::Service, &identity)
        .await?;
    Ok(Json(DeleteResponse {
        status: "removed",
        identity,
    }))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<DeleteResponse>, RegistryError> {
    state.registry.delete(ResourceKind::Task, &identity).await?;
    Ok(Json(DeleteResponse {
        status: "removed",
        identity,
    }))
}
