//! API Handlers
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use sentinel_core::{
    Device, LedgerRecord, LifecycleReceipt, RemovalOutcome, SentinelError, Transaction,
    SENTINEL_VERSION,
};
use sentinel_sim::{readings_for, AttackOutcome, HealthMetrics, SimulatedReading};
use sentinel_topology::{parse_topology, score, RiskClassification, SecurityAnswers, Topology};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Devices
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

pub async fn register_device(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<LifecycleReceipt>)> {
    let Json(payload) = payload?;
    let receipt = state
        .registry
        .lock()
        .await
        .register(payload.name, payload.address)?;
    state.metrics.devices_registered.inc();
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_devices(State(state): State<AppState>) -> Json<Vec<Device>> {
    Json(state.registry.lock().await.list())
}

pub async fn device_readings(State(state): State<AppState>) -> Json<Vec<SimulatedReading>> {
    let devices = state.registry.lock().await.list();
    Json(readings_for(&devices))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompromiseRequest {
    #[serde(default)]
    pub attack_type: String,
}

#[derive(Debug, Serialize)]
pub struct CompromiseResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: AttackOutcome,
}

pub async fn compromise_device(
    State(state): State<AppState>,
    Path(identity_key): Path<String>,
    payload: Result<Json<CompromiseRequest>, JsonRejection>,
) -> ApiResult<Json<CompromiseResponse>> {
    let Json(payload) = payload?;
    let outcome = state
        .simulator
        .inject_attack(&identity_key, &payload.attack_type)
        .await?;
    state.metrics.attacks_injected.inc();

    let message = format!(
        "Device {} compromised by {} and isolated; recovery in {}ms",
        outcome.compromise.device.name, outcome.attack_type, outcome.recovery_delay_ms
    );
    Ok(Json(CompromiseResponse { message, outcome }))
}

pub async fn recover_device(
    State(state): State<AppState>,
    Path(identity_key): Path<String>,
) -> ApiResult<Json<LifecycleReceipt>> {
    let receipt = state.simulator.recover_now(&identity_key).await?;
    state.metrics.manual_recoveries.inc();
    Ok(Json(receipt))
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    #[serde(flatten)]
    pub outcome: RemovalOutcome,
    /// The `remove` transaction
    pub transaction: Option<Transaction>,
}

pub async fn remove_device(
    State(state): State<AppState>,
    Path(identity_key): Path<String>,
) -> ApiResult<Json<RemoveResponse>> {
    let outcome = state.simulator.remove(&identity_key).await.map_err(|e| {
        if matches!(e, SentinelError::ExternalStoreFailure(_)) {
            state.metrics.archive_failures.inc();
        }
        e
    })?;
    state.metrics.removals.inc();
    if outcome.archive_record.is_some() {
        state.metrics.archive_sweeps.inc();
    }

    let transaction = outcome.removal_record.transactions.first().cloned();
    Ok(Json(RemoveResponse { outcome, transaction }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignModelsQuery {
    pub network_type: Option<String>,
}

pub async fn assign_models(
    State(state): State<AppState>,
    Query(query): Query<AssignModelsQuery>,
) -> ApiResult<Json<Value>> {
    let network_type = query.network_type.unwrap_or_default();
    let mut registry = state.registry.lock().await;
    if registry.is_empty() {
        return Err(SentinelError::InvalidArgument("no devices registered".to_string()).into());
    }
    let devices = registry.assign_model_to_all(&network_type)?;
    Ok(Json(json!({
        "message": format!("Assigned {}-model to {} devices", network_type.trim(), devices.len()),
        "devices": devices,
    })))
}

// ============================================================================
// Ledger
// ============================================================================

pub async fn get_ledger(State(state): State<AppState>) -> Json<Value> {
    let registry = state.registry.lock().await;
    Json(json!({ "records": registry.ledger().records() }))
}

pub async fn verify_ledger(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let mut registry = state.registry.lock().await;
    registry.verify_ledger()?;
    let ledger = registry.ledger();
    Ok(Json(json!({
        "valid": true,
        "length": ledger.len(),
        "tailHash": ledger.tail_hash(),
    })))
}

#[derive(Debug, Serialize)]
pub struct ArchiveResponse {
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<LedgerRecord>,
}

pub async fn archive_ledger(State(state): State<AppState>) -> ApiResult<Json<ArchiveResponse>> {
    let result = state.registry.lock().await.archive().await;
    match result {
        Ok(record) => {
            if record.is_some() {
                state.metrics.archive_sweeps.inc();
            }
            Ok(Json(ArchiveResponse {
                archived: record.is_some(),
                record,
            }))
        }
        Err(e) => {
            if matches!(e, SentinelError::ExternalStoreFailure(_)) {
                state.metrics.archive_failures.inc();
            }
            Err(e.into())
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

pub async fn health_metrics(State(state): State<AppState>) -> Json<HealthMetrics> {
    Json(state.reporter.current_metrics())
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state
        .metrics
        .pending_recoveries
        .set(state.simulator.pending_recoveries() as i64);
    let body = state.metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

// ============================================================================
// Network topology
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TopologyImport {
    pub topology: Topology,
    pub devices: Vec<Device>,
}

/// Parse a Mininet script and register every host it declares
pub async fn import_topology(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<TopologyImport>> {
    let topology = parse_topology(&body)?;

    let mut devices = Vec::with_capacity(topology.hosts.len());
    let mut registry = state.registry.lock().await;
    for host in &topology.hosts {
        match registry.register(host.name.clone(), host.ip.clone()) {
            Ok(receipt) => {
                state.metrics.devices_registered.inc();
                devices.push(receipt.device);
            }
            Err(e @ SentinelError::DuplicateDevice { .. }) => {
                warn!(host = %host.name, error = %e, "Host already registered, skipped");
            }
            Err(e) => return Err(e.into()),
        }
    }
    drop(registry);

    info!(
        hosts = topology.hosts.len(),
        registered = devices.len(),
        "Topology imported"
    );
    Ok(Json(TopologyImport { topology, devices }))
}

#[derive(Debug, Deserialize)]
pub struct RiskRequest {
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub answers: SecurityAnswers,
}

pub async fn classify_topology(
    payload: Result<Json<RiskRequest>, JsonRejection>,
) -> ApiResult<Json<RiskClassification>> {
    let Json(payload) = payload?;
    let topology = parse_topology(&payload.layout)?;
    Ok(Json(score(&topology, &payload.answers)))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": SENTINEL_VERSION })),
    )
}
