//! Super-admin console. Every route here sits behind `require_super_admin`.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use common::types::Envelope;
use models::property::PropertyStatus;
use models::user::Role;

use super::auth::CurrentUser;
use super::blocking;
use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentBody {
    #[serde(default)]
    pub agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestoreBody {
    pub name: String,
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    let admin = state.admin.clone();
    let properties = state.properties.clone();
    let out = blocking(move || {
        let stats = admin.stats();
        let pending = properties.count_by_status(PropertyStatus::Pending);
        Ok(json!({"stats": stats, "pending_properties": pending}))
    })
    .await?;
    Ok(Json(Envelope::ok(out)))
}

pub async fn users(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    let users = state.users.clone();
    let admin = state.admin.clone();
    let out = blocking(move || Ok(json!({"users": users.list()?, "agents": admin.agents()?}))).await?;
    Ok(Json(Envelope::ok(out)))
}

pub async fn set_role(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<RoleBody>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let role = Role::parse(&body.role).ok_or_else(|| ApiError::BadRequest(format!("unknown role: {}", body.role)))?;
    let admin = state.admin.clone();
    let user = blocking(move || Ok(admin.set_user_role(&actor, &id, role)?)).await?;
    Ok(Json(Envelope::ok(json!({"user": user}))))
}

pub async fn toggle_status(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let admin = state.admin.clone();
    let active = blocking(move || Ok(admin.toggle_user_status(&actor, &id)?)).await?;
    Ok(Json(Envelope::ok(json!({"is_active": active}))))
}

pub async fn properties(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    let admin = state.admin.clone();
    let rows = blocking(move || Ok(admin.properties()?)).await?;
    Ok(Json(Envelope::ok(json!({"properties": rows}))))
}

pub async fn set_property_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let status = PropertyStatus::parse(&body.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown status: {}", body.status)))?;
    let properties = state.properties.clone();
    let property = blocking(move || Ok(properties.set_status(&id, status)?)).await?;
    Ok(Json(Envelope::ok(json!({"property": property}))))
}

/// An empty or missing `agent_id` clears the assignment.
pub async fn assign_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AgentBody>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let agent_id = body.agent_id.filter(|a| !a.trim().is_empty());
    let properties = state.properties.clone();
    let property = blocking(move || Ok(properties.assign_agent(&id, agent_id.as_deref())?)).await?;
    Ok(Json(Envelope::ok(json!({"property": property}))))
}

pub async fn backups(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    let admin = state.admin.clone();
    let names = blocking(move || Ok(admin.list_backups())).await?;
    Ok(Json(Envelope::ok(json!({"backups": names}))))
}

pub async fn restore(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(body): Json<RestoreBody>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let admin = state.admin.clone();
    let name = body.name.clone();
    blocking(move || Ok(admin.restore_backup(&name)?)).await?;
    tracing::warn!(actor_id = %actor.id, backup = %body.name, "data restored from backup");
    Ok(Json(Envelope::ok(json!({"restored": body.name}))))
}
