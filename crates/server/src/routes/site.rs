use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use common::types::Envelope;
use models::page::Page;
use models::Record;

use super::blocking;
use crate::errors::ApiError;
use crate::state::AppState;

pub async fn cities(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    let site = state.site.clone();
    let cities = blocking(move || Ok(site.cities())).await?;
    Ok(Json(Envelope::ok(json!({"cities": cities}))))
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    let site = state.site.clone();
    let categories = blocking(move || Ok(site.categories()?)).await?;
    Ok(Json(Envelope::ok(json!({"categories": categories}))))
}

pub async fn settings(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    let site = state.site.clone();
    let settings = blocking(move || Ok(site.settings())).await?;
    Ok(Json(Envelope::ok(json!({"settings": settings}))))
}

pub async fn page(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Envelope<Value>>, ApiError> {
    let site = state.site.clone();
    let page = blocking(move || Ok(site.page(&slug)?)).await?;
    Ok(Json(Envelope::ok(json!({"page": page}))))
}

/// Shallow-merge the posted keys into the site settings.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(partial): Json<Record>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let site = state.site.clone();
    let settings = blocking(move || Ok(site.update_settings(partial)?)).await?;
    Ok(Json(Envelope::ok(json!({"settings": settings}))))
}

pub async fn update_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(page): Json<Page>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let site = state.site.clone();
    let saved = blocking(move || Ok(site.upsert_page(&slug, page)?)).await?;
    Ok(Json(Envelope::ok(json!({"page": saved}))))
}
