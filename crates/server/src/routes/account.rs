//! Signed-in user's own profile, favorites and listings.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use common::types::Envelope;
use models::property::Property;
use service::pagination::{Paged, Pagination};
use service::properties::PropertyFilter;
use service::users::ProfileUpdate;

use super::auth::CurrentUser;
use super::blocking;
use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<u32>,
}

pub async fn me(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let id = user.id.clone();
    let stats = blocking(move || Ok(properties.owner_stats(&id)?)).await?;
    Ok(Json(Envelope::ok(json!({"user": user.to_public(), "stats": stats}))))
}

pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let users = state.users.clone();
    let updated = blocking(move || Ok(users.update_profile(&user.id, update)?)).await?;
    Ok(Json(Envelope::ok(json!({"user": updated}))))
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ChangePassword>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let auth = state.auth.clone();
    blocking(move || Ok(auth.change_password(&user.id, &body.current_password, &body.new_password)?)).await?;
    Ok(Json(Envelope::ok(json!({"message": "password changed"}))))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let users = state.users.clone();
    let favorited = blocking(move || Ok(users.toggle_favorite(&user.id, &id)?)).await?;
    Ok(Json(Envelope::ok(json!({"favorited": favorited}))))
}

pub async fn favorites(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Envelope<Value>>, ApiError> {
    let users = state.users.clone();
    let items = blocking(move || Ok(users.favorites(&user.id)?)).await?;
    Ok(Json(Envelope::ok(json!({"properties": items}))))
}

pub async fn my_properties(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Envelope<Paged<Property>>>, ApiError> {
    let properties = state.properties.clone();
    let paging = Pagination::new(params.page.unwrap_or(1), state.per_page());
    let filter = PropertyFilter { user_id: Some(user.id), ..Default::default() };
    let page = blocking(move || Ok(paging.apply(properties.list(&filter)?))).await?;
    Ok(Json(Envelope::ok(page)))
}
