use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::warn;

use common::types::Envelope;
use models::property::{ListingType, Property, PropertyInput, SceneInput};
use service::pagination::{Paged, Pagination};
use service::properties::{SearchQuery, SortOrder};

use super::auth::CurrentUser;
use super::blocking;
use crate::errors::ApiError;
use crate::state::AppState;

/// Query string of `/api/search`. Blank fields count as unset, as HTML forms send them;
/// unknown `listing_type`/`sort` values are ignored. `with_tour` accepts `on`, `true` or `1`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub listing_type: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_price: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_price: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub min_area: Option<i64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub max_area: Option<i64>,
    pub rooms: Option<String>,
    pub with_tour: Option<String>,
    pub sort: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<u32>,
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Parse a snake_case enum name the way serde would.
fn parse_keyword<T: DeserializeOwned>(raw: Option<&str>) -> Option<T> {
    serde_json::from_value(Value::from(raw?.trim())).ok()
}

impl SearchParams {
    fn into_query(self) -> (SearchQuery, u32) {
        let with_tour = matches!(self.with_tour.as_deref(), Some("on" | "true" | "1"));
        let query = SearchQuery {
            listing_type: parse_keyword::<ListingType>(self.listing_type.as_deref()),
            category: self.category,
            city: self.city,
            district: self.district,
            min_price: self.min_price,
            max_price: self.max_price,
            min_area: self.min_area,
            max_area: self.max_area,
            rooms: self.rooms,
            with_tour,
            sort: parse_keyword::<SortOrder>(self.sort.as_deref()).unwrap_or_default(),
        };
        (query, self.page.unwrap_or(1))
    }
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<Paged<Property>>>, ApiError> {
    let (query, page) = params.into_query();
    let paging = Pagination::new(page, state.per_page());
    let properties = state.properties.clone();
    let found = blocking(move || Ok(paging.apply(properties.search(&query)?))).await?;
    Ok(Json(Envelope::ok(found)))
}

/// Listing detail with owner contact. Views by anyone but the owner are counted.
pub async fn detail(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let users = state.users.clone();
    let out = blocking(move || {
        let viewer = viewer.map(|CurrentUser(u)| u);
        let mut property = properties.get_visible(viewer.as_ref(), &id)?;
        if viewer.as_ref().map_or(true, |u| u.id != property.user_id) {
            property.views = properties.record_view(&id)?;
        }
        let owner = users.get(&property.user_id).ok().map(|u| u.to_public());
        Ok(json!({"property": property, "owner": owner}))
    })
    .await?;
    Ok(Json(Envelope::ok(out)))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<PropertyInput>,
) -> Result<(StatusCode, Json<Envelope<Value>>), ApiError> {
    let properties = state.properties.clone();
    let created = blocking(move || Ok(properties.create(&user, input)?)).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(json!({"property": created})))))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<PropertyInput>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let updated = blocking(move || Ok(properties.update(&user, &id, input)?)).await?;
    Ok(Json(Envelope::ok(json!({"property": updated}))))
}

/// Delete the listing, then its uploaded tour files (best effort).
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let target = id.clone();
    blocking(move || Ok(properties.delete(&user, &target)?)).await?;
    let dir = tour_dir(&state, &id);
    if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dir = %dir.display(), error = %e, "failed to remove tour files");
        }
    }
    Ok(Json(Envelope::ok(json!({"message": "property deleted"}))))
}

pub async fn publish(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let published = blocking(move || Ok(properties.publish(&user, &id)?)).await?;
    Ok(Json(Envelope::ok(json!({"property": published}))))
}

pub async fn unpublish(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let draft = blocking(move || Ok(properties.unpublish(&user, &id)?)).await?;
    Ok(Json(Envelope::ok(json!({"property": draft}))))
}

/// Register an already-uploaded panorama as a new scene.
pub async fn add_scene(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<SceneInput>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let scene = blocking(move || Ok(properties.add_scene(&user, &id, input)?)).await?;
    Ok(Json(Envelope::ok(json!({"scene": scene}))))
}

pub async fn remove_scene(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, scene_id)): Path<(String, String)>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let target = id.clone();
    let scene = blocking(move || Ok(properties.remove_scene(&user, &target, &scene_id)?)).await?;

    let dir = tour_dir(&state, &id);
    for file in [&scene.filename, &scene.thumbnail] {
        if file.is_empty() {
            continue;
        }
        let path = dir.join(file);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove scene file");
            }
        }
    }
    Ok(Json(Envelope::ok(json!({"scene": scene}))))
}

pub async fn save_hotspots(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(hotspots): Json<Vec<Value>>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let properties = state.properties.clone();
    let tour = blocking(move || Ok(properties.save_hotspots(&user, &id, hotspots)?)).await?;
    Ok(Json(Envelope::ok(json!({"tour": tour}))))
}

/// `<upload_dir>/tours/<property_id>`
fn tour_dir(state: &AppState, property_id: &str) -> PathBuf {
    state.config.uploads.upload_dir.join("tours").join(property_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_tour_accepts_checkbox_values() {
        for raw in ["on", "true", "1"] {
            let params = SearchParams { with_tour: Some(raw.into()), ..Default::default() };
            assert!(params.into_query().0.with_tour);
        }
        let (query, page) = SearchParams { with_tour: Some("off".into()), ..Default::default() }.into_query();
        assert!(!query.with_tour);
        assert_eq!(page, 1);
        assert_eq!(query.sort, SortOrder::DateDesc);
    }

    #[test]
    fn blank_form_fields_are_unset() {
        let params: SearchParams =
            serde_json::from_value(json!({"min_price": "", "max_price": " 500000 ", "listing_type": "rent", "sort": "bogus"}))
                .unwrap();
        let (query, _) = params.into_query();
        assert_eq!(query.min_price, None);
        assert_eq!(query.max_price, Some(500_000));
        assert_eq!(query.listing_type, Some(ListingType::Rent));
        assert_eq!(query.sort, SortOrder::DateDesc);
    }
}
