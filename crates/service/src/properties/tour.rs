//! Virtual-tour editing and the publish/unpublish lifecycle.

use serde_json::Value;
use tracing::{info, instrument};

use models::property::{Property, PropertyStatus, Scene, SceneInput, Tour};
use models::user::User;

use super::service::PropertyService;
use crate::errors::ServiceError;

impl PropertyService {
    /// Append a processed panorama to the listing's tour.
    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub fn add_scene(&self, actor: &User, id: &str, input: SceneInput) -> Result<Scene, ServiceError> {
        input.validate(&self.allowed_extensions)?;
        let scene = Scene {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            filename: input.filename,
            thumbnail: input.thumbnail,
            width: input.width,
            height: input.height,
            size: input.size,
            hotspots: Vec::new(),
            created_at: Some(common::time::now_iso()),
        };
        let added = scene.clone();
        self.edit(Some(actor), id, |p| {
            p.tour.scenes.push(scene);
            Ok(())
        })?;
        info!(property_id = id, scene_id = %added.id, "scene_added");
        Ok(added)
    }

    /// Remove a scene and return it so the caller can delete its files.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub fn remove_scene(&self, actor: &User, id: &str, scene_id: &str) -> Result<Scene, ServiceError> {
        let removed = self.edit(Some(actor), id, |p| {
            let idx = p
                .tour
                .scenes
                .iter()
                .position(|s| s.id == scene_id)
                .ok_or_else(|| ServiceError::not_found("scene"))?;
            Ok(p.tour.scenes.remove(idx))
        })?;
        info!(property_id = id, scene_id, "scene_removed");
        Ok(removed)
    }

    /// Replace the tour-level hotspot list. An empty list is rejected.
    pub fn save_hotspots(&self, actor: &User, id: &str, hotspots: Vec<Value>) -> Result<Tour, ServiceError> {
        if hotspots.is_empty() {
            return Err(ServiceError::Validation("no hotspot data".into()));
        }
        self.edit(Some(actor), id, |p| {
            p.tour.hotspots = hotspots;
            Ok(p.tour.clone())
        })
    }

    /// Make the listing public. Requires at least one scene.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub fn publish(&self, actor: &User, id: &str) -> Result<Property, ServiceError> {
        self.edit(Some(actor), id, |p| {
            if !p.has_tour() {
                return Err(ServiceError::Validation("add at least one scene before publishing".into()));
            }
            p.status = PropertyStatus::Active;
            p.published_at = Some(common::time::now_iso());
            Ok(())
        })?;
        info!(property_id = id, "property_published");
        self.get(id)
    }

    /// Take the listing back to draft. `published_at` is kept as history.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub fn unpublish(&self, actor: &User, id: &str) -> Result<Property, ServiceError> {
        self.edit(Some(actor), id, |p| {
            p.status = PropertyStatus::Draft;
            Ok(())
        })?;
        info!(property_id = id, "property_unpublished");
        self.get(id)
    }
}
