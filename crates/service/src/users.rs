//! Profile reads and edits plus the favorites list.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use models::property::Property;
use models::user::{PublicUser, User};
use models::validate::{char_len_at_most, validate_email, validate_name, validate_phone};
use models::{from_record, Record};

use crate::errors::ServiceError;
use crate::storage::document::{decode_records, PROPERTIES, USERS};
use crate::storage::filter::{any, by_id, field_eq_ignore_case};
use crate::storage::DocumentStore;

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    fn validate(&self) -> Result<(), ServiceError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(bio) = &self.bio {
            char_len_at_most("bio", bio, 1000)?;
        }
        if let Some(city) = &self.city {
            char_len_at_most("city", city, 100)?;
        }
        if let Some(profession) = &self.profession {
            char_len_at_most("profession", profession, 100)?;
        }
        Ok(())
    }

    fn into_patch(self) -> Record {
        let mut patch = Record::new();
        let fields = [
            ("name", self.name),
            ("email", self.email.map(|e| e.trim().to_lowercase())),
            ("phone", self.phone),
            ("bio", self.bio),
            ("city", self.city),
            ("profession", self.profession),
            ("photo_url", self.photo_url),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                patch.insert(key.into(), Value::from(value.trim().to_string()));
            }
        }
        patch
    }
}

pub struct UserService {
    store: Arc<DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, id: &str) -> Result<User, ServiceError> {
        let rec = self.store.find_one(USERS, by_id(id)).ok_or_else(|| ServiceError::not_found("user"))?;
        Ok(from_record(rec)?)
    }

    pub fn get_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.store.find_one(USERS, field_eq_ignore_case("email", email)).map(from_record).transpose()?)
    }

    /// Every account, newest first.
    pub fn list(&self) -> Result<Vec<PublicUser>, ServiceError> {
        let mut users: Vec<User> = decode_records(USERS, self.store.find_many(USERS, any));
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users.iter().map(User::to_public).collect())
    }

    #[instrument(skip(self, update))]
    pub fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<PublicUser, ServiceError> {
        update.validate()?;
        if let Some(email) = &update.email {
            if let Some(other) = self.get_by_email(email)? {
                if other.id != id {
                    return Err(ServiceError::Conflict("email already in use".into()));
                }
            }
        }
        let patch = update.into_patch();
        if !self.store.update_one(USERS, by_id(id), patch)? {
            return Err(ServiceError::not_found("user"));
        }
        info!(user_id = id, "profile_updated");
        Ok(self.get(id)?.to_public())
    }

    /// Add `property_id` to the user's favorites, or remove it if present.
    /// Returns whether the listing is a favorite afterwards.
    #[instrument(skip(self))]
    pub fn toggle_favorite(&self, user_id: &str, property_id: &str) -> Result<bool, ServiceError> {
        if self.store.find_one(PROPERTIES, by_id(property_id)).is_none() {
            return Err(ServiceError::not_found("property"));
        }
        self.store
            .modify_one(USERS, by_id(user_id), |user| {
                let slot = user.entry("favorites").or_insert_with(|| Value::Array(Vec::new()));
                if !slot.is_array() {
                    *slot = Value::Array(Vec::new());
                }
                let Value::Array(favorites) = slot else {
                    return Err(ServiceError::Validation("favorites must be a list".into()));
                };
                let before = favorites.len();
                favorites.retain(|v| v.as_str() != Some(property_id));
                if favorites.len() < before {
                    return Ok(false);
                }
                favorites.push(Value::from(property_id));
                Ok(true)
            })?
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    /// The user's favorite listings in the order they were added. Deleted listings are skipped.
    pub fn favorites(&self, user_id: &str) -> Result<Vec<Property>, ServiceError> {
        let user = self.get(user_id)?;
        let found: Vec<Record> =
            user.favorites.iter().filter_map(|id| self.store.find_one(PROPERTIES, by_id(id))).collect();
        Ok(decode_records(PROPERTIES, found))
    }
}
