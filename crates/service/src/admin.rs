//! Super-admin console: dashboard counters, account moderation and backups.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use models::property::Property;
use models::user::{PublicUser, Role, User};
use models::{from_record, Record};

use crate::errors::ServiceError;
use crate::storage::document::{decode_records, PROPERTIES, USERS};
use crate::storage::filter::{any, by_id, field_eq};
use crate::storage::DocumentStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_users: usize,
    pub total_properties: usize,
    pub active_properties: usize,
    pub agents: usize,
}

/// A listing plus its owner's display name.
#[derive(Clone, Debug, Serialize)]
pub struct PropertyRow {
    #[serde(flatten)]
    pub property: Property,
    pub user_name: String,
}

pub struct AdminService {
    store: Arc<DocumentStore>,
}

impl AdminService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Counters from a single snapshot of the document.
    pub fn stats(&self) -> Stats {
        let doc = self.store.read_all();
        let status_is = |r: &Record, s: &str| r.get("status").and_then(Value::as_str) == Some(s);
        let role_is = |r: &Record, s: &str| r.get("role").and_then(Value::as_str) == Some(s);
        Stats {
            total_users: doc.collection(USERS).map_or(0, Vec::len),
            total_properties: doc.collection(PROPERTIES).map_or(0, Vec::len),
            active_properties: doc.records(PROPERTIES).filter(|r| status_is(*r, "active")).count(),
            agents: doc.records(USERS).filter(|r| role_is(*r, Role::Agent.as_str())).count(),
        }
    }

    /// Every listing, newest first, with owner names resolved ("Bilinmeyen" when the owner is gone).
    pub fn properties(&self) -> Result<Vec<PropertyRow>, ServiceError> {
        let names: HashMap<String, String> = self
            .store
            .find_many(USERS, any)
            .into_iter()
            .filter_map(|u| {
                let id = u.get("id")?.as_str()?.to_string();
                let name = u.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
                Some((id, name))
            })
            .collect();
        let mut rows: Vec<PropertyRow> = decode_records::<Property>(PROPERTIES, self.store.find_many(PROPERTIES, any))
            .into_iter()
            .map(|property| {
                let user_name = names.get(&property.user_id).cloned().unwrap_or_else(|| "Bilinmeyen".into());
                PropertyRow { property, user_name }
            })
            .collect();
        rows.sort_by(|a, b| b.property.created_at.cmp(&a.property.created_at));
        Ok(rows)
    }

    pub fn agents(&self) -> Result<Vec<PublicUser>, ServiceError> {
        let agents: Vec<User> = decode_records(USERS, self.store.find_many(USERS, field_eq("role", Role::Agent.as_str())));
        Ok(agents.iter().map(User::to_public).collect())
    }

    /// Admins cannot change their own role.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub fn set_user_role(&self, actor: &User, user_id: &str, role: Role) -> Result<PublicUser, ServiceError> {
        if actor.id == user_id {
            return Err(ServiceError::forbidden("change your own role"));
        }
        let mut patch = Record::new();
        patch.insert("role".into(), Value::from(role.as_str()));
        if !self.store.update_one(USERS, by_id(user_id), patch)? {
            return Err(ServiceError::not_found("user"));
        }
        info!(user_id, role = role.as_str(), "user_role_set");
        self.public_user(user_id)
    }

    /// Flip `is_active`; returns the new value. Admins cannot disable themselves.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub fn toggle_user_status(&self, actor: &User, user_id: &str) -> Result<bool, ServiceError> {
        if actor.id == user_id {
            return Err(ServiceError::forbidden("disable your own account"));
        }
        let active = self
            .store
            .modify_one(USERS, by_id(user_id), |rec| {
                let active = !rec.get("is_active").and_then(Value::as_bool).unwrap_or(true);
                rec.insert("is_active".into(), Value::from(active));
                Ok::<_, ServiceError>(active)
            })?
            .ok_or_else(|| ServiceError::not_found("user"))?;
        info!(user_id, active, "user_status_toggled");
        Ok(active)
    }

    pub fn list_backups(&self) -> Vec<String> {
        self.store.list_backups()
    }

    pub fn restore_backup(&self, name: &str) -> Result<(), ServiceError> {
        if self.store.restore_from_backup(name)? {
            Ok(())
        } else {
            warn!(backup = name, "restore refused");
            Err(ServiceError::not_found("backup"))
        }
    }

    fn public_user(&self, id: &str) -> Result<PublicUser, ServiceError> {
        let rec = self.store.find_one(USERS, by_id(id)).ok_or_else(|| ServiceError::not_found("user"))?;
        Ok(from_record::<User>(rec)?.to_public())
    }
}
