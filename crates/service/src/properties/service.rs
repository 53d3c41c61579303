use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use models::property::{Property, PropertyInput, PropertyStatus};
use models::user::{Role, User};
use models::{from_record, to_record, Record};

use super::search::{sort_newest_first, PropertyFilter, SearchQuery};
use crate::errors::ServiceError;
use crate::storage::document::{decode_records, CATEGORIES, PROPERTIES, USERS};
use crate::storage::filter::{any, by_id};
use crate::storage::{DeleteMode, DocumentStore};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OwnerStats {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub with_tour: usize,
    pub views_total: u64,
}

/// Listing operations over the `properties` collection.
///
/// Mutations that take an `actor` are limited to the listing's owner and to
/// admins. The permission check and the edit run under the same store lock.
pub struct PropertyService {
    pub(super) store: Arc<DocumentStore>,
    pub(super) allowed_extensions: Vec<String>,
}

impl PropertyService {
    pub fn new(store: Arc<DocumentStore>, allowed_extensions: Vec<String>) -> Self {
        Self { store, allowed_extensions }
    }

    #[instrument(skip(self, owner, input), fields(owner_id = %owner.id))]
    pub fn create(&self, owner: &User, input: PropertyInput) -> Result<Property, ServiceError> {
        input.validate()?;
        self.ensure_category(&input.category)?;
        let draft = Property::draft(&owner.id, input);
        let stored: Property = from_record(self.store.insert_one(PROPERTIES, to_record(&draft)?)?)?;
        info!(property_id = %stored.id, "property_created");
        Ok(stored)
    }

    pub fn get(&self, id: &str) -> Result<Property, ServiceError> {
        let rec = self.store.find_one(PROPERTIES, by_id(id)).ok_or_else(|| ServiceError::not_found("property"))?;
        Ok(from_record(rec)?)
    }

    /// `get`, except that non-active listings are hidden from everyone but their owner and admins.
    pub fn get_visible(&self, viewer: Option<&User>, id: &str) -> Result<Property, ServiceError> {
        let property = self.get(id)?;
        if property.status == PropertyStatus::Active || viewer.is_some_and(|u| can_edit(u, &property)) {
            Ok(property)
        } else {
            Err(ServiceError::not_found("property"))
        }
    }

    /// Listings matching `filter`, newest first.
    pub fn list(&self, filter: &PropertyFilter) -> Result<Vec<Property>, ServiceError> {
        let mut items = self.all()?;
        items.retain(|p| filter.matches(p));
        sort_newest_first(&mut items);
        Ok(items)
    }

    /// Active listings matching `query`, in the requested order.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<Property>, ServiceError> {
        let mut items = self.all()?;
        items.retain(|p| query.matches(p));
        query.sort(&mut items);
        Ok(items)
    }

    /// Replace the form fields of a listing. Status, tour, owner and counters are kept.
    #[instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    pub fn update(&self, actor: &User, id: &str, input: PropertyInput) -> Result<Property, ServiceError> {
        input.validate()?;
        self.ensure_category(&input.category)?;
        self.edit(Some(actor), id, |p| {
            let fresh = Property::draft(&p.user_id, input);
            p.title = fresh.title;
            p.description = fresh.description;
            p.category = fresh.category;
            p.listing_type = fresh.listing_type;
            p.price = fresh.price;
            p.city = fresh.city;
            p.district = fresh.district;
            p.address = fresh.address;
            p.area = fresh.area;
            p.rooms = fresh.rooms;
            p.floor = fresh.floor;
            p.building_age = fresh.building_age;
            p.images = fresh.images;
            Ok(())
        })?;
        info!(property_id = id, "property_updated");
        self.get(id)
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub fn delete(&self, actor: &User, id: &str) -> Result<(), ServiceError> {
        let property = self.get(id)?;
        ensure_can_edit(actor, &property)?;
        if !self.store.delete_one(PROPERTIES, by_id(id), DeleteMode::FirstMatch)? {
            return Err(ServiceError::not_found("property"));
        }
        info!(property_id = id, "property_deleted");
        Ok(())
    }

    /// Bump the view counter; returns the new count.
    pub fn record_view(&self, id: &str) -> Result<u64, ServiceError> {
        self.store
            .modify_one(PROPERTIES, by_id(id), |rec| {
                let views = rec.get("views").and_then(Value::as_u64).unwrap_or(0) + 1;
                rec.insert("views".into(), Value::from(views));
                Ok::<_, ServiceError>(views)
            })?
            .ok_or_else(|| ServiceError::not_found("property"))
    }

    pub fn set_status(&self, id: &str, status: PropertyStatus) -> Result<Property, ServiceError> {
        self.edit(None, id, |p| {
            p.status = status;
            Ok(())
        })?;
        info!(property_id = id, status = status.as_str(), "property_status_set");
        self.get(id)
    }

    /// Attach an agent to a listing, or detach with `None`.
    pub fn assign_agent(&self, id: &str, agent_id: Option<&str>) -> Result<Property, ServiceError> {
        if let Some(agent_id) = agent_id {
            let agent: User = from_record(
                self.store.find_one(USERS, by_id(agent_id)).ok_or_else(|| ServiceError::not_found("agent"))?,
            )?;
            if agent.role != Role::Agent {
                return Err(ServiceError::Validation(format!("user {agent_id} is not an agent")));
            }
        }
        self.edit(None, id, |p| {
            p.agent_id = agent_id.map(str::to_string);
            Ok(())
        })?;
        info!(property_id = id, agent_id = agent_id.unwrap_or("-"), "property_agent_set");
        self.get(id)
    }

    /// Dashboard counters for one owner's listings.
    pub fn owner_stats(&self, user_id: &str) -> Result<OwnerStats, ServiceError> {
        let mine = self.list(&PropertyFilter { user_id: Some(user_id.to_string()), ..Default::default() })?;
        Ok(OwnerStats {
            total: mine.len(),
            active: mine.iter().filter(|p| p.status == PropertyStatus::Active).count(),
            pending: mine.iter().filter(|p| p.status == PropertyStatus::Pending).count(),
            with_tour: mine.iter().filter(|p| p.has_tour()).count(),
            views_total: mine.iter().map(|p| p.views).sum(),
        })
    }

    pub fn count_by_status(&self, status: PropertyStatus) -> usize {
        self.store.count(PROPERTIES, Some(&|r: &Record| r.get("status").and_then(Value::as_str) == Some(status.as_str())))
    }

    /// Decode the listing, check `actor` (when given), apply `f` and write the
    /// result back, all under one store lock.
    pub(super) fn edit<T, F>(&self, actor: Option<&User>, id: &str, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Property) -> Result<T, ServiceError>,
    {
        self.store
            .modify_one(PROPERTIES, by_id(id), |rec| {
                let mut property: Property = from_record(rec.clone())?;
                if let Some(actor) = actor {
                    ensure_can_edit(actor, &property)?;
                }
                let out = f(&mut property)?;
                write_back(rec, &property)?;
                Ok::<_, ServiceError>(out)
            })?
            .ok_or_else(|| ServiceError::not_found("property"))
    }

    fn all(&self) -> Result<Vec<Property>, ServiceError> {
        Ok(decode_records(PROPERTIES, self.store.find_many(PROPERTIES, any)))
    }

    /// Categories are checked only once the site has some configured.
    fn ensure_category(&self, category: &str) -> Result<(), ServiceError> {
        if self.store.count(CATEGORIES, None) == 0 {
            return Ok(());
        }
        let known = self.store.find_one(CATEGORIES, by_id(category)).is_some();
        if !known {
            return Err(ServiceError::Validation(format!("unknown category: {category}")));
        }
        Ok(())
    }
}

pub(super) fn can_edit(actor: &User, property: &Property) -> bool {
    actor.id == property.user_id || actor.is_admin()
}

pub(super) fn ensure_can_edit(actor: &User, property: &Property) -> Result<(), ServiceError> {
    if can_edit(actor, property) {
        Ok(())
    } else {
        Err(ServiceError::forbidden("edit this listing"))
    }
}

/// Merge the typed listing over its record; fields unknown to `Property` survive.
fn write_back(rec: &mut Record, property: &Property) -> Result<(), ServiceError> {
    for (key, value) in to_record(property)? {
        rec.insert(key, value);
    }
    if property.agent_id.is_none() {
        rec.remove("agent_id");
    }
    if property.published_at.is_none() {
        rec.remove("published_at");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::StoreOptions;
    use models::property::ListingType;
    use serde_json::json;

    pub(crate) fn sample_input() -> PropertyInput {
        PropertyInput {
            title: "Merkezefendi 3+1 Satılık Daire".into(),
            description: "Site içinde, havuzlu, kapalı otoparklı geniş 3+1 daire. Okullara ve hastaneye yakın.".into(),
            category: "residential".into(),
            listing_type: ListingType::Sale,
            price: 2_500_000,
            city: "Denizli".into(),
            district: "Merkezefendi".into(),
            address: "Sırakapılar Mahallesi No:12".into(),
            area: 140,
            rooms: Some("3+1".into()),
            floor: Some("2".into()),
            building_age: Some(8),
            images: Vec::new(),
        }
    }

    pub(crate) fn add_user(store: &DocumentStore, email: &str, role: Role) -> User {
        let user = User::new(email, "Zeynep Arslan", "", role, "x".into());
        from_record(store.insert_one(USERS, to_record(&user).unwrap()).unwrap()).unwrap()
    }

    pub(crate) fn setup() -> (tempfile::TempDir, Arc<DocumentStore>, PropertyService) {
        let tmp = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(tmp.path().join("data.json"), StoreOptions::default()).unwrap();
        let svc = PropertyService::new(store.clone(), vec!["jpg".into(), "png".into()]);
        (tmp, store, svc)
    }

    #[test]
    fn create_starts_as_draft_with_stamps() {
        let (_tmp, store, svc) = setup();
        let owner = add_user(&store, "o@360ev.com", Role::User);
        let p = svc.create(&owner, sample_input()).unwrap();
        assert_eq!(p.status, PropertyStatus::Draft);
        assert_eq!(p.user_id, owner.id);
        assert!(p.created_at.is_some());
        assert_eq!(p.created_at, p.updated_at);
        assert!(svc.search(&SearchQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn only_owner_or_admin_may_edit() {
        let (_tmp, store, svc) = setup();
        let owner = add_user(&store, "o@360ev.com", Role::User);
        let other = add_user(&store, "x@360ev.com", Role::User);
        let admin = add_user(&store, "a@360ev.com", Role::Admin);
        let p = svc.create(&owner, sample_input()).unwrap();

        let mut input = sample_input();
        input.price = 2_400_000;
        assert!(matches!(svc.update(&other, &p.id, input.clone()), Err(ServiceError::Forbidden(_))));
        assert!(matches!(svc.delete(&other, &p.id), Err(ServiceError::Forbidden(_))));
        assert_eq!(svc.update(&admin, &p.id, input).unwrap().price, 2_400_000);
        svc.delete(&owner, &p.id).unwrap();
        assert!(matches!(svc.get(&p.id), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn drafts_are_hidden_from_strangers() {
        let (_tmp, store, svc) = setup();
        let owner = add_user(&store, "o@360ev.com", Role::User);
        let other = add_user(&store, "x@360ev.com", Role::User);
        let p = svc.create(&owner, sample_input()).unwrap();
        assert!(svc.get_visible(Some(&owner), &p.id).is_ok());
        assert!(svc.get_visible(Some(&other), &p.id).is_err());
        assert!(svc.get_visible(None, &p.id).is_err());
        svc.set_status(&p.id, PropertyStatus::Active).unwrap();
        assert!(svc.get_visible(None, &p.id).is_ok());
        assert_eq!(svc.count_by_status(PropertyStatus::Active), 1);
    }

    #[test]
    fn undecodable_listing_does_not_break_lists() {
        let (_tmp, store, svc) = setup();
        let owner = add_user(&store, "o@360ev.com", Role::User);
        let p = svc.create(&owner, sample_input()).unwrap();
        svc.set_status(&p.id, PropertyStatus::Active).unwrap();
        let odd = json!({"id": "odd", "user_id": owner.id, "title": "Eski kayıt", "status": "active", "price": 100.5});
        store.insert_one(PROPERTIES, odd.as_object().cloned().unwrap()).unwrap();

        let found = svc.search(&SearchQuery::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, p.id);
        assert_eq!(svc.list(&PropertyFilter::default()).unwrap().len(), 1);
        assert_eq!(svc.owner_stats(&owner.id).unwrap().total, 1);
        assert_eq!(store.count(PROPERTIES, None), 2, "the odd record stays on disk");
    }

    #[test]
    fn unknown_fields_survive_edits() {
        let (_tmp, store, svc) = setup();
        let owner = add_user(&store, "o@360ev.com", Role::User);
        let p = svc.create(&owner, sample_input()).unwrap();
        let mut patch = Record::new();
        patch.insert("legacy_ref".into(), json!("EV-1024"));
        store.update_one(PROPERTIES, by_id(&p.id), patch).unwrap();

        svc.record_view(&p.id).unwrap();
        assert_eq!(svc.record_view(&p.id).unwrap(), 2);
        svc.set_status(&p.id, PropertyStatus::Pending).unwrap();
        let raw = store.find_one(PROPERTIES, by_id(&p.id)).unwrap();
        assert_eq!(raw["legacy_ref"], "EV-1024");
        assert_eq!(raw["views"], 2);
        assert_eq!(raw["status"], "pending");
    }

    #[test]
    fn assign_agent_requires_agent_role() {
        let (_tmp, store, svc) = setup();
        let owner = add_user(&store, "o@360ev.com", Role::User);
        let agent = add_user(&store, "ag@360ev.com", Role::Agent);
        let p = svc.create(&owner, sample_input()).unwrap();

        assert!(matches!(svc.assign_agent(&p.id, Some(owner.id.as_str())), Err(ServiceError::Validation(_))));
        assert!(matches!(svc.assign_agent(&p.id, Some("ghost")), Err(ServiceError::NotFound(_))));
        assert_eq!(svc.assign_agent(&p.id, Some(agent.id.as_str())).unwrap().agent_id, Some(agent.id.clone()));
        assert_eq!(svc.assign_agent(&p.id, None).unwrap().agent_id, None);
        assert!(!store.find_one(PROPERTIES, by_id(&p.id)).unwrap().contains_key("agent_id"));
    }

    #[test]
    fn list_filters_by_owner_and_category_is_checked() {
        let (_tmp, store, svc) = setup();
        let a = add_user(&store, "a@360ev.com", Role::User);
        let b = add_user(&store, "b@360ev.com", Role::User);
        svc.create(&a, sample_input()).unwrap();
        svc.create(&b, sample_input()).unwrap();
        let mine = svc.list(&PropertyFilter { user_id: Some(a.id.clone()), ..Default::default() }).unwrap();
        assert_eq!(mine.len(), 1);
        svc.record_view(&mine[0].id).unwrap();
        let stats = svc.owner_stats(&a.id).unwrap();
        assert_eq!(stats, OwnerStats { total: 1, views_total: 1, ..Default::default() });

        store.insert_one(CATEGORIES, json!({"id": "land", "name": "Arsa"}).as_object().cloned().unwrap()).unwrap();
        assert!(matches!(svc.create(&a, sample_input()), Err(ServiceError::Validation(_))));
    }
}
