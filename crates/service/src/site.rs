//! Site content: settings, static pages, categories and cities.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use models::page::{is_valid_slug, Category, Page};
use models::validate::char_len_between;
use models::{from_record, to_record, Record};

use crate::errors::ServiceError;
use crate::storage::document::{decode_records, CATEGORIES, CITIES};
use crate::storage::filter::{any, by_id};
use crate::storage::{DeleteMode, DocumentStore};

pub const DEFAULT_CATEGORIES: [(&str, &str); 3] = [("residential", "Konut"), ("commercial", "Ticari"), ("land", "Arsa")];
pub const DEFAULT_CITIES: [&str; 5] = ["Denizli", "İstanbul", "Ankara", "İzmir", "Antalya"];

pub struct SiteService {
    store: Arc<DocumentStore>,
}

impl SiteService {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub fn settings(&self) -> Record {
        self.store.get_settings()
    }

    pub fn update_settings(&self, partial: Record) -> Result<Record, ServiceError> {
        let keys: Vec<&str> = partial.keys().map(String::as_str).collect();
        info!(?keys, "settings_updated");
        Ok(self.store.update_settings(partial)?)
    }

    pub fn page(&self, slug: &str) -> Result<Page, ServiceError> {
        let rec = self.store.get_page(slug).ok_or_else(|| ServiceError::not_found("page"))?;
        Ok(from_record(rec)?)
    }

    /// All pages keyed by slug.
    pub fn pages(&self) -> Record {
        self.store.list_pages()
    }

    pub fn upsert_page(&self, slug: &str, page: Page) -> Result<Page, ServiceError> {
        if !is_valid_slug(slug) {
            return Err(ServiceError::Validation(format!("invalid page slug: {slug}")));
        }
        char_len_between("title", page.title.trim(), 1, 200)?;
        let stored = self.store.update_page(slug, to_record(&page)?)?;
        info!(slug, "page_saved");
        Ok(from_record(stored)?)
    }

    pub fn categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(decode_records(CATEGORIES, self.store.find_many(CATEGORIES, any)))
    }

    pub fn add_category(&self, category: Category) -> Result<Category, ServiceError> {
        if !is_valid_slug(&category.id) {
            return Err(ServiceError::Validation(format!("invalid category id: {}", category.id)));
        }
        char_len_between("name", category.name.trim(), 1, 100)?;
        let stored = self
            .store
            .insert_unless(CATEGORIES, by_id(&category.id), to_record(&category)?)?
            .ok_or_else(|| ServiceError::Conflict(format!("category {} exists", category.id)))?;
        Ok(from_record(stored)?)
    }

    pub fn remove_category(&self, id: &str) -> Result<(), ServiceError> {
        if !self.store.delete_one(CATEGORIES, by_id(id), DeleteMode::AllMatches)? {
            return Err(ServiceError::not_found("category"));
        }
        Ok(())
    }

    /// City names in stored order; non-string entries are skipped.
    pub fn cities(&self) -> Vec<String> {
        self.store
            .get_collection(CITIES)
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// Replace the city list, trimming names and dropping blanks and duplicates.
    pub fn set_cities(&self, cities: Vec<String>) -> Result<Vec<String>, ServiceError> {
        let mut out: Vec<String> = Vec::with_capacity(cities.len());
        for city in cities {
            let city = city.trim().to_string();
            if !city.is_empty() && !out.contains(&city) {
                out.push(city);
            }
        }
        self.store.set_collection(CITIES, out.iter().cloned().map(Value::from).collect())?;
        Ok(out)
    }

    /// Fill empty category and city lists with the defaults. Returns true if anything was written.
    pub fn seed_defaults(&self) -> Result<bool, ServiceError> {
        let mut seeded = false;
        if self.categories()?.is_empty() {
            for (id, name) in DEFAULT_CATEGORIES {
                self.add_category(Category { id: id.into(), name: name.into() })?;
            }
            seeded = true;
        }
        if self.cities().is_empty() {
            self.set_cities(DEFAULT_CITIES.iter().map(|c| c.to_string()).collect())?;
            seeded = true;
        }
        Ok(seeded)
    }
}
