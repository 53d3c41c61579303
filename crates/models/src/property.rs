use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ModelError;
use crate::validate::{char_len_at_most, char_len_between, number_between};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    #[default]
    Sale,
    Rent,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rent => "rent",
        }
    }
}

/// Listing lifecycle: `draft` until the owner publishes, `pending`/`inactive` set by admins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Draft,
    Pending,
    Active,
    Inactive,
}

impl PropertyStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyImage {
    pub filename: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub order: u32,
}

/// One equirectangular panorama of a virtual tour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub hotspots: Vec<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Image metadata handed over by the upload pipeline once the file is on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneInput {
    #[serde(default = "default_scene_name")]
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub size: u64,
}

fn default_scene_name() -> String { "Yeni Sahne".into() }

impl SceneInput {
    pub fn validate(&self, allowed_extensions: &[String]) -> Result<(), ModelError> {
        char_len_between("name", self.name.trim(), 1, 100)?;
        if !crate::validate::allowed_file(&self.filename, allowed_extensions) {
            return Err(ModelError::invalid("filename", "unsupported file type"));
        }
        if self.filename.contains('/') || self.filename.contains('\\') {
            return Err(ModelError::invalid("filename", "must be a bare file name"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub hotspots: Vec<Value>,
}

/// A row of the `properties` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub listing_type: ListingType,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub area: i64,
    #[serde(default)]
    pub rooms: String,
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub building_age: i64,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub images: Vec<PropertyImage>,
    #[serde(default)]
    pub tour: Tour,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Property {
    /// New draft listing owned by `user_id`.
    pub fn draft(user_id: &str, input: PropertyInput) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            category: input.category,
            listing_type: input.listing_type,
            price: input.price,
            city: input.city,
            district: input.district.trim().to_string(),
            address: input.address.trim().to_string(),
            area: input.area,
            rooms: input.rooms.unwrap_or_default(),
            floor: input.floor.unwrap_or_default(),
            building_age: input.building_age.unwrap_or(0),
            status: PropertyStatus::Draft,
            views: 0,
            images: input.images,
            tour: Tour::default(),
            agent_id: None,
            published_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn has_tour(&self) -> bool {
        !self.tour.scenes.is_empty()
    }
}

/// Create/edit form payload. Ownership, status and tour are managed by the service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyInput {
    pub title: String,
    pub description: String,
    pub category: String,
    pub listing_type: ListingType,
    pub price: i64,
    pub city: String,
    pub district: String,
    pub address: String,
    pub area: i64,
    #[serde(default)]
    pub rooms: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub building_age: Option<i64>,
    #[serde(default)]
    pub images: Vec<PropertyImage>,
}

impl PropertyInput {
    pub fn validate(&self) -> Result<(), ModelError> {
        char_len_between("title", self.title.trim(), 10, 200)?;
        char_len_between("description", self.description.trim(), 50, 5000)?;
        if self.category.trim().is_empty() {
            return Err(ModelError::invalid("category", "required"));
        }
        if self.city.trim().is_empty() {
            return Err(ModelError::invalid("city", "required"));
        }
        number_between("price", self.price, 1, i64::MAX)?;
        char_len_between("district", self.district.trim(), 1, 100)?;
        char_len_between("address", self.address.trim(), 1, 500)?;
        number_between("area", self.area, 1, 100_000)?;
        if let Some(rooms) = &self.rooms {
            char_len_at_most("rooms", rooms, 20)?;
        }
        if let Some(floor) = &self.floor {
            char_len_at_most("floor", floor, 20)?;
        }
        if let Some(age) = self.building_age {
            number_between("building_age", age, 0, 200)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> PropertyInput {
        PropertyInput {
            title: "Denizli Yenişehir 2+1 Satılık Daire".into(),
            description: "Merkezi konumda, deniz manzaralı, modern 2+1 daire. Asansörlü binada, otopark dahil.".into(),
            category: "residential".into(),
            listing_type: ListingType::Sale,
            price: 480_000,
            city: "Denizli".into(),
            district: "Yenişehir".into(),
            address: "Yenişehir Mahallesi, Atatürk Caddesi No:45".into(),
            area: 95,
            rooms: Some("2+1".into()),
            floor: Some("3".into()),
            building_age: Some(5),
            images: Vec::new(),
        }
    }

    #[test]
    fn sample_input_is_valid() {
        assert!(sample_input().validate().is_ok());
    }

    #[test]
    fn short_title_and_bad_area_rejected() {
        let mut input = sample_input();
        input.title = "Daire".into();
        assert!(input.validate().is_err());

        let mut input = sample_input();
        input.area = 0;
        assert!(input.validate().is_err());

        let mut input = sample_input();
        input.building_age = Some(201);
        assert!(input.validate().is_err());
    }

    #[test]
    fn draft_starts_empty() {
        let p = Property::draft("u1", sample_input());
        assert_eq!(p.status, PropertyStatus::Draft);
        assert_eq!(p.views, 0);
        assert!(!p.has_tour());
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["status"], "draft");
        assert_eq!(v["listing_type"], "sale");
        assert_eq!(v["tour"], serde_json::json!({"scenes": [], "hotspots": []}));
    }

    #[test]
    fn scene_input_rules() {
        let allowed = vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()];
        let ok = SceneInput {
            name: "Salon".into(),
            filename: "abc.jpg".into(),
            thumbnail: "abc_thumb.jpg".into(),
            width: 4096,
            height: 2048,
            size: 1024,
        };
        assert!(ok.validate(&allowed).is_ok());
        let bad = SceneInput { filename: "../x.jpg".into(), ..ok.clone() };
        assert!(bad.validate(&allowed).is_err());
        let bad = SceneInput { filename: "x.gif".into(), ..ok };
        assert!(bad.validate(&allowed).is_err());
    }
}
