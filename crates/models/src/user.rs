use serde::{Deserialize, Serialize};

/// Account roles, lowest privilege first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Agent,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "agent" => Some(Self::Agent),
            "admin" => Some(Self::Admin),
            "super_admin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

/// A row of the `users` collection.
///
/// Every optional field carries a serde default so records written by older
/// versions (or by hand) still load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub password_hash: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub profession: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub favorites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

fn default_true() -> bool { true }

impl User {
    /// Fresh account with a generated id; timestamps are stamped by the store on insert.
    pub fn new(email: &str, name: &str, phone: &str, role: Role, password_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_lowercase(),
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            role,
            password_hash,
            is_active: true,
            email_verified: false,
            bio: String::new(),
            city: String::new(),
            profession: String::new(),
            photo_url: String::new(),
            favorites: Vec::new(),
            created_at: None,
            updated_at: None,
            last_login: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            role: self.role,
            is_active: self.is_active,
            email_verified: self.email_verified,
            bio: self.bio.clone(),
            city: self.city.clone(),
            profession: self.profession.clone(),
            photo_url: self.photo_url.clone(),
            created_at: self.created_at.clone(),
            last_login: self.last_login.clone(),
        }
    }
}

/// User as exposed outside the service layer: never carries the password hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub bio: String,
    pub city: String,
    pub profession: String,
    pub photo_url: String,
    pub created_at: Option<String>,
    pub last_login: Option<String>,
}
