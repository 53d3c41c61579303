use serde::{Deserialize, Serialize};

/// Static content page stored under `pages.<slug>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Slugs are lowercase ASCII words joined by `-`.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 64
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rules() {
        assert!(is_valid_slug("about"));
        assert!(is_valid_slug("kvkk-2024"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("About"));
        assert!(!is_valid_slug("../etc"));
        assert!(!is_valid_slug("-x"));
    }
}
