use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use models::property::{ListingType, Property, PropertyStatus};

/// Owner/dashboard listing filter. Every `None` field matches anything.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertyFilter {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub listing_type: Option<ListingType>,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
}

impl PropertyFilter {
    pub fn matches(&self, p: &Property) -> bool {
        self.user_id.as_deref().map_or(true, |v| p.user_id == v)
            && self.category.as_deref().map_or(true, |v| p.category == v)
            && self.city.as_deref().map_or(true, |v| p.city == v)
            && self.listing_type.map_or(true, |v| p.listing_type == v)
            && self.status.map_or(true, |v| p.status == v)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    AreaDesc,
    #[default]
    DateDesc,
}

/// Public search form. Only active listings are ever returned.
///
/// Empty strings and zero bounds count as "not set", the same way an empty
/// query-string field does.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub listing_type: Option<ListingType>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub min_price: Option<i64>,
    #[serde(default)]
    pub max_price: Option<i64>,
    #[serde(default)]
    pub min_area: Option<i64>,
    #[serde(default)]
    pub max_area: Option<i64>,
    #[serde(default)]
    pub rooms: Option<String>,
    #[serde(default)]
    pub with_tour: bool,
    #[serde(default)]
    pub sort: SortOrder,
}

fn text(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn bound(v: Option<i64>) -> Option<i64> {
    v.filter(|n| *n != 0)
}

impl SearchQuery {
    pub fn matches(&self, p: &Property) -> bool {
        if p.status != PropertyStatus::Active {
            return false;
        }
        if self.listing_type.is_some_and(|t| t != p.listing_type) {
            return false;
        }
        let text_mismatch = |want: &Option<String>, have: &str| text(want).is_some_and(|w| w != have);
        if text_mismatch(&self.category, &p.category)
            || text_mismatch(&self.city, &p.city)
            || text_mismatch(&self.district, &p.district)
            || text_mismatch(&self.rooms, &p.rooms)
        {
            return false;
        }
        if bound(self.min_price).is_some_and(|n| p.price < n) || bound(self.max_price).is_some_and(|n| p.price > n) {
            return false;
        }
        if bound(self.min_area).is_some_and(|n| p.area < n) || bound(self.max_area).is_some_and(|n| p.area > n) {
            return false;
        }
        !self.with_tour || p.has_tour()
    }

    /// Stable sort, so ties keep collection order.
    pub fn sort(&self, items: &mut [Property]) {
        match self.sort {
            SortOrder::PriceAsc => items.sort_by_key(|p| p.price),
            SortOrder::PriceDesc => items.sort_by_key(|p| Reverse(p.price)),
            SortOrder::AreaDesc => items.sort_by_key(|p| Reverse(p.area)),
            SortOrder::DateDesc => sort_newest_first(items),
        }
    }
}

/// `created_at` descending; RFC 3339 UTC stamps compare correctly as strings.
pub fn sort_newest_first(items: &mut [Property]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prop(id: &str, price: i64, area: i64, status: &str, created: &str) -> Property {
        serde_json::from_value(json!({
            "id": id, "user_id": "u1", "title": "t", "category": "residential",
            "city": "Denizli", "district": "Merkezefendi", "rooms": "3+1",
            "price": price, "area": area, "status": status, "created_at": created
        }))
        .unwrap()
    }

    #[test]
    fn only_active_listings_match() {
        let q = SearchQuery::default();
        assert!(q.matches(&prop("a", 1, 1, "active", "")));
        assert!(!q.matches(&prop("b", 1, 1, "draft", "")));
    }

    #[test]
    fn bounds_and_blank_fields() {
        let q = SearchQuery {
            min_price: Some(100),
            max_price: Some(0),
            city: Some("  ".into()),
            district: Some("Merkezefendi".into()),
            ..Default::default()
        };
        assert!(q.matches(&prop("a", 150, 10, "active", "")));
        assert!(!q.matches(&prop("b", 50, 10, "active", "")));

        let q = SearchQuery { rooms: Some("2+1".into()), ..Default::default() };
        assert!(!q.matches(&prop("c", 150, 10, "active", "")));
        let q = SearchQuery { with_tour: true, ..Default::default() };
        assert!(!q.matches(&prop("d", 150, 10, "active", "")));
    }

    #[test]
    fn sort_orders() {
        let mut items = vec![
            prop("a", 300, 50, "active", "2026-01-01T00:00:00.000000Z"),
            prop("b", 100, 90, "active", "2026-03-01T00:00:00.000000Z"),
            prop("c", 200, 70, "active", "2026-02-01T00:00:00.000000Z"),
        ];
        let ids = |v: &[Property]| v.iter().map(|p| p.id.clone()).collect::<Vec<_>>();

        SearchQuery { sort: SortOrder::PriceAsc, ..Default::default() }.sort(&mut items);
        assert_eq!(ids(&items), ["b", "c", "a"]);
        SearchQuery { sort: SortOrder::AreaDesc, ..Default::default() }.sort(&mut items);
        assert_eq!(ids(&items), ["b", "c", "a"]);
        SearchQuery::default().sort(&mut items);
        assert_eq!(ids(&items), ["b", "c", "a"]);
        SearchQuery { sort: SortOrder::PriceDesc, ..Default::default() }.sort(&mut items);
        assert_eq!(ids(&items), ["a", "c", "b"]);
    }

    #[test]
    fn sort_parses_from_query_names() {
        let q: SearchQuery = serde_json::from_value(json!({"sort": "price_desc"})).unwrap();
        assert_eq!(q.sort, SortOrder::PriceDesc);
    }
}
