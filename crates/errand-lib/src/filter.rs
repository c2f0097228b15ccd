use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::db::Poi;
use crate::error::{Error, Result};

/// Queryable category attributes of a POI (OpenStreetMap tag keys).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKey {
    Amenity,
    Shop,
}

impl TagKey {
    pub fn as_str(self) -> &'static str {
        match self {
            TagKey::Amenity => "amenity",
            TagKey::Shop => "shop",
        }
    }

    fn value_of(self, poi: &Poi) -> Option<&str> {
        match self {
            TagKey::Amenity => poi.amenity.as_deref(),
            TagKey::Shop => poi.shop.as_deref(),
        }
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate selecting the POIs eligible for one stop.
///
/// The textual form is `key=value`, optionally followed by `:Name` to pin a
/// specific establishment, e.g. `shop=electronics:Best Buy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryFilter {
    pub key: TagKey,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CategoryFilter {
    pub fn new(key: TagKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
            name: None,
        }
    }

    pub fn shop(value: impl Into<String>) -> Self {
        Self::new(TagKey::Shop, value)
    }

    pub fn amenity(value: impl Into<String>) -> Self {
        Self::new(TagKey::Amenity, value)
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Category match only, ignoring any name constraint.
    pub fn matches_category(&self, poi: &Poi) -> bool {
        self.key.value_of(poi) == Some(self.value.as_str())
    }

    pub fn matches(&self, poi: &Poi) -> bool {
        if !self.matches_category(poi) {
            return false;
        }
        match &self.name {
            Some(name) => poi.name.as_deref() == Some(name.as_str()),
            None => true,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)?;
        if let Some(name) = &self.name {
            write!(f, ":{name}")?;
        }
        Ok(())
    }
}

impl FromStr for CategoryFilter {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidFilter {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (key, rest) = input
            .split_once('=')
            .ok_or_else(|| invalid("expected KEY=VALUE"))?;
        let key = match key.trim().to_ascii_lowercase().as_str() {
            "amenity" => TagKey::Amenity,
            "shop" => TagKey::Shop,
            _ => return Err(invalid("key must be 'amenity' or 'shop'")),
        };

        let (value, name) = match rest.split_once(':') {
            Some((value, name)) => (value.trim(), Some(name.trim())),
            None => (rest.trim(), None),
        };
        if value.is_empty() {
            return Err(invalid("value must not be empty"));
        }

        let mut filter = CategoryFilter::new(key, value);
        match name {
            Some("") => return Err(invalid("name after ':' must not be empty")),
            Some(name) => filter.name = Some(name.to_string()),
            None => {}
        }
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::PoiBuilder;

    #[test]
    fn parses_key_value_and_name() {
        let filter: CategoryFilter = "shop=electronics:Best Buy".parse().unwrap();
        assert_eq!(filter, CategoryFilter::shop("electronics").named("Best Buy"));
        assert_eq!(filter.to_string(), "shop=electronics:Best Buy");

        let filter: CategoryFilter = "Amenity = cafe".parse().unwrap();
        assert_eq!(filter, CategoryFilter::amenity("cafe"));
    }

    #[test]
    fn rejects_unknown_keys_and_empty_parts() {
        for input in ["cuisine=pizza", "shop", "shop=", "shop=alcohol:"] {
            let error = input.parse::<CategoryFilter>().unwrap_err();
            assert!(
                matches!(error, Error::InvalidFilter { .. }),
                "{input} gave {error}"
            );
        }
    }

    #[test]
    fn name_constraint_narrows_matches() {
        let best_buy = PoiBuilder::new(1).shop("electronics").name("Best Buy").build();
        let other = PoiBuilder::new(2).shop("electronics").name("B&H").build();
        let cafe = PoiBuilder::new(3).amenity("cafe").build();

        let any_electronics = CategoryFilter::shop("electronics");
        assert!(any_electronics.matches(&best_buy));
        assert!(any_electronics.matches(&other));
        assert!(!any_electronics.matches(&cafe));

        let named = any_electronics.named("Best Buy");
        assert!(named.matches(&best_buy));
        assert!(!named.matches(&other));
        assert!(named.matches_category(&other));
    }
}
