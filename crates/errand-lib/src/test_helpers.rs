// Test-only helpers for `errand-lib` unit tests
#![allow(dead_code)]
use crate::db::{Address, Poi, PoiId};
use crate::geometry::Position;

/// Builder to create `Poi` instances in tests with sensible defaults.
pub struct PoiBuilder {
    poi: Poi,
}

impl PoiBuilder {
    #[must_use]
    pub fn new(id: PoiId) -> Self {
        Self {
            poi: Poi {
                id,
                position: Position::new(-73.986226, 40.755702),
                name: None,
                amenity: None,
                shop: None,
                address: Address::default(),
            },
        }
    }

    pub fn at(mut self, lon: f64, lat: f64) -> Self {
        self.poi.position = Position::new(lon, lat);
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.poi.name = Some(name.to_string());
        self
    }

    pub fn shop(mut self, value: &str) -> Self {
        self.poi.shop = Some(value.to_string());
        self
    }

    pub fn amenity(mut self, value: &str) -> Self {
        self.poi.amenity = Some(value.to_string());
        self
    }

    pub fn street(mut self, housenumber: &str, street: &str) -> Self {
        self.poi.address.housenumber = Some(housenumber.to_string());
        self.poi.address.street = Some(street.to_string());
        self
    }

    pub fn build(self) -> Poi {
        self.poi
    }
}
