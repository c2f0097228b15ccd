//! Common test utilities and fixture helpers.
//!
//! Integration tests write a small midtown Manhattan POI database into a
//! temporary directory rather than relying on a checked-in binary fixture.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use errand_lib::{spatial_index_path, Position};
use rusqlite::{params, Connection};
use tempfile::TempDir;

/// Times Square, the origin every scenario starts from.
pub const ORIGIN: Position = Position::new(-73.986226, 40.755702);

pub const BEST_BUY_5TH_AVE: i64 = 1;
pub const BEST_BUY_UNION_SQUARE: i64 = 2;
pub const BH_PHOTO: i64 = 3;
pub const MIDTOWN_WINE: i64 = 4;
pub const BLUE_BOTTLE: i64 = 5;
pub const WHOLE_FOODS: i64 = 6;
pub const DUANE_READE: i64 = 8;

/// One row of the fixture `pois` table.
pub struct FixturePoi {
    pub id: i64,
    pub name: Option<&'static str>,
    pub amenity: Option<&'static str>,
    pub shop: Option<&'static str>,
    pub housenumber: Option<&'static str>,
    pub street: Option<&'static str>,
    pub position: Option<(f64, f64)>,
}

pub fn midtown_pois() -> Vec<FixturePoi> {
    vec![
        FixturePoi {
            id: BEST_BUY_5TH_AVE,
            name: Some("Best Buy"),
            amenity: None,
            shop: Some("electronics"),
            housenumber: Some("529"),
            street: Some("5th Avenue"),
            position: Some((-73.98060, 40.75378)),
        },
        FixturePoi {
            id: BEST_BUY_UNION_SQUARE,
            name: Some("Best Buy"),
            amenity: None,
            shop: Some("electronics"),
            housenumber: Some("52"),
            street: Some("East 14th Street"),
            position: Some((-73.9897, 40.7359)),
        },
        FixturePoi {
            id: BH_PHOTO,
            name: Some("B&H Photo Video"),
            amenity: None,
            shop: Some("electronics"),
            housenumber: Some("420"),
            street: Some("9th Avenue"),
            position: Some((-73.9962, 40.7532)),
        },
        FixturePoi {
            id: MIDTOWN_WINE,
            name: Some("Midtown Wine & Spirits"),
            amenity: None,
            shop: Some("alcohol"),
            housenumber: None,
            street: None,
            position: Some((-73.9880, 40.7570)),
        },
        FixturePoi {
            id: BLUE_BOTTLE,
            name: Some("Blue Bottle Coffee"),
            amenity: Some("cafe"),
            shop: None,
            housenumber: None,
            street: None,
            position: Some((-73.9850, 40.7565)),
        },
        FixturePoi {
            id: WHOLE_FOODS,
            name: Some("Whole Foods Market"),
            amenity: None,
            shop: Some("supermarket"),
            housenumber: Some("1095"),
            street: Some("6th Avenue"),
            position: Some((-73.9840, 40.7520)),
        },
        FixturePoi {
            id: 7,
            name: Some("Somewhere"),
            amenity: Some("cafe"),
            shop: None,
            housenumber: None,
            street: None,
            position: None,
        },
        FixturePoi {
            id: DUANE_READE,
            name: Some("Duane Reade"),
            amenity: Some("pharmacy"),
            shop: None,
            housenumber: None,
            street: None,
            position: Some((-73.9900, 40.7600)),
        },
    ]
}

/// Write `pois` into a fresh `pois` table at `path`.
pub fn write_pois_table(path: &Path, pois: &[FixturePoi]) {
    let connection = Connection::open(path).expect("create fixture database");
    connection
        .execute_batch(
            "CREATE TABLE pois (
                id INTEGER PRIMARY KEY,
                name TEXT,
                amenity TEXT,
                shop TEXT,
                addr_housenumber TEXT,
                addr_street TEXT,
                addr_city TEXT,
                addr_postcode TEXT,
                addr_state TEXT,
                lon REAL,
                lat REAL
            );",
        )
        .expect("create pois table");

    for poi in pois {
        connection
            .execute(
                "INSERT INTO pois VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'New York', NULL, 'NY', ?7, ?8)",
                params![
                    poi.id,
                    poi.name,
                    poi.amenity,
                    poi.shop,
                    poi.housenumber,
                    poi.street,
                    poi.position.map(|p| p.0),
                    poi.position.map(|p| p.1),
                ],
            )
            .expect("insert fixture POI");
    }
}

/// Temporary directory holding a fixture database and its index path.
pub struct FixtureDb {
    _temp_dir: TempDir,
    pub db_path: PathBuf,
    pub index_path: PathBuf,
}

impl FixtureDb {
    /// Midtown fixture in the `pois` table layout.
    pub fn midtown() -> Self {
        let env = Self::empty();
        write_pois_table(&env.db_path, &midtown_pois());
        env
    }

    /// Directory with no database written yet.
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db_path = temp_dir.path().join("pois.db");
        let index_path = spatial_index_path(&db_path);
        Self {
            _temp_dir: temp_dir,
            db_path,
            index_path,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Write arbitrary bytes to the index file.
    pub fn write_raw_index(&self, bytes: &[u8]) {
        fs::write(&self.index_path, bytes).expect("write raw index");
    }
}
