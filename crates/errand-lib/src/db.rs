use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::format::{from_text, from_wkb, point_of};
use crate::geometry::Position;

/// Numeric identifier for a point of interest.
pub type PoiId = i64;

/// Street address fields carried by OpenStreetMap `addr:*` tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housenumber: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.housenumber.is_none()
            && self.street.is_none()
            && self.city.is_none()
            && self.postcode.is_none()
            && self.state.is_none()
    }

    /// Single-line rendering, e.g. `529 5th Avenue, New York, NY 10017`.
    pub fn one_line(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let street = match (&self.housenumber, &self.street) {
            (Some(number), Some(street)) => Some(format!("{number} {street}")),
            (None, Some(street)) => Some(street.clone()),
            (Some(number), None) => Some(number.clone()),
            (None, None) => None,
        };
        let region = match (&self.state, &self.postcode) {
            (Some(state), Some(postcode)) => Some(format!("{state} {postcode}")),
            (Some(value), None) | (None, Some(value)) => Some(value.clone()),
            (None, None) => None,
        };

        let parts: Vec<String> = [street, self.city.clone(), region]
            .into_iter()
            .flatten()
            .collect();
        Some(parts.join(", "))
    }
}

/// A named, categorised geographic location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Poi {
    pub id: PoiId,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop: Option<String>,
    #[serde(skip_serializing_if = "Address::is_empty")]
    pub address: Address,
}

impl Poi {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// The category tag value, preferring `shop` over `amenity`.
    pub fn category(&self) -> Option<&str> {
        self.shop.as_deref().or(self.amenity.as_deref())
    }
}

/// In-memory snapshot of the POI reference data, ordered by identifier.
#[derive(Debug, Clone, Default)]
pub struct PoiStore {
    pois: Vec<Poi>,
    id_to_index: HashMap<PoiId, usize>,
}

impl PoiStore {
    pub fn from_pois(mut pois: Vec<Poi>) -> Self {
        pois.sort_by_key(|poi| poi.id);
        pois.dedup_by_key(|poi| poi.id);
        let id_to_index = pois
            .iter()
            .enumerate()
            .map(|(index, poi)| (poi.id, index))
            .collect();
        Self { pois, id_to_index }
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    pub fn get(&self, id: PoiId) -> Option<&Poi> {
        self.id_to_index.get(&id).map(|&index| &self.pois[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Poi> {
        self.pois.iter()
    }

    pub fn as_slice(&self) -> &[Poi] {
        &self.pois
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionSource {
    /// Separate numeric longitude and latitude columns.
    LonLat {
        lon: &'static str,
        lat: &'static str,
    },
    /// A single geometry column holding WKT/EWKT/GeoJSON text or a WKB blob.
    Encoded { column: &'static str },
}

impl fmt::Display for PositionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSource::LonLat { lon, lat } => write!(f, "{lon}/{lat}"),
            PositionSource::Encoded { column } => write!(f, "encoded:{column}"),
        }
    }
}

const ATTRIBUTE_COUNT: usize = 8;

/// Attribute columns read when present, in select order.
const ATTRIBUTE_COLUMNS: [&str; ATTRIBUTE_COUNT] = [
    "name",
    "amenity",
    "shop",
    "addr_housenumber",
    "addr_street",
    "addr_city",
    "addr_postcode",
    "addr_state",
];

const TABLE_CANDIDATES: [&str; 2] = ["pois", "planet_osm_point"];
const ID_CANDIDATES: [&str; 2] = ["id", "osm_id"];
const LON_LAT_CANDIDATES: [(&str, &str); 2] = [("lon", "lat"), ("longitude", "latitude")];
const ENCODED_CANDIDATES: [&str; 3] = ["coordinates", "geom", "way"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct SchemaDefinition {
    table: &'static str,
    id_column: &'static str,
    position: PositionSource,
    attributes: [bool; ATTRIBUTE_COUNT],
}

/// Load every POI from a SQLite database into memory.
///
/// The loader detects the table layout at runtime: either a `pois` table or
/// an osm2pgsql-style `planet_osm_point` table, with the position held in
/// `lon`/`lat` columns or in a single encoded geometry column. Attribute
/// columns missing from the table read as NULL. Rows without a position are
/// skipped with a warning; rows whose geometry cannot be decoded abort the load.
pub fn load_pois(db_path: &Path) -> Result<PoiStore> {
    if !db_path.exists() {
        return Err(Error::DatabaseNotFound {
            path: db_path.to_path_buf(),
        });
    }

    let connection = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| Error::BackendUnavailable {
            reason: format!("cannot open {}: {e}", db_path.display()),
        })?;
    let schema = detect_schema(&connection)?;
    debug!(
        table = schema.table,
        position = %schema.position,
        path = %db_path.display(),
        "loading POIs"
    );

    let pois = load_rows(&connection, &schema)?;
    Ok(PoiStore::from_pois(pois))
}

fn detect_schema(connection: &Connection) -> Result<SchemaDefinition> {
    for table in TABLE_CANDIDATES {
        if !table_exists(connection, table)? {
            continue;
        }
        let columns = table_columns(connection, table)?;
        let has = |name: &str| columns.iter().any(|c| c.eq_ignore_ascii_case(name));

        let Some(id_column) = ID_CANDIDATES.into_iter().find(|c| has(*c)) else {
            continue;
        };

        let position = LON_LAT_CANDIDATES
            .into_iter()
            .find(|(lon, lat)| has(*lon) && has(*lat))
            .map(|(lon, lat)| PositionSource::LonLat { lon, lat })
            .or_else(|| {
                ENCODED_CANDIDATES
                    .into_iter()
                    .find(|c| has(*c))
                    .map(|column| PositionSource::Encoded { column })
            });
        let Some(position) = position else {
            continue;
        };

        let attributes = ATTRIBUTE_COLUMNS.map(has);
        return Ok(SchemaDefinition {
            table,
            id_column,
            position,
            attributes,
        });
    }

    Err(Error::UnsupportedSchema)
}

fn select_sql(schema: &SchemaDefinition) -> String {
    let mut selects = vec![format!("{} AS poi_id", schema.id_column)];

    for (column, present) in ATTRIBUTE_COLUMNS.iter().zip(schema.attributes) {
        if present {
            selects.push(format!("\"{column}\""));
        } else {
            selects.push(format!("NULL AS \"{column}\""));
        }
    }

    match schema.position {
        PositionSource::LonLat { lon, lat } => {
            selects.push(format!("{lon} AS position_lon"));
            selects.push(format!("{lat} AS position_lat"));
        }
        PositionSource::Encoded { column } => {
            selects.push(format!("{column} AS position_geometry"));
        }
    }

    format!(
        "SELECT {selects} FROM {table} ORDER BY poi_id",
        selects = selects.join(", "),
        table = schema.table
    )
}

fn load_rows(connection: &Connection, schema: &SchemaDefinition) -> Result<Vec<Poi>> {
    let sql = select_sql(schema);
    let mut stmt = connection.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let position_index = 1 + ATTRIBUTE_COUNT;
    let mut pois = Vec::new();
    let mut skipped_rows = 0usize;
    let mut projected_rows = 0usize;

    while let Some(row) = rows.next()? {
        let id: PoiId = row.get(0)?;
        let position = match schema.position {
            PositionSource::LonLat { .. } => read_lon_lat(row, position_index)?,
            PositionSource::Encoded { .. } => read_encoded(row, position_index, id)?,
        };
        let Some(position) = position else {
            skipped_rows += 1;
            continue;
        };
        if !position.is_geographic() {
            projected_rows += 1;
        }
        pois.push(row_to_poi(row, id, position)?);
    }

    if skipped_rows > 0 {
        warn!(skipped_rows, "ignored POI rows without a position");
    }
    if projected_rows > 0 {
        warn!(
            projected_rows,
            "POI positions outside the longitude/latitude range; spherical queries skip them"
        );
    }

    Ok(pois)
}

fn read_lon_lat(row: &Row<'_>, index: usize) -> Result<Option<Position>> {
    match (
        row.get::<_, Option<f64>>(index)?,
        row.get::<_, Option<f64>>(index + 1)?,
    ) {
        (Some(lon), Some(lat)) => Ok(Some(Position::new(lon, lat))),
        _ => Ok(None),
    }
}

fn read_encoded(row: &Row<'_>, index: usize, id: PoiId) -> Result<Option<Position>> {
    let malformed = |message: String| Error::BackendUnavailable {
        reason: format!("malformed geometry for POI {id}: {message}"),
    };

    let geometry = match row.get_ref(index)? {
        ValueRef::Null => return Ok(None),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
            from_text(text)
        }
        ValueRef::Blob(bytes) => from_wkb(bytes),
        ValueRef::Integer(_) | ValueRef::Real(_) => {
            return Err(malformed("numeric value in geometry column".to_string()))
        }
    }
    .map_err(|e| malformed(e.to_string()))?;

    point_of(geometry)
        .map(Some)
        .map_err(|e| malformed(e.to_string()))
}

fn row_to_poi(row: &Row<'_>, id: PoiId, position: Position) -> rusqlite::Result<Poi> {
    Ok(Poi {
        id,
        position,
        name: row.get(1)?,
        amenity: row.get(2)?,
        shop: row.get(3)?,
        address: Address {
            housenumber: row.get(4)?,
            street: row.get(5)?,
            city: row.get(6)?,
            postcode: row.get(7)?,
            state: row.get(8)?,
        },
    })
}

fn table_exists(connection: &Connection, table: &str) -> Result<bool> {
    let mut stmt = connection
        .prepare("SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 LIMIT 1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}

fn table_columns(connection: &Connection, table: &str) -> Result<Vec<String>> {
    let pragma = format!("PRAGMA table_info('{table}')");
    let mut stmt = connection.prepare(&pragma)?;
    let mut rows = stmt.query([])?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        columns.push(name);
    }
    Ok(columns)
}
