//! Text and binary geometry representations.
//!
//! Supported formats mirror the usual GEOGRAPHY output choices: WKT, EWKT,
//! WKB (carried as lowercase hex when it has to travel as text) and GeoJSON.
//! Encoding and decoding are delegated to `geozero`.

use std::fmt;
use std::str::FromStr;

use geo::Geometry;
use geozero::geojson::GeoJson;
use geozero::wkb::Wkb;
use geozero::wkt::Wkt;
use geozero::{CoordDimensions, ToGeo, ToJson, ToWkb, ToWkt};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::geometry::Position;

/// Output/input representation of a geometry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryFormat {
    #[default]
    Wkt,
    Ewkt,
    Wkb,
    #[serde(rename = "geojson")]
    GeoJson,
}

impl fmt::Display for GeometryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GeometryFormat::Wkt => "wkt",
            GeometryFormat::Ewkt => "ewkt",
            GeometryFormat::Wkb => "wkb",
            GeometryFormat::GeoJson => "geojson",
        })
    }
}

impl FromStr for GeometryFormat {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.to_ascii_lowercase().as_str() {
            "wkt" => Ok(GeometryFormat::Wkt),
            "ewkt" => Ok(GeometryFormat::Ewkt),
            "wkb" => Ok(GeometryFormat::Wkb),
            "geojson" | "json" => Ok(GeometryFormat::GeoJson),
            other => Err(Error::geometry_format(format!(
                "unknown geometry format '{other}' (expected wkt, ewkt, wkb or geojson)"
            ))),
        }
    }
}

/// Encode a geometry as text. `srid` is only written by EWKT.
pub fn to_text(geometry: &Geometry<f64>, format: GeometryFormat, srid: u32) -> Result<String> {
    match format {
        GeometryFormat::Wkt => geometry.to_wkt().map_err(Error::geometry_format),
        GeometryFormat::Ewkt => geometry
            .to_ewkt(Some(srid as i32))
            .map_err(Error::geometry_format),
        GeometryFormat::Wkb => Ok(hex::encode(to_wkb(geometry)?)),
        GeometryFormat::GeoJson => geometry.to_json().map_err(Error::geometry_format),
    }
}

/// Encode a geometry as OGC WKB (little endian, 2D).
pub fn to_wkb(geometry: &Geometry<f64>) -> Result<Vec<u8>> {
    geometry
        .to_wkb(CoordDimensions::xy())
        .map_err(Error::geometry_format)
}

/// Decode OGC/ISO WKB (or EWKB) bytes.
///
/// Element counts are checked against the buffer before decoding, so a
/// header claiming more points than the bytes can hold is rejected instead
/// of driving a huge allocation.
pub fn from_wkb(bytes: &[u8]) -> Result<Geometry<f64>> {
    WkbCursor::new(bytes).check_geometry(0)?;
    Wkb(bytes).to_geo().map_err(Error::geometry_format)
}

/// Deepest collection nesting accepted in WKB input.
const MAX_WKB_DEPTH: usize = 32;

/// Smallest encoded sub-geometry: byte order plus type code.
const WKB_HEADER_SIZE: usize = 5;

/// Read-only walk over a WKB buffer that validates its structure.
struct WkbCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> WkbCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        if len > self.remaining() {
            return Err(Error::geometry_format(format!(
                "WKB truncated at byte {}",
                self.offset
            )));
        }
        self.offset += len;
        Ok(())
    }

    fn byte(&mut self) -> Result<u8> {
        let value = *self
            .bytes
            .get(self.offset)
            .ok_or_else(|| Error::geometry_format("WKB truncated"))?;
        self.offset += 1;
        Ok(value)
    }

    fn u32(&mut self, little_endian: bool) -> Result<u32> {
        let start = self.offset;
        self.skip(4)?;
        let raw = [
            self.bytes[start],
            self.bytes[start + 1],
            self.bytes[start + 2],
            self.bytes[start + 3],
        ];
        Ok(if little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    /// Read an element count whose elements need at least `element_size` bytes each.
    fn count(&mut self, little_endian: bool, element_size: usize) -> Result<usize> {
        let count = self.u32(little_endian)? as usize;
        let needed = count.checked_mul(element_size);
        match needed {
            Some(needed) if needed <= self.remaining() => Ok(count),
            _ => Err(Error::geometry_format(format!(
                "WKB declares {count} elements but only {} bytes remain",
                self.remaining()
            ))),
        }
    }

    fn check_geometry(&mut self, depth: usize) -> Result<()> {
        if depth > MAX_WKB_DEPTH {
            return Err(Error::geometry_format("WKB collections nested too deeply"));
        }

        let little_endian = match self.byte()? {
            0 => false,
            1 => true,
            other => {
                return Err(Error::geometry_format(format!(
                    "invalid WKB byte order {other}"
                )))
            }
        };

        // EWKB flags in the high bits, ISO dimensions in the thousands.
        let raw_type = self.u32(little_endian)?;
        let ewkb_z = raw_type & 0x8000_0000 != 0;
        let ewkb_m = raw_type & 0x4000_0000 != 0;
        let has_srid = raw_type & 0x2000_0000 != 0;
        let code = raw_type & 0x0fff_ffff;
        let iso_dims = match code / 1000 {
            0 => 0,
            1 | 2 => 1,
            3 => 2,
            _ => {
                return Err(Error::geometry_format(format!(
                    "unsupported WKB type {raw_type:#x}"
                )))
            }
        };
        let dims = 2 + iso_dims + usize::from(ewkb_z) + usize::from(ewkb_m);
        let point_size = 8 * dims;

        if has_srid {
            self.skip(4)?;
        }

        match code % 1000 {
            1 => self.skip(point_size),
            2 => {
                let points = self.count(little_endian, point_size)?;
                self.skip(points * point_size)
            }
            3 => {
                let rings = self.count(little_endian, 4)?;
                for _ in 0..rings {
                    let points = self.count(little_endian, point_size)?;
                    self.skip(points * point_size)?;
                }
                Ok(())
            }
            4..=7 => {
                let parts = self.count(little_endian, WKB_HEADER_SIZE)?;
                for _ in 0..parts {
                    self.check_geometry(depth + 1)?;
                }
                Ok(())
            }
            _ => Err(Error::geometry_format(format!(
                "unsupported WKB type {raw_type:#x}"
            ))),
        }
    }
}

/// Detect the representation of `text`.
pub fn detect_format(text: &str) -> GeometryFormat {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') {
        GeometryFormat::GeoJson
    } else if split_srid(trimmed).is_some() {
        GeometryFormat::Ewkt
    } else if !trimmed.is_empty()
        && trimmed.len() % 2 == 0
        && trimmed.chars().all(|c| c.is_ascii_hexdigit())
    {
        GeometryFormat::Wkb
    } else {
        GeometryFormat::Wkt
    }
}

/// Decode geometry text in any supported format.
pub fn from_text(text: &str) -> Result<Geometry<f64>> {
    from_text_with_srid(text).map(|(geometry, _)| geometry)
}

/// Decode geometry text, also returning the SRID when the text carried one.
pub fn from_text_with_srid(text: &str) -> Result<(Geometry<f64>, Option<u32>)> {
    let trimmed = text.trim();
    match detect_format(trimmed) {
        GeometryFormat::GeoJson => GeoJson(trimmed)
            .to_geo()
            .map(|geometry| (geometry, None))
            .map_err(Error::geometry_format),
        GeometryFormat::Ewkt => {
            let (srid, body) = split_srid(trimmed)
                .ok_or_else(|| Error::geometry_format("malformed SRID prefix"))?;
            let geometry = Wkt(body).to_geo().map_err(Error::geometry_format)?;
            Ok((geometry, Some(srid)))
        }
        GeometryFormat::Wkb => {
            let bytes = hex::decode(trimmed).map_err(Error::geometry_format)?;
            from_wkb(&bytes).map(|geometry| (geometry, None))
        }
        GeometryFormat::Wkt => Wkt(trimmed)
            .to_geo()
            .map(|geometry| (geometry, None))
            .map_err(Error::geometry_format),
    }
}

pub fn position_to_text(position: Position, format: GeometryFormat, srid: u32) -> Result<String> {
    to_text(&Geometry::Point(position.to_point()), format, srid)
}

/// Decode text that must describe a single point.
pub fn position_from_text(text: &str) -> Result<Position> {
    point_of(from_text(text)?)
}

/// Extract the position of a point geometry.
pub fn point_of(geometry: Geometry<f64>) -> Result<Position> {
    match geometry {
        Geometry::Point(point) => Ok(point.into()),
        other => Err(Error::geometry_format(format!(
            "expected a point, got {}",
            geometry_kind(&other)
        ))),
    }
}

pub fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn split_srid(text: &str) -> Option<(u32, &str)> {
    let rest = text
        .strip_prefix("SRID=")
        .or_else(|| text.strip_prefix("srid="))?;
    let (srid, body) = rest.split_once(';')?;
    let srid = srid.trim().parse().ok()?;
    Some((srid, body.trim()))
}
