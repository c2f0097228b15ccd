//! R-tree spatial index used as the distance-bounded pre-filter for POI reads.
//!
//! Two trees are kept over the same nodes:
//!
//! - a 3-D tree of unit-sphere Cartesian coordinates. Chord length grows
//!   monotonically with great-circle distance, so a radius in metres maps to
//!   an exact chord radius and the tree returns a superset of the POIs inside
//!   the great-circle radius;
//! - a 2-D tree of raw coordinates for planar (GEOMETRY) queries.
//!
//! # Serialization Format
//!
//! ```text
//! Header (16 bytes):
//!   - Magic: b"ERPI" (4 bytes)
//!   - Version: u8 (1 byte)
//!   - Flags: u8 (1 byte), reserved
//!   - Node count: u32 (4 bytes)
//!   - Reserved: 6 bytes
//!
//! Body:
//!   - postcard-serialized Vec<IndexNode>
//!   - zstd compressed
//!
//! Footer (32 bytes):
//!   - SHA-256 checksum of compressed body
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::db::{PoiId, PoiStore};
use crate::error::{Error, Result};
use crate::geometry::{unit_chord, Metric, Position};

/// Magic bytes identifying a POI index file.
const INDEX_MAGIC: &[u8; 4] = b"ERPI";

/// Current index format version.
const INDEX_VERSION: u8 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 16;

/// Checksum size in bytes (SHA-256).
const CHECKSUM_SIZE: usize = 32;

/// zstd compression level (balanced speed/ratio).
const COMPRESSION_LEVEL: i32 = 3;

/// Relative slack applied to query radii so rounding never drops a boundary POI.
const RADIUS_SLACK: f64 = 1e-9;

type SphereEntry = GeomWithData<[f64; 3], usize>;
type PlaneEntry = GeomWithData<[f64; 2], usize>;

/// Index node stored per POI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexNode {
    pub poi_id: PoiId,
    pub lon: f64,
    pub lat: f64,
}

impl IndexNode {
    fn position(&self) -> Position {
        Position::new(self.lon, self.lat)
    }
}

/// Spatial pre-filter over the positions of a [`PoiStore`].
pub struct PoiIndex {
    sphere: RTree<SphereEntry>,
    plane: RTree<PlaneEntry>,
    nodes: Vec<IndexNode>,
}

impl PoiIndex {
    /// Build an index over every POI in the store.
    pub fn build(store: &PoiStore) -> Self {
        let nodes = store
            .iter()
            .map(|poi| IndexNode {
                poi_id: poi.id,
                lon: poi.position.lon,
                lat: poi.position.lat,
            })
            .collect::<Vec<_>>();

        let index = Self::from_nodes(nodes);
        info!(node_count = index.len(), "built POI index");
        index
    }

    fn from_nodes(nodes: Vec<IndexNode>) -> Self {
        let sphere = RTree::bulk_load(
            nodes
                .iter()
                .enumerate()
                .map(|(slot, node)| GeomWithData::new(node.position().unit_vector(), slot))
                .collect(),
        );
        let plane = RTree::bulk_load(
            nodes
                .iter()
                .enumerate()
                .map(|(slot, node)| GeomWithData::new([node.lon, node.lat], slot))
                .collect(),
        );

        Self {
            sphere,
            plane,
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identifiers of the POIs that may lie within `radius` of `origin`.
    ///
    /// The result is a superset of the exact answer and is not ordered.
    pub fn candidates_within(&self, origin: Position, radius: f64, metric: Metric) -> Vec<PoiId> {
        if radius <= 0.0 || self.nodes.is_empty() {
            return Vec::new();
        }

        let slots: Vec<usize> = match metric {
            Metric::Spherical => {
                let chord = unit_chord(radius) * (1.0 + RADIUS_SLACK);
                self.sphere
                    .locate_within_distance(origin.unit_vector(), chord * chord)
                    .map(|entry| entry.data)
                    .collect()
            }
            Metric::Planar { .. } => {
                let reach = radius * (1.0 + RADIUS_SLACK);
                self.plane
                    .locate_within_distance([origin.lon, origin.lat], reach * reach)
                    .map(|entry| entry.data)
                    .collect()
            }
        };

        slots
            .into_iter()
            .map(|slot| self.nodes[slot].poi_id)
            .collect()
    }

    /// True when the index covers exactly the POIs of `store` at the same positions.
    pub fn is_consistent_with(&self, store: &PoiStore) -> bool {
        self.nodes.len() == store.len()
            && self
                .nodes
                .iter()
                .all(|node| store.get(node.poi_id).map(|poi| poi.position) == Some(node.position()))
    }

    /// Serialize the index to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        info!(path = %path.display(), nodes = self.nodes.len(), "saving POI index");

        let serialized =
            postcard::to_allocvec(&self.nodes).map_err(|e| Error::SpatialIndexSerialize {
                message: format!("postcard serialization failed: {}", e),
            })?;

        let compressed =
            zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL).map_err(|e| {
                Error::SpatialIndexSerialize {
                    message: format!("zstd compression failed: {}", e),
                }
            })?;

        let checksum = Sha256::digest(&compressed);

        let node_count = self.nodes.len() as u32;
        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(INDEX_MAGIC);
        header[4] = INDEX_VERSION;
        header[6..10].copy_from_slice(&node_count.to_le_bytes());

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&header)?;
        writer.write_all(&compressed)?;
        writer.write_all(&checksum)?;
        writer.flush()?;

        debug!(
            file_size = HEADER_SIZE + compressed.len() + CHECKSUM_SIZE,
            "POI index saved"
        );
        Ok(())
    }

    /// Load an index from a file, validating header and checksum.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading POI index");
        let load_error = |message: String| Error::SpatialIndexLoad {
            path: path.to_path_buf(),
            message,
        };

        let bytes =
            std::fs::read(path).map_err(|e| load_error(format!("failed to read file: {}", e)))?;
        if bytes.len() < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(load_error("file is truncated".to_string()));
        }

        let (header, rest) = bytes.split_at(HEADER_SIZE);
        let (compressed, stored_checksum) = rest.split_at(rest.len() - CHECKSUM_SIZE);

        if &header[0..4] != INDEX_MAGIC {
            return Err(load_error("invalid magic bytes".to_string()));
        }
        let version = header[4];
        if version != INDEX_VERSION {
            return Err(load_error(format!(
                "unsupported version {} (expected {})",
                version, INDEX_VERSION
            )));
        }
        let node_count = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);

        if Sha256::digest(compressed).as_slice() != stored_checksum {
            return Err(load_error(
                "checksum mismatch - file may be corrupted".to_string(),
            ));
        }

        let decompressed = zstd::decode_all(compressed)
            .map_err(|e| load_error(format!("zstd decompression failed: {}", e)))?;
        let nodes: Vec<IndexNode> = postcard::from_bytes(&decompressed)
            .map_err(|e| load_error(format!("postcard deserialization failed: {}", e)))?;

        if nodes.len() != node_count as usize {
            warn!(
                expected = node_count,
                actual = nodes.len(),
                "node count mismatch in POI index"
            );
        }

        let index = Self::from_nodes(nodes);
        info!(node_count = index.len(), "loaded POI index");
        Ok(index)
    }
}

impl std::fmt::Debug for PoiIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoiIndex")
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

/// Derive the index path from a database path: `pois.db` -> `pois.db.spatial.bin`.
pub fn spatial_index_path(db_path: &Path) -> PathBuf {
    let mut path = db_path.as_os_str().to_owned();
    path.push(".spatial.bin");
    PathBuf::from(path)
}

/// Attempt to load the index stored beside a database, returning None if absent or unreadable.
pub fn try_load_spatial_index(db_path: &Path) -> Option<PoiIndex> {
    try_load_index_file(&spatial_index_path(db_path))
}

/// Attempt to load an index file, returning None if absent or unreadable.
pub fn try_load_index_file(index_path: &Path) -> Option<PoiIndex> {
    if !index_path.exists() {
        return None;
    }

    match PoiIndex::load(index_path) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!(
                path = %index_path.display(),
                error = %e,
                "failed to load POI index, will rebuild"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::distance;
    use crate::test_helpers::PoiBuilder;

    fn store() -> PoiStore {
        PoiStore::from_pois(vec![
            PoiBuilder::new(1).at(-73.9860, 40.7557).build(),
            PoiBuilder::new(2).at(-73.9806, 40.7538).build(),
            PoiBuilder::new(3).at(-73.9897, 40.7359).build(),
        ])
    }

    #[test]
    fn build_empty_store() {
        let index = PoiIndex::build(&PoiStore::default());
        assert!(index.is_empty());
        assert!(index
            .candidates_within(Position::new(0.0, 0.0), 1000.0, Metric::Spherical)
            .is_empty());
    }

    #[test]
    fn spherical_candidates_cover_exact_radius() {
        let store = store();
        let index = PoiIndex::build(&store);
        let origin = Position::new(-73.986226, 40.755702);

        let mut ids = index.candidates_within(origin, 1600.0, Metric::Spherical);
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);

        // A radius equal to the exact distance still includes the POI.
        let exact = distance(origin, store.get(2).unwrap().position, Metric::Spherical);
        let ids = index.candidates_within(origin, exact, Metric::Spherical);
        assert!(ids.contains(&2));
    }

    #[test]
    fn planar_candidates_use_coordinate_units() {
        let store = PoiStore::from_pois(vec![
            PoiBuilder::new(1).at(0.0, 0.0).build(),
            PoiBuilder::new(2).at(3.0, 4.0).build(),
            PoiBuilder::new(3).at(10.0, 0.0).build(),
        ]);
        let index = PoiIndex::build(&store);
        let mut ids =
            index.candidates_within(Position::new(0.0, 0.0), 5.0, Metric::Planar { srid: 0 });
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn consistency_check_spots_moved_pois() {
        let original = store();
        let index = PoiIndex::build(&original);
        assert!(index.is_consistent_with(&original));

        let moved = PoiStore::from_pois(vec![
            PoiBuilder::new(1).at(-73.9860, 40.7557).build(),
            PoiBuilder::new(2).at(-73.0, 40.0).build(),
            PoiBuilder::new(3).at(-73.9897, 40.7359).build(),
        ]);
        assert!(!index.is_consistent_with(&moved));
    }
}
