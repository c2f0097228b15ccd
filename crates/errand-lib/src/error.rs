use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the errand library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// POI database could not be located at the resolved path.
    #[error("POI database not found at {path}")]
    DatabaseNotFound { path: PathBuf },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the POI database")]
    ProjectDirsUnavailable,

    /// Raised when the database layout matches none of the supported schemas.
    #[error("unsupported POI schema; expected a pois or planet_osm_point table with lon/lat or coordinates columns")]
    UnsupportedSchema,

    /// The spatial data backend is unreachable or handed back malformed geometry.
    #[error("spatial data backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    /// Raised in strict planning when a category found nothing inside the radius.
    #[error("no POI matching {filter} within {radius}m{}", format_suggestions(.suggestions))]
    NoMatch {
        filter: String,
        radius: f64,
        suggestions: Vec<String>,
    },

    /// Raised when a line is requested from fewer than two positions.
    #[error("a path needs at least 2 positions, got {count}")]
    InsufficientPoints { count: usize },

    /// Raised when an area or perimeter is requested on an open path.
    #[error("path is not closed; first and last positions differ")]
    NotClosed,

    /// Raised when a search radius is zero, negative or not finite.
    #[error("search radius must be a positive number of metres, got {radius}")]
    InvalidRadius { radius: f64 },

    /// Raised when a category filter cannot be parsed or names an unknown attribute.
    #[error("invalid category filter '{input}': {reason}")]
    InvalidFilter { input: String, reason: String },

    /// Raised when a position is outside the longitude/latitude domain.
    #[error("invalid position ({lon}, {lat})")]
    InvalidPosition { lon: f64, lat: f64 },

    /// Raised when geometry text or bytes fail to encode or decode.
    #[error("geometry format error: {message}")]
    GeometryFormat { message: String },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Raised when serializing a spatial index fails.
    #[error("failed to serialize spatial index: {message}")]
    SpatialIndexSerialize { message: String },

    /// Raised when loading a spatial index from a file fails.
    #[error("failed to load spatial index from {path}: {message}")]
    SpatialIndexLoad { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn geometry_format(message: impl std::fmt::Display) -> Self {
        Error::GeometryFormat {
            message: message.to_string(),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else if suggestions.len() == 1 {
        format!(". Did you mean '{}'?", suggestions[0])
    } else {
        format!(
            ". Did you mean one of: {}?",
            suggestions
                .iter()
                .map(|s| format!("'{}'", s))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
