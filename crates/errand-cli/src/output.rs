//! Output formatting for command results.
//!
//! Library summaries render themselves as plain or rich text; this module
//! picks the mode from `--format` and adds the CLI-only views (single
//! nearest lookups, containment listings and format conversions).

use std::fmt::Write;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use errand_lib::{
    BoundaryRule, ErrandSummary, GeometryFormat, Metric, PoiSummary, Position, StopSummary,
    SummaryRenderMode,
};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Markdown.
    Rich,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Render an errand summary in this format.
    pub fn render_errand(self, summary: &ErrandSummary) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(summary.render(SummaryRenderMode::PlainText)),
            OutputFormat::Rich => Ok(summary.render(SummaryRenderMode::RichText)),
            OutputFormat::Json => render_json(summary),
        }
    }

    pub fn render_nearest(self, summary: &NearestSummary) -> Result<String> {
        match self {
            OutputFormat::Json => render_json(summary),
            OutputFormat::Text | OutputFormat::Rich => Ok(summary.render_text()),
        }
    }

    pub fn render_within(self, summary: &WithinSummary) -> Result<String> {
        match self {
            OutputFormat::Json => render_json(summary),
            OutputFormat::Text | OutputFormat::Rich => Ok(summary.render_text()),
        }
    }

    pub fn render_conversion(self, summary: &ConversionSummary) -> Result<String> {
        match self {
            OutputFormat::Json => render_json(summary),
            OutputFormat::Text | OutputFormat::Rich => Ok(format!("{}\n", summary.text)),
        }
    }
}

/// Serialize any summary as pretty JSON followed by a newline.
pub fn render_json<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Result of a single `nearest` lookup.
#[derive(Debug, Clone, Serialize)]
pub struct NearestSummary {
    pub origin: Position,
    pub filter: String,
    pub radius: f64,
    pub metric: Metric,
    pub unit: &'static str,
    pub stop: Option<StopSummary>,
}

impl NearestSummary {
    pub fn render_text(&self) -> String {
        match &self.stop {
            Some(stop) => format!(
                "Nearest {} within {} {} of {}:\n{}\n",
                self.filter,
                self.radius,
                self.unit,
                self.origin,
                stop.render_line(self.unit)
            ),
            None => format!(
                "No POI matching {} within {} {} of {}.\n",
                self.filter, self.radius, self.unit, self.origin
            ),
        }
    }
}

/// POIs found inside an area.
#[derive(Debug, Clone, Serialize)]
pub struct WithinSummary {
    pub boundary: BoundaryRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub pois: Vec<PoiSummary>,
}

impl WithinSummary {
    pub fn render_text(&self) -> String {
        let mut buffer = String::new();
        let scope = self.filter.as_deref().unwrap_or("POIs");
        let _ = writeln!(
            buffer,
            "{} {} inside area (boundary {}):",
            self.pois.len(),
            scope,
            self.boundary
        );
        for poi in &self.pois {
            let name = poi.name.as_deref().unwrap_or("<unnamed>");
            let _ = write!(buffer, "  - {} ({})", name, poi.id);
            if let Some(category) = &poi.category {
                let _ = write!(buffer, " [{category}]");
            }
            let _ = writeln!(buffer, " at {}", poi.position);
        }
        buffer
    }
}

/// Outcome of a `convert` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub kind: &'static str,
    pub format: GeometryFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srid: Option<u32>,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop() -> StopSummary {
        StopSummary {
            index: 1,
            filter: "shop=electronics:Best Buy".to_string(),
            poi: PoiSummary {
                id: 1,
                name: Some("Best Buy".to_string()),
                category: Some("electronics".to_string()),
                address: Some("529 5th Avenue, New York, NY".to_string()),
                position: Position::new(-73.9806, 40.75378),
            },
            distance: 520.41,
        }
    }

    fn nearest(stop: Option<StopSummary>) -> NearestSummary {
        NearestSummary {
            origin: Position::new(-73.986226, 40.755702),
            filter: "shop=electronics:Best Buy".to_string(),
            radius: 1600.0,
            metric: Metric::Spherical,
            unit: "m",
            stop,
        }
    }

    #[test]
    fn nearest_text_lists_the_stop() {
        let text = OutputFormat::Text
            .render_nearest(&nearest(Some(stop())))
            .unwrap();
        assert!(text.starts_with(
            "Nearest shop=electronics:Best Buy within 1600 m of -73.986226,40.755702:"
        ));
        assert!(text.contains("Best Buy (1) [electronics], 529 5th Avenue, New York, NY 520.41 m"));
    }

    #[test]
    fn nearest_without_match_is_explicit() {
        let text = OutputFormat::Text.render_nearest(&nearest(None)).unwrap();
        assert!(text.starts_with("No POI matching shop=electronics:Best Buy within 1600 m"));

        let json = OutputFormat::Json.render_nearest(&nearest(None)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["stop"].is_null());
        assert_eq!(value["metric"]["kind"], "spherical");
    }

    #[test]
    fn within_text_counts_pois() {
        let summary = WithinSummary {
            boundary: BoundaryRule::Exclusive,
            filter: Some("shop=electronics".to_string()),
            pois: vec![stop().poi],
        };
        let text = OutputFormat::Text.render_within(&summary).unwrap();
        assert!(text.starts_with("1 shop=electronics inside area (boundary exclusive):"));
        assert!(text.contains("  - Best Buy (1) [electronics] at -73.9806,40.75378"));
    }

    #[test]
    fn conversion_text_is_the_bare_geometry() {
        let summary = ConversionSummary {
            kind: "Point",
            format: GeometryFormat::Wkt,
            srid: None,
            text: "POINT(1 2)".to_string(),
        };
        assert_eq!(
            OutputFormat::Text.render_conversion(&summary).unwrap(),
            "POINT(1 2)\n"
        );
        let json = OutputFormat::Json.render_conversion(&summary).unwrap();
        assert!(json.contains("\"format\": \"wkt\""));
    }
}
