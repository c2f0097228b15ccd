use std::fmt::Write;

use serde::Serialize;

use crate::compose::{round_to_hundredths, StopSelection};
use crate::db::{Poi, PoiId};
use crate::error::Result;
use crate::format::{to_text, GeometryFormat};
use crate::geometry::{Metric, Position};
use crate::routing::ErrandPlan;

/// Presentation style for turning an [`ErrandSummary`] into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryRenderMode {
    PlainText,
    RichText,
}

/// A POI as shown to users.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PoiSummary {
    pub id: PoiId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub position: Position,
}

impl PoiSummary {
    pub fn from_poi(poi: &Poi) -> Self {
        Self {
            id: poi.id,
            name: poi.name.clone(),
            category: poi.category().map(str::to_string),
            address: poi.address.one_line(),
            position: poi.position,
        }
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    fn render_plain(&self) -> String {
        let mut line = format!("{} ({})", self.display_name(), self.id);
        if let Some(category) = &self.category {
            let _ = write!(line, " [{category}]");
        }
        if let Some(address) = &self.address {
            let _ = write!(line, ", {address}");
        }
        line
    }
}

/// One selected stop of an errand.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopSummary {
    /// 1-based position along the route.
    pub index: usize,
    pub filter: String,
    pub poi: PoiSummary,
    pub distance: f64,
}

impl StopSummary {
    /// Summarise a non-empty selection; returns None when nothing was selected.
    pub fn from_selection(index: usize, selection: &StopSelection) -> Option<Self> {
        let poi = selection.poi.as_ref()?;
        Some(Self {
            index,
            filter: selection.filter.to_string(),
            poi: PoiSummary::from_poi(poi),
            distance: selection.distance_meters()?,
        })
    }

    /// Single-line rendering, e.g. `1. Best Buy (42) [electronics] 520.41 m`.
    pub fn render_line(&self, unit: &str) -> String {
        format!(
            "{:>2}. {} {:.2} {unit}",
            self.index,
            self.poi.render_plain(),
            self.distance
        )
    }
}

/// Structured representation of a planned errand that consumers can serialise.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrandSummary {
    pub origin: Position,
    pub metric: Metric,
    pub radius: f64,
    pub unit: &'static str,
    pub stops: Vec<StopSummary>,
    pub missed: Vec<String>,
    pub route: Vec<Position>,
    pub closed: bool,
    pub unique_positions: usize,
    pub geometry_format: GeometryFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perimeter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub within: Option<Vec<PoiSummary>>,
}

impl ErrandSummary {
    /// Convert an [`ErrandPlan`] into a summary, encoding the path in `format`.
    pub fn from_plan(plan: &ErrandPlan, format: GeometryFormat) -> Result<Self> {
        let stops = plan
            .selections
            .iter()
            .filter(|selection| !selection.is_empty())
            .enumerate()
            .filter_map(|(index, selection)| StopSummary::from_selection(index + 1, selection))
            .collect();
        let missed = plan
            .missed_filters()
            .into_iter()
            .map(|filter| filter.to_string())
            .collect();

        let path = plan
            .path
            .as_ref()
            .map(|path| to_text(&path.to_geometry(), format, plan.metric.srid()))
            .transpose()?;
        let (closed, unique_positions) = match &plan.path {
            Some(path) => (path.is_closed(), path.unique_positions().len()),
            None => (false, plan.route.positions().len()),
        };

        Ok(Self {
            origin: plan.route.origin(),
            metric: plan.metric,
            radius: plan.radius,
            unit: plan.metric.length_unit(),
            stops,
            missed,
            route: plan.route.positions().to_vec(),
            closed,
            unique_positions,
            geometry_format: format,
            path,
            length: plan.length.map(round_to_hundredths),
            area: plan.area.map(round_to_hundredths),
            perimeter: plan.perimeter.map(round_to_hundredths),
            within: plan
                .shops_within
                .as_ref()
                .map(|pois| pois.iter().map(PoiSummary::from_poi).collect()),
        })
    }

    /// Render the summary using the requested textual mode.
    pub fn render(&self, mode: SummaryRenderMode) -> String {
        match mode {
            SummaryRenderMode::PlainText => self.render_plain(),
            SummaryRenderMode::RichText => self.render_rich(),
        }
    }

    fn requested(&self) -> usize {
        self.stops.len() + self.missed.len()
    }

    fn render_plain(&self) -> String {
        let mut buffer = String::new();
        let _ = writeln!(
            buffer,
            "Errand from {} ({} of {} stops within {} {}, {}):",
            self.origin,
            self.stops.len(),
            self.requested(),
            self.radius,
            self.unit,
            self.metric
        );
        for stop in &self.stops {
            let _ = writeln!(buffer, "{}", stop.render_line(self.unit));
        }
        if !self.missed.is_empty() {
            let _ = writeln!(buffer, "Missed: {}", self.missed.join(", "));
        }

        if let Some(path) = &self.path {
            let _ = writeln!(buffer, "Path ({}): {path}", self.geometry_format);
        }
        if let Some(length) = self.length {
            let _ = writeln!(buffer, "Length: {length:.2} {}", self.unit);
        }
        if let Some(area) = self.area {
            let _ = writeln!(buffer, "Area: {area:.2} {}²", self.unit);
        }
        if let Some(perimeter) = self.perimeter {
            let _ = writeln!(buffer, "Perimeter: {perimeter:.2} {}", self.unit);
        }
        if let Some(within) = &self.within {
            let _ = writeln!(buffer, "Within loop ({}):", within.len());
            for poi in within {
                let _ = writeln!(buffer, "  - {}", poi.render_plain());
            }
        }
        buffer
    }

    fn render_rich(&self) -> String {
        let mut buffer = String::new();
        let _ = writeln!(
            buffer,
            "**Errand** from `{}` ({} of {} stops within {} {}, {})",
            self.origin,
            self.stops.len(),
            self.requested(),
            self.radius,
            self.unit,
            self.metric
        );
        let _ = writeln!(buffer);
        for stop in &self.stops {
            let _ = write!(
                buffer,
                "{}. **{}** `{}` {:.2} {}",
                stop.index,
                stop.poi.display_name(),
                stop.filter,
                stop.distance,
                self.unit
            );
            match &stop.poi.address {
                Some(address) => {
                    let _ = writeln!(buffer, " _{address}_");
                }
                None => {
                    let _ = writeln!(buffer);
                }
            }
        }
        for filter in &self.missed {
            let _ = writeln!(buffer, "* ~~`{filter}`~~ nothing within radius");
        }

        let _ = writeln!(buffer);
        if let Some(length) = self.length {
            let _ = writeln!(buffer, "| Length | {length:.2} {} |", self.unit);
        }
        if let Some(area) = self.area {
            let _ = writeln!(buffer, "| Area | {area:.2} {}² |", self.unit);
        }
        if let Some(perimeter) = self.perimeter {
            let _ = writeln!(buffer, "| Perimeter | {perimeter:.2} {} |", self.unit);
        }
        if let Some(path) = &self.path {
            let _ = writeln!(buffer, "\n```{}\n{path}\n```", self.geometry_format);
        }
        if let Some(within) = &self.within {
            let _ = writeln!(buffer, "\n**Within loop** ({})", within.len());
            for poi in within {
                let _ = writeln!(buffer, "* {}", poi.render_plain());
            }
        }
        buffer
    }
}
