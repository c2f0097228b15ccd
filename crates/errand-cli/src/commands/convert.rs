//! Convert command handler: re-encode geometry text in another format.

use anyhow::{Context, Result};

use errand_lib::format::{from_text_with_srid, geometry_kind};
use errand_lib::{to_text, GeometryFormat, WGS84_SRID};

use crate::output::{ConversionSummary, OutputFormat};

/// Arguments for the convert command.
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    /// Geometry text in any supported format.
    pub input: String,
    pub to: GeometryFormat,
    /// SRID written by EWKT; defaults to the input's SRID, then WGS84.
    pub srid: Option<u32>,
}

pub fn convert(args: &ConvertArgs) -> Result<ConversionSummary> {
    let (geometry, input_srid) =
        from_text_with_srid(&args.input).context("failed to parse input geometry")?;
    let srid = args.srid.or(input_srid);
    let text = to_text(&geometry, args.to, srid.unwrap_or(WGS84_SRID))
        .with_context(|| format!("failed to encode geometry as {}", args.to))?;

    Ok(ConversionSummary {
        kind: geometry_kind(&geometry),
        format: args.to,
        srid: srid.filter(|_| args.to == GeometryFormat::Ewkt),
        text,
    })
}

pub fn handle_convert(args: &ConvertArgs, format: OutputFormat) -> Result<()> {
    let summary = convert(args)?;
    print!("{}", format.render_conversion(&summary)?);
    Ok(())
}
