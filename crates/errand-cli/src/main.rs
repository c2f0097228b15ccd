use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use errand_cli::commands::convert::{handle_convert, ConvertArgs};
use errand_cli::commands::index::{handle_index_build, IndexBuildArgs};
use errand_cli::commands::nearest::{handle_nearest, NearestArgs};
use errand_cli::commands::route::{handle_route, RouteCommandArgs};
use errand_cli::commands::within::{handle_within, WithinArgs};
use errand_cli::output::OutputFormat;
use errand_lib::{
    BoundaryRule, CategoryFilter, GeometryFormat, Position, DEFAULT_RADIUS_METERS,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Nearest-POI lookups and errand route planning")]
struct Cli {
    /// Path to the POI database (file or directory). Overrides ERRAND_DATABASE.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

/// Where and how far to search.
#[derive(Args, Debug, Clone)]
struct SearchArgs {
    /// Starting position as LON,LAT.
    #[arg(long, default_value = "-73.986226,40.755702", allow_hyphen_values = true)]
    origin: Position,

    /// Search radius in metres.
    #[arg(long, default_value_t = DEFAULT_RADIUS_METERS)]
    radius: f64,

    /// Measure in planar coordinate units of this SRID instead of great-circle metres.
    #[arg(long)]
    planar_srid: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the nearest POI matching a category.
    Nearest {
        /// Category filter: KEY=VALUE or KEY=VALUE:NAME (e.g. shop=electronics:Best Buy).
        #[arg(long)]
        category: CategoryFilter,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Select a stop per category and compose them into an errand loop.
    Route {
        /// Category filter for one stop; repeat in visiting order.
        #[arg(long = "stop", required = true)]
        stops: Vec<CategoryFilter>,

        #[command(flatten)]
        search: SearchArgs,

        /// End at the last stop instead of returning to the origin.
        #[arg(long)]
        open: bool,

        /// Fail when a stop finds no POI instead of skipping it.
        #[arg(long)]
        strict: bool,

        /// List every POI enclosed by the loop.
        #[arg(long)]
        list_within: bool,

        /// Whether POIs on the loop's boundary count as enclosed.
        #[arg(long, default_value = "exclusive")]
        boundary: BoundaryRule,

        /// Encoding of the path geometry: wkt, ewkt, wkb or geojson.
        #[arg(long, default_value = "wkt")]
        geometry_format: GeometryFormat,
    },
    /// List POIs inside an area.
    Within {
        /// Polygon or closed line string as WKT, EWKT, hex WKB or GeoJSON.
        #[arg(long)]
        area: String,

        /// Only list POIs matching this category filter.
        #[arg(long)]
        category: Option<CategoryFilter>,

        /// Whether POIs on the boundary count as inside.
        #[arg(long, default_value = "exclusive")]
        boundary: BoundaryRule,
    },
    /// Re-encode geometry text in another format.
    Convert {
        /// Geometry as WKT, EWKT, hex WKB or GeoJSON.
        #[arg(allow_hyphen_values = true)]
        input: String,

        /// Target format: wkt, ewkt, wkb or geojson.
        #[arg(long)]
        to: GeometryFormat,

        /// SRID to write with EWKT.
        #[arg(long)]
        srid: Option<u32>,
    },
    /// Build the spatial index file next to the POI database.
    IndexBuild {
        /// Rebuild even when an index already exists.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let target = cli.database.as_deref();

    match cli.command {
        Command::Nearest { category, search } => {
            let args = NearestArgs {
                category,
                origin: search.origin,
                radius: search.radius,
                planar_srid: search.planar_srid,
            };
            handle_nearest(target, &args, cli.format)
        }
        Command::Route {
            stops,
            search,
            open,
            strict,
            list_within,
            boundary,
            geometry_format,
        } => {
            let args = RouteCommandArgs {
                stops,
                origin: search.origin,
                radius: search.radius,
                planar_srid: search.planar_srid,
                open,
                strict,
                list_within,
                boundary,
                geometry_format,
            };
            handle_route(target, &args, cli.format)
        }
        Command::Within {
            area,
            category,
            boundary,
        } => {
            let args = WithinArgs {
                area,
                category,
                boundary,
            };
            handle_within(target, &args, cli.format)
        }
        Command::Convert { input, to, srid } => {
            handle_convert(&ConvertArgs { input, to, srid }, cli.format)
        }
        Command::IndexBuild { force } => handle_index_build(target, &IndexBuildArgs { force }),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
