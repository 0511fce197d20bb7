use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use geo_authz::geofence::{GeofenceError, PolygonIndex};

#[derive(Parser)]
#[command(name = "geofence-check")]
#[command(about = "Validate GeoJSON geofence files before deploying them", long_about = None)]
struct Cli {
    /// GeoJSON FeatureCollection files to validate
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Only report failures
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut failed = 0usize;

    for path in &cli.files {
        match PolygonIndex::load(path) {
            Ok(index) => {
                if !cli.quiet {
                    println!("{}: OK ({} polygons)", path.display(), index.len());
                    for polygon in index.polygons() {
                        println!("  {} ({} part(s))", polygon.name, polygon.parts.len());
                    }
                }
            }
            Err(GeofenceError::Invalid { path, violations }) => {
                failed += 1;
                eprintln!("{}: FAILED ({} invalid feature(s))", path, violations.len());
                for violation in violations {
                    eprintln!("  {}", violation);
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: FAILED", path.display());
                eprintln!("  {}", e);
            }
        }
    }

    if failed > 0 {
        eprintln!("{} of {} file(s) failed validation", failed, cli.files.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
