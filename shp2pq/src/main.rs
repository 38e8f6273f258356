//! Point d'entrée CLI pour shp2pq

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Convertir des shapefiles en Parquet trié par courbe de Hilbert
#[derive(Parser)]
#[command(name = "shp2pq")]
#[command(author, version)]
#[command(about = "Convert shapefile collections to Hilbert-sorted, ZSTD-compressed Parquet")]
#[command(long_about = "Convertit chaque .shx en un .pq voisin : CRS identifié depuis le .prj, \
reprojection en EPSG:4326, correction de l'ordre des axes, tri Hilbert.\n\n\
Relancer la commande ne refait que les fichiers manquants ou vides.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);
    debug!(
        reproject = shp2pq::engine::reproject::is_available(),
        "Starting shp2pq"
    );

    match cli.command {
        Commands::Convert(args) => cli::cmd_convert(args),
        Commands::Stats(args) => cli::cmd_stats(args),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
