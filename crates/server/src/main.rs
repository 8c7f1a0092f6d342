mod config;
mod seed;
mod serve;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Catalog search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CatalogBackend {
    /// Case-insensitive substring matching, top 2 per query.
    Memory,
    /// Trigram-similarity ranking, top 3 per query.
    Trigram,
}

/// Snapcart cashierless checkout backend.
#[derive(Parser)]
#[command(name = "snapcart", version, about = "Snapcart cashierless checkout backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Snapcart HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Catalog search backend
        #[arg(long, default_value = "memory", value_enum)]
        catalog: CatalogBackend,
        /// Pre-load the demo product catalog
        #[arg(long)]
        seed_demo: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            catalog,
            seed_demo,
        } => {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(serve::start_server(port, catalog, seed_demo)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
    }
}
