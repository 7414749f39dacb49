//! Weft CLI — run barrier-contact shell simulations and export frames.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about = "Weft — implicit thin-shell simulation with non-penetrating contact")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation described by a TOML scene file.
    Simulate {
        /// Path to the scene file.
        #[arg(short, long, default_value = "scene.toml")]
        scene: String,
    },

    /// Run the built-in cloth drape demo and export OBJ frames.
    Drape {
        /// Cloth resolution (quads per side).
        #[arg(short, long, default_value_t = 16)]
        resolution: usize,

        /// Number of timesteps.
        #[arg(short = 'n', long, default_value_t = 300)]
        steps: usize,

        /// Output directory for OBJ frames.
        #[arg(short, long, default_value = "frames")]
        output: String,
    },

    /// Validate a scene file without running it.
    Validate {
        /// Path to the scene file.
        path: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Simulate { scene } => commands::simulate(&scene),
        Commands::Drape {
            resolution,
            steps,
            output,
        } => commands::drape(resolution, steps, &output),
        Commands::Validate { path } => commands::validate(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
