//! CLI for the flicker oscillation engine.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flicker")]
#[command(about = "flicker — entropy-driven damped oscillation engine")]
#[command(version = flicker_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show entropy source availability, success rates, and quality score
    Status {
        /// Emit JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Exercise the full pipeline on throwaway state and report quality
    Selftest {
        /// Number of samples to draw
        #[arg(long, default_value = "32")]
        samples: usize,

        /// Write the full report as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Run a context for a number of ticks and print the oscillation trace
    Run {
        /// Ticks to advance
        #[arg(long, default_value = "50")]
        ticks: usize,

        /// Damping coefficient ζ (1.0 = critical)
        #[arg(long, default_value = "0.7")]
        damping: f64,

        /// Natural frequency ω
        #[arg(long, default_value = "1.0")]
        frequency: f64,

        /// Oscillation target value
        #[arg(long, default_value = "0.0")]
        target: f64,

        /// Pink-noise intensity
        #[arg(long, default_value = "1.0")]
        intensity: f64,

        /// Enable the chaotic forcing term
        #[arg(long)]
        chaotic: bool,

        /// Resume from a context exported with --save
        #[arg(long)]
        resume: Option<String>,

        /// Export the context to a file after the run
        #[arg(long)]
        save: Option<String>,

        /// Print a metrics report after the run
        #[arg(long)]
        metrics: bool,

        /// Emit JSON lines instead of the trace
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8047")]
        port: u16,

        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Status { json } => commands::status::run(json),
        Commands::Selftest { samples, output } => {
            commands::selftest::run(samples, output.as_deref())
        }
        Commands::Run {
            ticks,
            damping,
            frequency,
            target,
            intensity,
            chaotic,
            resume,
            save,
            metrics,
            json,
        } => commands::run::run(commands::run::RunOptions {
            ticks,
            damping,
            frequency,
            target,
            intensity,
            chaotic,
            resume_path: resume,
            save_path: save,
            metrics,
            json,
        }),
        Commands::Serve { port, host } => commands::serve::run(&host, port),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
