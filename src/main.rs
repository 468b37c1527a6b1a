use clap::{Parser, Subcommand};
use miette::{miette, Result};
use std::path::PathBuf;

use const_hoist_rs::cli;

#[derive(Parser)]
#[command(name = "const-hoist-rs")]
#[command(about = "Module-IR optimizer that hoists constant expressions into globals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hoisting pipeline over a module and print the result
    Optimize {
        /// Input module file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave string-typed constant expressions in place
        #[arg(long)]
        no_hoist_strings: bool,
    },

    /// Inspect const-expr classification of a module
    Inspect {
        /// Input module file
        input: PathBuf,

        /// Output format (json, text)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Parse a module and print its canonical textual form
    Print {
        /// Input module file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            input,
            output,
            no_hoist_strings,
        } => {
            let args = cli::optimize::OptimizeArgs {
                input_path: input,
                output_path: output,
                no_hoist_strings,
            };
            cli::optimize::optimize(&args).map_err(|e| miette!("{}", e))
        }
        Commands::Inspect { input, format } => {
            cli::inspect::inspect(&input, &format).map_err(|e| miette!("{}", e))
        }
        Commands::Print { input, output } => {
            cli::print::print(&input, output.as_ref()).map_err(|e| miette!("{}", e))
        }
    }
}
