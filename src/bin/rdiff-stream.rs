//! Command-line front end mirroring `rdiff signature|delta|patch`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rdiff_stream::wire::{Command, DeltaReader};
use rdiff_stream::{
    generate_delta_file, generate_signature_file, patch_file, SignatureOptions,
    DEFAULT_BLOCK_SIZE, DEFAULT_CRYPTO_HASH_SIZE,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rdiff-stream")]
#[command(author, version, about = "Compute and apply rdiff-compatible signatures and deltas")]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the signature of a base file
    Signature {
        /// Base file
        base: PathBuf,

        /// Output signature file
        signature: PathBuf,

        /// Block length in bytes
        #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: u32,

        /// Number of strong hash bytes kept per block (1-16)
        #[arg(short = 'S', long, default_value_t = DEFAULT_CRYPTO_HASH_SIZE)]
        sum_size: u32,
    },

    /// Write the delta from a signature's base to a new file
    Delta {
        /// Signature of the base file
        signature: PathBuf,

        /// New version of the file
        new: PathBuf,

        /// Output delta file
        delta: PathBuf,
    },

    /// Rebuild the new file from the base file and a delta
    Patch {
        /// Base file
        base: PathBuf,

        /// Delta file
        delta: PathBuf,

        /// Output file, which must not be the base file
        new: PathBuf,
    },

    /// Print the commands of a delta file
    Inspect {
        /// Delta file
        delta: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn inspect(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = DeltaReader::new(BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))?;
    let mut position = 0u64;
    for command in reader {
        match command? {
            Command::Copy { offset, len } => {
                println!("{:>12}  COPY    offset={} len={}", position, offset, len);
                position += len;
            }
            Command::Literal(data) => {
                println!("{:>12}  LITERAL len={}", position, data.len());
                position += data.len() as u64;
            }
        }
    }
    println!("{:>12}  END", position);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Signature {
            base,
            signature,
            block_size,
            sum_size,
        } => {
            let options = SignatureOptions {
                block_size,
                crypto_hash_size: sum_size,
            };
            generate_signature_file(&base, &signature, options)
                .with_context(|| format!("generating signature of {}", base.display()))?;
        }
        Commands::Delta {
            signature,
            new,
            delta,
        } => {
            let stats = generate_delta_file(&signature, &new, &delta)
                .with_context(|| format!("generating delta for {}", new.display()))?;
            tracing::info!(
                copy_bytes = stats.copy_bytes,
                literal_bytes = stats.literal_bytes,
                "delta written to {}",
                delta.display()
            );
        }
        Commands::Patch { base, delta, new } => {
            patch_file(&base, &delta, &new)
                .with_context(|| format!("applying {} to {}", delta.display(), base.display()))?;
        }
        Commands::Inspect { delta } => inspect(&delta)?,
    }
    Ok(())
}
