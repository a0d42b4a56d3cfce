use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use discrip::config::AppConfig;
use discrip::error::PipelineError;
use discrip::pipeline::{Pipeline, RunOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "discrip", version, about = "Identify, name and rip audio CDs into a music library")]
struct Cli {
    /// Path to the config file (defaults to ~/.config/discrip/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Optical drive device
    #[arg(long, global = true)]
    device: Option<String>,

    /// Base directory of the music library
    #[arg(long, global = true)]
    library_dir: Option<PathBuf>,

    /// CDDB mirror URL (cddb.cgi endpoint)
    #[arg(long, global = true)]
    mirror: Option<String>,

    /// Drive read speed passed to the ripping engine
    #[arg(long, global = true)]
    read_speed: Option<u32>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the inserted disc, name it and rip it into the library
    Rip {
        /// Replace an existing disc directory and ignore duplicate disc IDs
        #[arg(long)]
        force: bool,

        /// Leave the drive tray alone before and after the rip
        #[arg(long)]
        no_eject: bool,

        /// Re-encode ripped tracks with the lossless encoder
        #[arg(long)]
        encode: bool,
    },

    /// Query the database for the inserted disc and print every candidate
    Lookup,

    /// Print the inserted disc's fingerprint
    Fingerprint,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    discrip::interrupt::install();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<PipelineError>() {
            Some(err) if err.is_interrupt() => {
                log::debug!("Interrupted: {err}");
                std::process::exit(discrip::interrupt::INTERRUPTED_EXIT_CODE);
            }
            Some(err) => {
                eprintln!("Error: {e:#}");
                std::process::exit(err.exit_code());
            }
            None => {
                eprintln!("Error: {e:#}");
                std::process::exit(discrip::error::exit_code::OTHER);
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Load config file (optional, defaults if missing)
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    // CLI overrides config
    if let Some(device) = cli.device {
        config.drive.device = device;
    }
    if let Some(dir) = cli.library_dir {
        config.library_dir = Some(dir);
    }
    if let Some(mirror) = cli.mirror {
        config.database.mirror_url = mirror;
    }
    if let Some(speed) = cli.read_speed {
        config.rip.read_speed = speed;
    }

    match cli.command {
        Commands::Rip {
            force,
            no_eject,
            encode,
        } => {
            if force {
                config.overwrite = true;
            }
            if encode {
                config.encode.enabled = true;
            }
            let mut options = RunOptions::from_config(&config);
            options.eject = !no_eject;
            log::info!("Library: {}", options.library_root.display());

            let mut pipeline = Pipeline::from_config(&config, options)
                .context("Failed to set up the rip")?;
            let outcome = pipeline.run()?;

            println!(
                "Ripped {} track(s) into {}",
                outcome.files.len(),
                outcome.layout.directory_path.display()
            );
            println!("Disc record: {}", outcome.sidecar.display());
        }

        Commands::Lookup => {
            let mut pipeline = Pipeline::from_config(&config, RunOptions::from_config(&config))
                .context("Failed to set up the lookup")?;
            let record = pipeline.identify()?;

            println!("Disc {}", record.fingerprint);
            if record.is_unmatched() {
                println!("No database results.");
            }
            for (i, candidate) in record.candidates.iter().enumerate() {
                println!("\n===== Result {:02} =====", i + 1);
                print!("{}", candidate.render());
            }
        }

        Commands::Fingerprint => {
            let mut pipeline = Pipeline::from_config(&config, RunOptions::from_config(&config))
                .context("Failed to set up the drive")?;
            let fp = pipeline.fingerprint()?;
            println!("{fp}  {} track(s)", fp.track_count);
            if !fp.offsets.is_empty() {
                let offsets: Vec<String> = fp.offsets.iter().map(|o| o.to_string()).collect();
                println!("offsets: {}", offsets.join(" "));
                println!("length: {}s", fp.length_secs);
            }
        }
    }

    Ok(())
}
