mod analysis;
mod audio;
mod config;
mod settings;
mod terminal;
mod viz;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::MonitorConfig;
use log::LevelFilter;
use settings::Settings;
use terminal::Terminal;

#[derive(Parser)]
#[command(name = "micmon")]
#[command(version = "0.2.0")]
#[command(about = "Terminal microphone monitor: live spectrum, quality feedback, and recording", long_about = None)]
struct Cli {
    /// Verbose logging (repeat for debug/trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live monitor
    Monitor {
        /// Input device name fragment (default input device if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Output device name fragment for playback and loopback
        #[arg(short, long)]
        output: Option<String>,

        /// Start with the mirror overlay visible
        #[arg(short, long)]
        mirror: bool,
    },

    /// List capture and playback devices
    Devices,

    /// Play a recorded WAV file
    Play {
        /// Path to the WAV file
        file: PathBuf,

        /// Output device name fragment
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    match cli.command {
        Commands::Monitor {
            input,
            output,
            mirror,
        } => {
            // The TUI owns the terminal, so logs go to a file instead
            init_logging(level, true);
            let settings = Settings::load();
            let config = MonitorConfig {
                input,
                output,
                mirror,
                ..MonitorConfig::default()
            };
            let mut term = Terminal::new(true).context("failed to initialize terminal")?;
            viz::monitor::run(&mut term, &config, &settings)
        }
        Commands::Devices => {
            init_logging(level, false);
            list_devices();
            Ok(())
        }
        Commands::Play { file, output } => {
            init_logging(level, false);
            play_file(&file, output.as_deref())
        }
    }
}

/// Route the log facade to stderr, or to a file while the TUI is active.
fn init_logging(level: LevelFilter, to_file: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    builder.filter_module("micmon", level);

    if to_file {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("micmon")
            .join("micmon.log");
        let _ = std::fs::create_dir_all(path.parent().unwrap_or(&path));
        match std::fs::File::create(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(_) => {
                // No log file, no logging; stderr would corrupt the screen
                builder.filter_level(LevelFilter::Off);
            }
        }
    }

    builder.format_timestamp_millis().init();
}

fn list_devices() {
    let host = cpal::default_host();

    println!("Capture devices:");
    let inputs = audio::device::input_device_names(&host);
    if inputs.is_empty() {
        println!("  (none found)");
    }
    for name in inputs {
        println!("  {name}");
    }

    println!("Playback devices:");
    let outputs = audio::device::output_device_names(&host);
    if outputs.is_empty() {
        println!("  (none found)");
    }
    for name in outputs {
        println!("  {name}");
    }
}

fn play_file(file: &PathBuf, output: Option<&str>) -> Result<()> {
    let (samples, sample_rate) = audio::WavRecorder::load(file)?;
    let duration = audio::WavRecorder::duration_seconds(samples.len(), sample_rate);
    println!(
        "Playing {} ({duration:.1}s at {sample_rate} Hz)",
        file.display()
    );

    let host = cpal::default_host();
    let device = audio::device::output_device(&host, output)?;
    let mut player = audio::Player::new();
    player.play(&device, samples, sample_rate)?;

    while player.is_playing() {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    Ok(())
}
