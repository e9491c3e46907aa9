use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use kitsynth::audio::{default_output, AudioEngine};
use kitsynth::command::{channel_controller, ChannelControl, EventSource, MidiEvent};
use kitsynth::event::{notification_channel, NotificationReceiver};
use kitsynth::fx::BuiltinPlugins;
use kitsynth::project::renderer::{default_length, export_wav, Hit};
use kitsynth::project::{inspect_state, load_state, save_state};
use kitsynth::synth::{CHANNEL_COUNT, LOWEST_NOTE};
use kitsynth::{EngineConfig, KitSynth};

/// KitSynth - drum sampler engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured sample rate
    #[arg(long, global = true)]
    sample_rate: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render hits to a WAV file
    Render {
        /// State blob to start from
        #[arg(long)]
        state: Option<PathBuf>,
        /// Sample assignment, `channel=file.wav`
        #[arg(long = "sample")]
        samples: Vec<SampleArg>,
        /// Comma separated `channel:frame[:velocity]` list
        #[arg(long, value_delimiter = ',')]
        hits: Vec<Hit>,
        #[arg(long)]
        out: PathBuf,
        /// Output length; defaults to the last hit plus one second
        #[arg(long)]
        seconds: Option<f32>,
    },
    /// Play through the default output; stdin lines `<note> [velocity]`
    Play {
        #[arg(long)]
        state: Option<PathBuf>,
        #[arg(long = "sample")]
        samples: Vec<SampleArg>,
    },
    /// List every controller the engine exposes
    Controllers {
        #[arg(long)]
        json: bool,
    },
    /// Load samples and write the resulting state blob
    DumpState {
        #[arg(long = "sample")]
        samples: Vec<SampleArg>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Decode and print a state blob
    Inspect {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

/// `channel=file` pair from the command line
#[derive(Debug, Clone)]
struct SampleArg {
    channel: usize,
    file: String,
}

impl FromStr for SampleArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (channel, file) = s
            .split_once('=')
            .with_context(|| format!("Expected channel=file, got '{}'", s))?;
        let channel: usize = channel
            .trim()
            .parse()
            .with_context(|| format!("Bad channel in '{}'", s))?;
        if channel >= CHANNEL_COUNT {
            bail!("Channel {} out of range (0..{})", channel, CHANNEL_COUNT);
        }
        Ok(Self {
            channel,
            file: file.to_string(),
        })
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = engine_config(&args)?;

    match args.command {
        Commands::Render {
            state,
            samples,
            hits,
            out,
            seconds,
        } => {
            let (mut synth, rx) = build_engine(&config)?;
            prepare(&mut synth, state.as_deref(), &samples, &rx)?;
            let frames = match seconds {
                Some(s) => (s.max(0.0) * synth.sample_rate() as f32) as usize,
                None => default_length(&hits, synth.sample_rate()),
            };
            let result = export_wav(&mut synth, &hits, frames, &out)?;
            println!(
                "Wrote {} ({} frames, {:.2}s)",
                out.display(),
                result.frames,
                result.duration_secs
            );
        }
        Commands::Play { state, samples } => {
            let (device, stream_config) = default_output()?;
            let config = EngineConfig {
                sample_rate: stream_config.sample_rate().0,
                ..config
            };
            let (mut synth, rx) = build_engine(&config)?;
            prepare(&mut synth, state.as_deref(), &samples, &rx)?;
            let audio = AudioEngine::start(&device, stream_config, synth)?;
            play_from_stdin(&audio, &rx)?;
        }
        Commands::Controllers { json } => {
            let table = kitsynth::command::controller_table();
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                for info in table {
                    println!(
                        "{:>3}  {:#07x}  {}..{}  {}",
                        info.index, info.id, info.min, info.max, info.name
                    );
                }
            }
        }
        Commands::DumpState { samples, out } => {
            let (mut synth, rx) = build_engine(&config)?;
            prepare(&mut synth, None, &samples, &rx)?;
            save_state(&synth, &out)?;
            println!("Wrote {}", out.display());
        }
        Commands::Inspect { path, json } => {
            let summary = inspect_state(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("master {}", summary.master);
                for (i, ch) in summary.channels.iter().enumerate() {
                    println!(
                        "ch {:>2} {} vol {:>3} pan {:>3} sends {:?}{} {}",
                        i,
                        if ch.on { "on " } else { "off" },
                        ch.volume,
                        ch.pan,
                        ch.sends,
                        if ch.noteoff_ignore { " hold" } else { "" },
                        ch.sample.as_deref().unwrap_or("-")
                    );
                }
                for (i, slot) in summary.slots.iter().enumerate() {
                    match slot {
                        Some(fx) => println!(
                            "fx {} {}/{} return {} params {:?}",
                            i, fx.lib, fx.label, fx.return_ctrl, fx.params
                        ),
                        None => println!("fx {} -", i),
                    }
                }
            }
        }
    }

    Ok(())
}

fn engine_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    Ok(config.sanitized())
}

fn build_engine(config: &EngineConfig) -> Result<(KitSynth, NotificationReceiver)> {
    let (notifier, rx) = notification_channel();
    let synth = KitSynth::new(config, Box::new(BuiltinPlugins), notifier)
        .context("Failed to start the sample loader")?;
    Ok((synth, rx))
}

/// Apply an optional state file, then the sample assignments, and wait for
/// every load. Assigned channels are switched on.
fn prepare(
    synth: &mut KitSynth,
    state: Option<&Path>,
    samples: &[SampleArg],
    rx: &NotificationReceiver,
) -> Result<()> {
    if let Some(path) = state {
        load_state(synth, path)?;
    }
    for sample in samples {
        synth.load_sample(sample.channel, &sample.file);
        synth.set_controller(
            channel_controller(sample.channel, ChannelControl::OnOff),
            1,
            EventSource::Host,
        );
    }
    synth.wait_for_loads();
    for notification in rx.drain() {
        debug!("{:?}", notification);
    }
    for sample in samples {
        let loaded = synth
            .channel(sample.channel)
            .and_then(|ch| ch.sample())
            .is_some();
        if !loaded {
            bail!("Failed to load {} into channel {}", sample.file, sample.channel);
        }
    }
    Ok(())
}

fn play_from_stdin(audio: &AudioEngine, rx: &NotificationReceiver) -> Result<()> {
    let sender = audio.sender();
    info!(
        "notes {}..{} trigger channels 0..{}; 'q' quits",
        LOWEST_NOTE,
        LOWEST_NOTE as usize + CHANNEL_COUNT - 1,
        CHANNEL_COUNT - 1
    );
    for line in std::io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };
        if first == "q" {
            break;
        }
        let Ok(pitch) = first.parse::<u8>() else {
            eprintln!("Expected '<note> [velocity]', got '{}'", line);
            continue;
        };
        let velocity = fields.next().and_then(|v| v.parse().ok()).unwrap_or(127);
        sender.send(
            MidiEvent::NoteOn {
                channel: 0,
                pitch,
                velocity,
            },
            EventSource::Host,
        );
        for notification in rx.drain() {
            debug!("{:?}", notification);
        }
    }
    Ok(())
}
