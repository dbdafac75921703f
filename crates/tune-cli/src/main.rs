use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use converters::{analyze_files, generate_tune, tune_to_midi, AnalyzeOpts, ExportOpts, TransformOpts, TuneAttrs};
use melody_core::{decode_smf, instrument_name, pitch_name, ChannelFilter, MessageKind, Tune};
use melody_sampler::{sequence_segmentation, SamplerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// tune – MIDI files to (pitch, duration, step) tunes and back, plus sampling
/// of new tunes from an analyzed corpus.
#[derive(Parser, Debug)]
#[command(name = "tune", version, about = "MIDI note codec and melody sampler")]
struct Cli {
    /// Directory for written files (json/mid)
    #[arg(long, global = true, default_value = "outputs")]
    out_dir: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the decoded events of a MIDI file
    Dump {
        input: PathBuf,
    },

    /// Extract tunes from MIDI files into a JSON dataset
    Analyze {
        inputs: Vec<PathBuf>,
        /// Only keep these 1-based channels
        #[arg(long = "include", value_delimiter = ',')]
        include: Vec<u8>,
        /// Drop these 1-based channels
        #[arg(long = "exclude", value_delimiter = ',')]
        exclude: Vec<u8>,
        /// Drop duplicate (tick, pitch, duration) notes
        #[arg(long)]
        dedup: bool,
        /// Keep only the highest note of each chord
        #[arg(long)]
        monophonic: bool,
        /// Close gaps between notes and shorten long rests
        #[arg(long)]
        contiguous: bool,
        /// Transpose each tune to C
        #[arg(long)]
        transpose: bool,
        /// Snap durations to standard note lengths
        #[arg(long)]
        quantize: bool,
        /// Dataset file name inside --out-dir
        #[arg(long, default_value = "dataset.json")]
        name: String,
    },

    /// Write a tune (JSON triples) as a MIDI file
    Encode {
        input: PathBuf,
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,
        /// General MIDI program for the output channels
        #[arg(long)]
        program: Option<u8>,
        /// Zero-based output channel
        #[arg(long, default_value_t = 0)]
        channel: u8,
    },

    /// Cut the pitches of a dataset into fixed-length training windows
    Segment {
        dataset: PathBuf,
        #[arg(long, default_value_t = 16)]
        length: usize,
        /// Pad the opening windows with this pitch token
        #[arg(long)]
        prefix: Option<i32>,
    },

    /// Sample a new tune from a dataset written by `analyze`
    Generate {
        dataset: PathBuf,
        /// JSON sampler settings (temperature, tau, eta, top_k, top_p, ...)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        length: Option<usize>,
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,
    },
}

#[derive(Serialize, Deserialize, Debug)]
struct DatasetEntry {
    file: PathBuf,
    attrs: TuneAttrs,
    tune: Tune,
}

fn write_file(out_dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("failed creating {}", out_dir.display()))?;
    let p = out_dir.join(name);
    fs::write(&p, bytes).with_context(|| format!("failed writing {}", p.display()))?;
    eprintln!("✓ wrote {}", p.display());
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn dump(input: &Path) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("failed reading MIDI file: {}", input.display()))?;
    let smf = decode_smf(&bytes).with_context(|| format!("failed decoding {}", input.display()))?;
    println!("{}: {} tracks, {} ticks per quarter", input.display(), smf.tracks.len(), smf.ticks_per_quarter);
    for (ix, track) in smf.tracks.iter().enumerate() {
        println!("track {ix}");
        let mut tick = 0u64;
        for msg in track {
            tick += u64::from(msg.delta);
            let text = match msg.kind {
                MessageKind::Tempo { micros_per_quarter } => format!("tempo {micros_per_quarter} us/quarter"),
                MessageKind::ProgramChange { channel, program } => {
                    format!("ch{} program {program} ({})", channel + 1, instrument_name(program).unwrap_or("?"))
                }
                MessageKind::NoteOn { channel, pitch, velocity } => {
                    format!("ch{} note_on {} vel {velocity}", channel + 1, pitch_name(i32::from(pitch), "?"))
                }
                MessageKind::NoteOff { channel, pitch, .. } => {
                    format!("ch{} note_off {}", channel + 1, pitch_name(i32::from(pitch), "?"))
                }
                MessageKind::Other => continue,
            };
            println!("  {tick:>8} {text}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Dump { input } => dump(&input)?,

        Commands::Analyze { inputs, include, exclude, dedup, monophonic, contiguous, transpose, quantize, name } => {
            let opts = AnalyzeOpts {
                channels: ChannelFilter { include: include.into_iter().collect(), exclude: exclude.into_iter().collect() },
                dedup,
                transforms: TransformOpts { monophonic, contiguous, transpose, quantize, ..Default::default() },
            };
            let entries: Vec<DatasetEntry> = analyze_files(&inputs, &opts)
                .into_iter()
                .map(|(file, a)| DatasetEntry { file, attrs: a.attrs, tune: a.tune })
                .collect();
            let json = serde_json::to_string_pretty(&entries)?;
            write_file(&cli.out_dir, &name, json.as_bytes())?;
        }

        Commands::Encode { input, bpm, program, channel } => {
            let tune: Tune = read_json(&input)?;
            let midi = tune_to_midi(&tune, &ExportOpts { bpm, program, channel, ..Default::default() })?;
            let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("tune");
            write_file(&cli.out_dir, &format!("{stem}.mid"), &midi)?;
        }

        Commands::Segment { dataset, length, prefix } => {
            let entries: Vec<DatasetEntry> = read_json(&dataset)?;
            let mut segments = Vec::new();
            for entry in &entries {
                let pitches: Vec<i32> = entry.tune.iter().map(|n| n.pitch.round() as i32).collect();
                segments.extend(sequence_segmentation(&pitches, length, prefix));
            }
            eprintln!("{} segments of length {length}", segments.len());
            write_file(&cli.out_dir, "segments.json", serde_json::to_string(&segments)?.as_bytes())?;
        }

        Commands::Generate { dataset, config, seed, length, bpm } => {
            let entries: Vec<DatasetEntry> = read_json(&dataset)?;
            let mut cfg: SamplerConfig = match config {
                Some(path) => read_json(&path)?,
                None => SamplerConfig::default(),
            };
            if seed.is_some() {
                cfg.seed = seed;
            }
            if let Some(length) = length {
                cfg.length = length;
            }
            let corpus: Vec<Tune> = entries.into_iter().map(|e| e.tune).collect();
            let tune = generate_tune(&corpus, &cfg)?;
            write_file(&cli.out_dir, "generated.json", serde_json::to_string(&tune)?.as_bytes())?;
            let midi = tune_to_midi(&tune, &ExportOpts { bpm, ..Default::default() })?;
            write_file(&cli.out_dir, "generated.mid", &midi)?;
        }
    }

    Ok(())
}
