use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use melody_core::{
    decode_smf, encode_smf, is_melodic, transform, tune_to_events, vectorize, ChannelFilter, NoteCollection, Tempo,
    Tune, VectorNote,
};
use melody_sampler::{pitch_token, MarkovModel, SamplerConfig, SequenceBuilder};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Which tune transforms to apply after extraction, in this order:
/// monophonic, contiguous, transpose, quantize.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct TransformOpts {
    pub monophonic: bool,
    pub contiguous: bool,
    pub min_duration: f64,
    pub max_duration: f64,
    pub transpose: bool,
    pub quantize: bool,
}

impl Default for TransformOpts {
    fn default() -> Self {
        Self {
            monophonic: false,
            contiguous: false,
            min_duration: 0.25,
            max_duration: 4.0,
            transpose: false,
            quantize: false,
        }
    }
}

impl TransformOpts {
    pub fn apply(&self, mut tune: Tune) -> Tune {
        if self.monophonic {
            tune = transform::monophonic(&tune);
        }
        if self.contiguous {
            tune = transform::contiguous(&tune, self.min_duration, self.max_duration);
        }
        if self.transpose {
            tune = transform::transpose_to_c(&tune);
        }
        if self.quantize {
            tune = transform::quantize_durations(&tune);
        }
        tune
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AnalyzeOpts {
    pub channels: ChannelFilter,
    pub dedup: bool,
    pub transforms: TransformOpts,
}

/// Per-file summary kept next to each extracted tune.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TuneAttrs {
    pub bpm: f64,
    pub nnotes: usize,
    pub nchords: usize,
    pub notemin: Option<u8>,
    pub notemax: Option<u8>,
    pub notespan: usize,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Analysis {
    pub tune: Tune,
    pub attrs: TuneAttrs,
}

/// MIDI bytes -> melodic tune plus attributes.
pub fn analyze_midi(bytes: &[u8], opts: &AnalyzeOpts) -> Result<Analysis> {
    let smf = decode_smf(bytes)?;
    let mut nc = NoteCollection::new(smf.ticks_per_quarter);
    for (ix, track) in smf.tracks.iter().enumerate() {
        nc.collect_track(ix, track);
    }
    nc.filter_notes(is_melodic);
    if opts.dedup {
        nc.deduplicate();
    }
    nc.filter_notes(|n| opts.channels.accepts(n));

    let v = vectorize(&nc.notes, nc.ticks_per_quarter)?;
    let attrs = TuneAttrs {
        bpm: nc.tempo_or_default().bpm(),
        nnotes: v.melodic_notes,
        nchords: v.chord_notes,
        notemin: v.pitch_range.map(|(lo, _)| lo),
        notemax: v.pitch_range.map(|(_, hi)| hi),
        notespan: v.pitch_range.map_or(0, |(lo, hi)| usize::from(hi - lo) + 1),
    };
    Ok(Analysis { tune: opts.transforms.apply(v.tune), attrs })
}

pub fn analyze_file(path: &Path, opts: &AnalyzeOpts) -> Result<Analysis> {
    let bytes = std::fs::read(path).with_context(|| format!("failed reading MIDI file: {}", path.display()))?;
    analyze_midi(&bytes, opts).with_context(|| format!("failed analyzing MIDI file: {}", path.display()))
}

/// Analyze every file; unreadable or malformed files are logged and skipped.
pub fn analyze_files(paths: &[PathBuf], opts: &AnalyzeOpts) -> Vec<(PathBuf, Analysis)> {
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        match analyze_file(path, opts) {
            Ok(analysis) => {
                tracing::debug!(file = %path.display(), notes = analysis.tune.len(), "analyzed");
                out.push((path.clone(), analysis));
            }
            Err(e) => tracing::warn!(file = %path.display(), "skipping: {e:#}"),
        }
    }
    tracing::info!(analyzed = out.len(), skipped = paths.len() - out.len(), "batch analysis done");
    out
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ExportOpts {
    pub bpm: f64,
    pub ticks_per_quarter: u16,
    /// Zero-based output channel.
    pub channel: u8,
    pub program: Option<u8>,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self { bpm: 120.0, ticks_per_quarter: 480, channel: 0, program: None }
    }
}

/// Tune -> single-track SMF bytes.
pub fn tune_to_midi(tune: &[VectorNote], opts: &ExportOpts) -> Result<Vec<u8>> {
    let encoded = tune_to_events(tune, opts.ticks_per_quarter, opts.channel);
    if encoded.dropped > 0 {
        tracing::warn!(dropped = encoded.dropped, "some notes could not be placed on a channel");
    }
    Ok(encode_smf(&encoded.events, opts.ticks_per_quarter, Tempo::from_bpm(opts.bpm), opts.program)?)
}

/// Train a pitch model on `corpus` and sample a new tune from it, primed
/// with the first pitch of the corpus.
pub fn generate_tune(corpus: &[Tune], config: &SamplerConfig) -> Result<Tune> {
    let model = MarkovModel::train(corpus)?;
    let prime: Vec<usize> = corpus
        .iter()
        .find_map(|t| t.first())
        .map(|n| vec![pitch_token(n.pitch)])
        .unwrap_or_default();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut builder = SequenceBuilder::new(&model, config);
    Ok(builder.build(&prime, &mut rng)?)
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ConvertOpts {
    pub analyze: AnalyzeOpts,
    pub export: ExportOpts,
    pub sampler: SamplerConfig,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum InputPayload {
    MidiBase64 { data_b64: String },
    Tunes { tunes: Vec<Tune> },
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum OutputArtifact {
    MidiBase64 { data_b64: String },
    Json { data: serde_json::Value },
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ConvertRequest {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub options: ConvertOpts,
    pub payload: InputPayload,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ConvertResponse {
    pub artifacts: Vec<OutputArtifact>,
}

/// Route a request: midi->tune, tune->midi, tune->generated.
pub fn handle_convert(req: ConvertRequest) -> Result<ConvertResponse> {
    let mut artifacts = vec![];
    match (req.from.as_str(), req.to.as_str(), req.payload) {
        ("midi", "tune", InputPayload::MidiBase64 { data_b64 }) => {
            let bytes = B64.decode(data_b64).context("invalid base64 MIDI payload")?;
            let analysis = analyze_midi(&bytes, &req.options.analyze)?;
            artifacts.push(OutputArtifact::Json { data: serde_json::to_value(analysis)? });
        }
        ("tune", "midi", InputPayload::Tunes { tunes }) => {
            for tune in &tunes {
                let midi = tune_to_midi(tune, &req.options.export)?;
                artifacts.push(OutputArtifact::MidiBase64 { data_b64: B64.encode(midi) });
            }
        }
        ("tune", "generated", InputPayload::Tunes { tunes }) => {
            let tune = generate_tune(&tunes, &req.options.sampler)?;
            let midi = tune_to_midi(&tune, &req.options.export)?;
            artifacts.push(OutputArtifact::Json { data: serde_json::to_value(&tune)? });
            artifacts.push(OutputArtifact::MidiBase64 { data_b64: B64.encode(midi) });
        }
        (from, to, _) => return Err(anyhow!("unsupported conversion {from} -> {to} for this payload")),
    }
    Ok(ConvertResponse { artifacts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord_then_note() -> Tune {
        vec![VectorNote::new(60.0, 1.0, 0.0), VectorNote::new(64.0, 1.0, 0.0), VectorNote::new(67.0, 1.0, 1.0)]
    }

    #[test]
    fn exported_tune_analyzes_back() {
        let midi = tune_to_midi(&chord_then_note(), &ExportOpts { bpm: 96.0, ..Default::default() }).unwrap();
        let analysis = analyze_midi(&midi, &AnalyzeOpts::default()).unwrap();
        assert_eq!(analysis.tune, chord_then_note());
        assert_eq!(analysis.attrs.bpm, 96.0);
        assert_eq!(analysis.attrs.nnotes, 2);
        assert_eq!(analysis.attrs.nchords, 1);
        assert_eq!(analysis.attrs.notemin, Some(60));
        assert_eq!(analysis.attrs.notespan, 8);
    }

    #[test]
    fn analysis_applies_transforms() {
        let midi = tune_to_midi(&chord_then_note(), &ExportOpts::default()).unwrap();
        let opts = AnalyzeOpts {
            transforms: TransformOpts { monophonic: true, ..Default::default() },
            ..Default::default()
        };
        let analysis = analyze_midi(&midi, &opts).unwrap();
        assert_eq!(analysis.tune, vec![VectorNote::new(64.0, 1.0, 0.0), VectorNote::new(67.0, 1.0, 1.0)]);
    }

    #[test]
    fn channel_filter_is_one_based() {
        let export = ExportOpts { channel: 4, ..Default::default() };
        let midi = tune_to_midi(&chord_then_note(), &export).unwrap();
        let mut opts = AnalyzeOpts::default();
        opts.channels.exclude.insert(5);
        assert!(analyze_midi(&midi, &opts).unwrap().tune.is_empty());
    }

    #[test]
    fn batch_skips_bad_files() {
        let dir = std::env::temp_dir().join(format!("converters-batch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("good.mid");
        let bad = dir.join("bad.mid");
        std::fs::write(&good, tune_to_midi(&chord_then_note(), &ExportOpts::default()).unwrap()).unwrap();
        std::fs::write(&bad, b"garbage").unwrap();
        let missing = dir.join("missing.mid");

        let results = analyze_files(&[bad, good.clone(), missing], &AnalyzeOpts::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, good);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn routes_generation() {
        let req = ConvertRequest {
            from: "tune".into(),
            to: "generated".into(),
            options: ConvertOpts {
                sampler: SamplerConfig { length: 12, seed: Some(9), ..Default::default() },
                ..Default::default()
            },
            payload: InputPayload::Tunes { tunes: vec![chord_then_note()] },
        };
        let resp = handle_convert(req).unwrap();
        assert_eq!(resp.artifacts.len(), 2);
        match &resp.artifacts[0] {
            OutputArtifact::Json { data } => assert_eq!(data.as_array().map(Vec::len), Some(12)),
            other => panic!("unexpected artifact {other:?}"),
        }
    }

    #[test]
    fn generation_rejects_zero_temperature() {
        let req = ConvertRequest {
            from: "tune".into(),
            to: "generated".into(),
            options: ConvertOpts {
                sampler: SamplerConfig { temperature: 0.0, seed: Some(2), ..Default::default() },
                ..Default::default()
            },
            payload: InputPayload::Tunes { tunes: vec![chord_then_note()] },
        };
        let err = handle_convert(req).unwrap_err();
        assert!(err.to_string().contains("temperature"), "{err}");
    }

    #[test]
    fn rejects_unknown_route() {
        let req = ConvertRequest {
            from: "text".into(),
            to: "midi".into(),
            options: ConvertOpts::default(),
            payload: InputPayload::Tunes { tunes: vec![] },
        };
        assert!(handle_convert(req).is_err());
    }
}
