//! Stub fish-speech toolchain for exercising the subprocess pipeline.
//!
//! Builds a `/bin/sh` script that stands in for the python interpreter: it
//! appends every invocation to a log file and either produces the artifact
//! the real tool would, or fails at a chosen stage.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use tempfile::TempDir;

use super::engine::{OpenAudioEngine, OpenAudioModelParams};
use crate::SynthesisEngine;

pub(crate) enum StubBehavior {
    /// All three tools succeed; the vocoder emits a WAV at this rate.
    Succeed { sample_rate: u32 },
    /// The tool whose argv contains `marker` prints `message` to stderr and
    /// exits non-zero. Earlier stages succeed. An empty message exercises
    /// the empty-stderr fallback.
    Fail {
        marker: &'static str,
        message: &'static str,
    },
}

pub(crate) struct StubToolkit {
    #[allow(dead_code)]
    pub dir: TempDir,
    pub python: PathBuf,
    pub invocations: PathBuf,
    pub checkpoints: PathBuf,
    pub scratch_root: PathBuf,
}

/// Deterministic waveform the stub vocoder emits.
pub(crate) fn stub_samples() -> Vec<f32> {
    (0..4800)
        .map(|i| ((i % 100) as f32 - 50.0) / 50.0)
        .collect()
}

pub(crate) fn stub_toolkit(behavior: StubBehavior) -> StubToolkit {
    let dir = tempfile::tempdir().expect("create stub dir");
    let invocations = dir.path().join("invocations.log");
    let checkpoints = dir.path().join("checkpoints");
    let scratch_root = dir.path().join("scratch");
    fs::create_dir(&checkpoints).expect("create checkpoints dir");
    fs::create_dir(&scratch_root).expect("create scratch root");

    let vocoder_wav = dir.path().join("vocoder.wav");
    let (fail_marker, fail_message, sample_rate) = match behavior {
        StubBehavior::Succeed { sample_rate } => ("", "", sample_rate),
        StubBehavior::Fail { marker, message } => (marker, message, 48000),
    };
    write_stub_wav(&vocoder_wav, sample_rate);

    let python = dir.path().join("python");
    let script = format!(
        r#"#!/bin/sh
echo "$*" >> "{log}"
if [ -n "{fail_marker}" ]; then
    case "$*" in
        *"{fail_marker}"*)
            if [ -n "{fail_message}" ]; then echo "{fail_message}" >&2; fi
            exit 3
            ;;
    esac
fi
input=""; outdir=""; output=""; prev=""
for a in "$@"; do
    case "$prev" in
        --input-path) input="$a" ;;
        --output-dir) outdir="$a" ;;
        --output) output="$a" ;;
    esac
    prev="$a"
done
case "$*" in
    *dac.inference*) : > "${{input%.wav}}.npy" ;;
    *text2semantic*) : > "$outdir/codes_0.npy" ;;
    *vqgan*) cp "{wav}" "$output" ;;
esac
"#,
        log = invocations.display(),
        fail_marker = fail_marker,
        fail_message = fail_message,
        wav = vocoder_wav.display(),
    );
    fs::write(&python, script).expect("write stub script");
    let mut perms = fs::metadata(&python).expect("stat stub script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&python, perms).expect("mark stub executable");

    StubToolkit {
        dir,
        python,
        invocations,
        checkpoints,
        scratch_root,
    }
}

/// Engine wired to the stub toolkit, with checkpoints "loaded".
pub(crate) fn loaded_engine(stub: &StubToolkit) -> OpenAudioEngine {
    let mut engine = OpenAudioEngine::new();
    engine
        .load_model_with_params(
            &stub.checkpoints,
            OpenAudioModelParams {
                python_bin: Some(stub.python.clone()),
                toolkit_dir: None,
                scratch_dir: Some(stub.scratch_root.clone()),
            },
        )
        .expect("stub checkpoints should load");
    engine
}

pub(crate) fn invocation_lines(stub: &StubToolkit) -> Vec<String> {
    fs::read_to_string(&stub.invocations)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Number of entries left under the scratch root; zero means cleanup ran.
pub(crate) fn scratch_entries(stub: &StubToolkit) -> usize {
    fs::read_dir(&stub.scratch_root)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

fn write_stub_wav(path: &std::path::Path, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create stub wav");
    for sample in stub_samples() {
        writer.write_sample(sample).expect("write stub sample");
    }
    writer.finalize().expect("finalize stub wav");
}
