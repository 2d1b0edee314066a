//! Subprocess pipeline over the fish-speech checkpoint tools.
//!
//! Three external tools run in strict sequence; each stage's output file is a
//! required input to the next. All artifacts live in a scratch directory
//! unique to the request, which is removed on every exit path.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use super::audio;

/// Sample rate of the final output audio.
pub const OUTPUT_SAMPLE_RATE: u32 = 48000;

/// Reference audio file name inside the scratch directory.
const REFERENCE_FILE: &str = "reference.wav";
/// Semantic token array written by the generator (`--num-samples 1`).
const SEMANTIC_CODES_FILE: &str = "codes_0.npy";
/// Raw waveform written by the vocoder.
const OUTPUT_FILE: &str = "output.wav";

/// DAC codec weights inside the checkpoint directory.
const CODEC_CHECKPOINT: &str = "codec.pth";
/// Vocoder weights inside the checkpoint directory.
const VOCODER_CHECKPOINT: &str = "firefly-gan-vq-fsq-8x1024-21hz-generator.pth";
/// Vocoder entry script, relative to the toolkit working directory.
const VOCODER_SCRIPT: &str = "tools/vqgan/inference.py";

#[derive(thiserror::Error, Debug)]
pub enum OpenAudioError {
    #[error("Inference step failed: {0}")]
    Inference(String),
    #[error(
        "python not found. Set OpenAudioModelParams::python_bin to the interpreter \
         of the environment where fish-speech is installed."
    )]
    PythonNotFound,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Failed to construct resampler: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),
    #[error("Resampling failed: {0}")]
    Resample(#[from] rubato::ResampleError),
    #[error("Invalid parameter: {0}")]
    InvalidParams(String),
    #[error("Checkpoint directory not found at {0}")]
    CheckpointNotFound(String),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
}

/// Where the pipeline finds the interpreter, weights, and scratch space.
pub(crate) struct ToolchainConfig<'a> {
    pub python_bin: &'a Path,
    pub checkpoint_dir: &'a Path,
    /// Working directory for tool invocations (the fish-speech checkout).
    pub toolkit_dir: Option<&'a Path>,
    /// Parent directory for per-request scratch dirs; system temp if `None`.
    pub scratch_root: Option<&'a Path>,
}

/// One synthesis request, with sampling controls already mapped.
pub(crate) struct PipelineRequest<'a> {
    pub text: &'a str,
    pub reference_audio: &'a [u8],
    pub reference_text: &'a str,
    pub top_p: f32,
    pub temperature: f32,
    pub repetition_penalty: f32,
}

/// The vocoder's decoded waveform at its native rate, before post-processing.
#[derive(Debug)]
pub(crate) struct RawAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Run the three-stage pipeline and load the decoded waveform.
///
/// The scratch directory is removed whether or not the stages succeed;
/// removal failures are logged, never propagated.
pub(crate) fn run(
    cfg: &ToolchainConfig,
    req: &PipelineRequest,
) -> Result<RawAudio, OpenAudioError> {
    let scratch = create_scratch(cfg.scratch_root)?;
    let outcome = run_stages(cfg, req, scratch.path());
    if let Err(e) = scratch.close() {
        log::warn!("Failed to remove scratch directory: {e}");
    }
    outcome
}

fn run_stages(
    cfg: &ToolchainConfig,
    req: &PipelineRequest,
    scratch: &Path,
) -> Result<RawAudio, OpenAudioError> {
    let reference_path = scratch.join(REFERENCE_FILE);
    std::fs::write(&reference_path, req.reference_audio)?;

    // The DAC encoder writes the prompt tokens next to its input,
    // swapping the extension.
    let prompt_tokens = reference_path.with_extension("npy");
    encode_reference(cfg, &reference_path)?;

    let codes_path = scratch.join(SEMANTIC_CODES_FILE);
    generate_semantic_tokens(cfg, req, &prompt_tokens, scratch)?;

    let output_path = scratch.join(OUTPUT_FILE);
    decode_waveform(cfg, &codes_path, &output_path)?;

    let (samples, sample_rate) = audio::load_wav_mono(&output_path)?;
    log::debug!(
        "Vocoder produced {} samples at {sample_rate}Hz",
        samples.len()
    );
    Ok(RawAudio {
        samples,
        sample_rate,
    })
}

/// Stage 1: encode the reference audio into a prompt-token array.
fn encode_reference(cfg: &ToolchainConfig, reference_path: &Path) -> Result<(), OpenAudioError> {
    let mut cmd = Command::new(cfg.python_bin);
    cmd.args(["-m", "fish_speech.models.dac.inference", "--input-path"])
        .arg(reference_path)
        .arg("--checkpoint-path")
        .arg(cfg.checkpoint_dir.join(CODEC_CHECKPOINT));
    run_tool(cmd, cfg.toolkit_dir, "audio codec encoder")
}

/// Stage 2: generate semantic tokens from text, conditioned on the prompt.
fn generate_semantic_tokens(
    cfg: &ToolchainConfig,
    req: &PipelineRequest,
    prompt_tokens: &Path,
    output_dir: &Path,
) -> Result<(), OpenAudioError> {
    let mut cmd = Command::new(cfg.python_bin);
    cmd.args(["-m", "fish_speech.models.text2semantic.inference"])
        .arg("--text")
        .arg(req.text)
        .arg("--prompt-text")
        .arg(req.reference_text)
        .arg("--prompt-tokens")
        .arg(prompt_tokens)
        .arg("--top-p")
        .arg(req.top_p.to_string())
        .arg("--temperature")
        .arg(req.temperature.to_string())
        .arg("--repetition-penalty")
        .arg(req.repetition_penalty.to_string())
        .arg("--checkpoint-path")
        .arg(cfg.checkpoint_dir)
        .arg("--output-dir")
        .arg(output_dir)
        .args(["--num-samples", "1"]);
    run_tool(cmd, cfg.toolkit_dir, "semantic token generator")
}

/// Stage 3: decode semantic tokens into a waveform file.
fn decode_waveform(
    cfg: &ToolchainConfig,
    codes_path: &Path,
    output_path: &Path,
) -> Result<(), OpenAudioError> {
    let mut cmd = Command::new(cfg.python_bin);
    cmd.arg(VOCODER_SCRIPT)
        .arg("-i")
        .arg(codes_path)
        .arg("--checkpoint-path")
        .arg(cfg.checkpoint_dir.join(VOCODER_CHECKPOINT))
        .arg("--output")
        .arg(output_path);
    run_tool(cmd, cfg.toolkit_dir, "vocoder")
}

/// Run one tool to completion, capturing its output.
///
/// A non-zero exit status aborts the pipeline with the tool's stderr, or a
/// message naming the stage when stderr is empty.
fn run_tool(
    mut cmd: Command,
    working_dir: Option<&Path>,
    stage: &str,
) -> Result<(), OpenAudioError> {
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    log::info!("Running {stage}");
    log::debug!("{stage} command: {cmd:?}");

    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OpenAudioError::PythonNotFound
        } else {
            OpenAudioError::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            format!("{stage} exited with code {:?}", output.status.code())
        } else {
            stderr.trim_end().to_string()
        };
        return Err(OpenAudioError::Inference(detail));
    }

    Ok(())
}

fn create_scratch(root: Option<&Path>) -> Result<TempDir, OpenAudioError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("openaudio-");
    let scratch = match root {
        Some(root) => builder.tempdir_in(root)?,
        None => builder.tempdir()?,
    };
    Ok(scratch)
}
