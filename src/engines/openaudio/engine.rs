use std::path::{Path, PathBuf};

use derive_builder::Builder;

use crate::{SynthesisEngine, SynthesisResult};

use super::audio;
use super::pipeline::{self, OpenAudioError, OUTPUT_SAMPLE_RATE};

/// Floor applied to the sampling temperature derived from `stability`.
const MIN_TEMPERATURE: f32 = 0.01;

/// Parameters for configuring the OpenAudio toolchain.
#[derive(Debug, Clone, Default)]
pub struct OpenAudioModelParams {
    /// Python interpreter to invoke the fish-speech tools with.
    /// `None` uses `python` from PATH.
    pub python_bin: Option<PathBuf>,
    /// Working directory for tool invocations (the fish-speech checkout).
    /// Needed when the vocoder script path is resolved relative to it.
    pub toolkit_dir: Option<PathBuf>,
    /// Parent directory for per-request scratch dirs.
    /// `None` uses the system temp directory.
    pub scratch_dir: Option<PathBuf>,
}

/// Parameters for configuring an OpenAudio synthesis request.
#[derive(Debug, Clone, Builder)]
pub struct OpenAudioSynthesisParams {
    /// WAV bytes of the reference voice sample to clone.
    pub reference_audio: Vec<u8>,
    /// Transcript of the reference sample. Optional but improves cloning.
    #[builder(default)]
    pub reference_text: String,
    /// Language hint. The model auto-detects; advisory only.
    #[builder(default = "\"en\".to_string()")]
    pub language: String,
    /// Voice stability in [0, 1]; mapped to sampling temperature.
    #[builder(default = "0.75")]
    pub stability: f32,
    /// Voice similarity in [0, 1]; mapped to nucleus-sampling top-p.
    #[builder(default = "0.85")]
    pub similarity: f32,
    /// Speech speed multiplier, > 0. Applied as a post-processing
    /// time-stretch; 1.0 leaves the waveform untouched.
    #[builder(default = "1.0")]
    pub speed: f32,
    /// Repetition penalty for the token generator, > 0.
    #[builder(default = "1.2")]
    pub repetition_penalty: f32,
}

impl Default for OpenAudioSynthesisParams {
    fn default() -> Self {
        Self {
            reference_audio: Vec::new(),
            reference_text: String::new(),
            language: "en".to_string(),
            stability: 0.75,
            similarity: 0.85,
            speed: 1.0,
            repetition_penalty: 1.2,
        }
    }
}

impl OpenAudioSynthesisParams {
    fn validate(&self) -> Result<(), OpenAudioError> {
        if self.reference_audio.is_empty() {
            return Err(OpenAudioError::InvalidParams(
                "reference audio is required for voice cloning".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.stability) {
            return Err(OpenAudioError::InvalidParams(format!(
                "stability must be within [0, 1], got {}",
                self.stability
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity) {
            return Err(OpenAudioError::InvalidParams(format!(
                "similarity must be within [0, 1], got {}",
                self.similarity
            )));
        }
        if !(self.speed > 0.0) {
            return Err(OpenAudioError::InvalidParams(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }
        if !(self.repetition_penalty > 0.0) {
            return Err(OpenAudioError::InvalidParams(format!(
                "repetition penalty must be positive, got {}",
                self.repetition_penalty
            )));
        }
        Ok(())
    }
}

/// Map user-facing voice controls to the generator's sampling controls.
///
/// `temperature = max(0.01, 1 - stability)`; the floor avoids a degenerate
/// zero-temperature sampling regime. `top_p = similarity`, unchanged.
pub(crate) fn sampling_controls(stability: f32, similarity: f32) -> (f32, f32) {
    ((1.0 - stability).max(MIN_TEMPERATURE), similarity)
}

/// OpenAudio S1-mini voice-cloning engine.
///
/// Drives the fish-speech checkpoint tools as external processes and
/// post-processes the decoded waveform to 48 kHz mono.
///
/// # Quick Start
///
/// ```rust,no_run
/// use voiceclone_rs::{SynthesisEngine, engines::openaudio::{OpenAudioEngine, OpenAudioSynthesisParams}};
/// use std::path::PathBuf;
///
/// let mut engine = OpenAudioEngine::new();
/// engine.load_model(&PathBuf::from("checkpoints/s1-mini"))?;
/// let params = OpenAudioSynthesisParams {
///     reference_audio: std::fs::read("reference.wav")?,
///     ..Default::default()
/// };
/// let result = engine.synthesize("Hello, world!", Some(params))?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct OpenAudioEngine {
    checkpoint_dir: Option<PathBuf>,
    params: OpenAudioModelParams,
}

impl Default for OpenAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAudioEngine {
    /// Create a new engine that uses `python` from PATH.
    pub fn new() -> Self {
        Self {
            checkpoint_dir: None,
            params: OpenAudioModelParams::default(),
        }
    }
}

impl Drop for OpenAudioEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for OpenAudioEngine {
    type SynthesisParams = OpenAudioSynthesisParams;
    type ModelParams = OpenAudioModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !model_path.is_dir() {
            return Err(
                OpenAudioError::CheckpointNotFound(model_path.display().to_string()).into(),
            );
        }
        log::info!("Using OpenAudio checkpoints at {}", model_path.display());
        self.checkpoint_dir = Some(model_path.to_path_buf());
        self.params = params;
        Ok(())
    }

    fn unload_model(&mut self) {
        self.checkpoint_dir = None;
        self.params = OpenAudioModelParams::default();
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let checkpoint_dir = self
            .checkpoint_dir
            .as_ref()
            .ok_or(OpenAudioError::ModelNotLoaded)?;

        if text.trim().is_empty() {
            return Err(OpenAudioError::InvalidParams("text must not be empty".to_string()).into());
        }

        let p = params.unwrap_or_default();
        p.validate()?;

        let (temperature, top_p) = sampling_controls(p.stability, p.similarity);
        log::debug!(
            "Synthesizing with temperature={temperature}, top_p={top_p}, language hint '{}'",
            p.language
        );

        let cfg = pipeline::ToolchainConfig {
            python_bin: self
                .params
                .python_bin
                .as_deref()
                .unwrap_or_else(|| Path::new("python")),
            checkpoint_dir,
            toolkit_dir: self.params.toolkit_dir.as_deref(),
            scratch_root: self.params.scratch_dir.as_deref(),
        };
        let req = pipeline::PipelineRequest {
            text,
            reference_audio: &p.reference_audio,
            reference_text: &p.reference_text,
            top_p,
            temperature,
            repetition_penalty: p.repetition_penalty,
        };

        let raw = pipeline::run(&cfg, &req)?;

        // Speed is applied exactly once, here; it is never forwarded to the
        // token generator.
        let samples = if (p.speed - 1.0).abs() > f32::EPSILON {
            audio::time_stretch(&raw.samples, p.speed)
        } else {
            raw.samples
        };
        let samples = audio::resample_to(&samples, raw.sample_rate, OUTPUT_SAMPLE_RATE)?;

        Ok(SynthesisResult {
            samples,
            sample_rate: OUTPUT_SAMPLE_RATE,
        })
    }
}
