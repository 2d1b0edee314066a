//! # voiceclone-rs
//!
//! A Rust library for voice-cloning text-to-speech built on the OpenAudio
//! S1-mini checkpoint toolkit.
//!
//! ## Features
//!
//! - **Voice cloning**: Synthesize speech in the voice of a short reference
//!   sample, with stability/similarity/speed controls
//! - **Subprocess pipeline**: The codec encoder, semantic-token generator,
//!   and vocoder run as external checkpoint tools; all intermediate files
//!   live in a per-request scratch directory that is always cleaned up
//! - **Serverless adapter**: A job-payload handler that speaks base64 WAV
//!   in and out
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! voiceclone-rs = "0.1"
//! ```
//!
//! ```ignore
//! use std::path::PathBuf;
//! use voiceclone_rs::{engines::openaudio::{OpenAudioEngine, OpenAudioSynthesisParams}, SynthesisEngine};
//!
//! let mut engine = OpenAudioEngine::new();
//! engine.load_model(&PathBuf::from("checkpoints/s1-mini"))?;
//!
//! let params = OpenAudioSynthesisParams {
//!     reference_audio: std::fs::read("reference.wav")?,
//!     ..Default::default()
//! };
//! let result = engine.synthesize("Hello, world!", Some(params))?;
//! result.write_wav(&PathBuf::from("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engines;
pub mod handler;

use std::io::Cursor;
use std::path::Path;

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug)]
pub struct SynthesisResult {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (48000 for OpenAudio)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = hound::WavWriter::create(path, self.wav_spec())?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Encode the audio as a 32-bit float WAV byte buffer.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, self.wav_spec())?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(cursor.into_inner())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        }
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// This trait defines the standard operations that all synthesis engines must support.
/// Each engine may have different parameter types for model loading and inference configuration.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior (reference voice, speed, etc.)
    type SynthesisParams;
    /// Parameters for configuring model loading (interpreter, scratch dir, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, params)?.write_wav(wav_path)
    }
}
