//! OpenAudio S1-mini voice-cloning engine implementation.
//!
//! This module provides a synthesis engine that clones a reference voice by
//! driving the fish-speech checkpoint tools as external processes. The engine
//! itself performs no model inference: it marshals arguments, manages a
//! per-request scratch directory, and post-processes the decoded waveform
//! (time-stretch, resample to 48 kHz).
//!
//! # System Requirements
//!
//! A python environment with the `fish_speech` package installed and the
//! S1-mini checkpoints downloaded. The interpreter defaults to `python` from
//! PATH and can be overridden via [`OpenAudioModelParams::python_bin`].
//!
//! # Checkpoint Directory Layout
//!
//! ```text
//! checkpoints/s1-mini/
//! ├── codec.pth                                          # DAC audio codec
//! ├── firefly-gan-vq-fsq-8x1024-21hz-generator.pth       # vocoder
//! └── ...                                                # text2semantic weights
//! ```
//!
//! # Pipeline Stages
//!
//! | Stage | Tool | Input | Output |
//! |---|---|---|---|
//! | 1 | `fish_speech.models.dac.inference` | reference WAV | prompt tokens (`.npy`) |
//! | 2 | `fish_speech.models.text2semantic.inference` | text + prompt tokens | semantic tokens (`codes_0.npy`) |
//! | 3 | `tools/vqgan/inference.py` | semantic tokens | raw waveform WAV |
//!
//! Every intermediate artifact is written under a scratch directory unique to
//! the request, so concurrent synthesis calls never race on file names. The
//! scratch directory is removed on every exit path; removal failures are
//! logged and swallowed.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use voiceclone_rs::{SynthesisEngine, engines::openaudio::{OpenAudioEngine, OpenAudioSynthesisParams}};
//! use std::path::PathBuf;
//!
//! let mut engine = OpenAudioEngine::new();
//! engine.load_model(&PathBuf::from("checkpoints/s1-mini"))?;
//!
//! let params = OpenAudioSynthesisParams {
//!     reference_audio: std::fs::read("reference.wav")?,
//!     reference_text: "Hello, this is reference speech.".to_string(),
//!     ..Default::default()
//! };
//! let result = engine.synthesize("Hello, world!", Some(params))?;
//! println!("Generated {} samples at {}Hz", result.samples.len(), result.sample_rate);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## With Builder and Custom Controls
//!
//! ```rust,no_run
//! use voiceclone_rs::{SynthesisEngine, engines::openaudio::{OpenAudioEngine, OpenAudioSynthesisParamsBuilder}};
//! use std::path::PathBuf;
//!
//! let mut engine = OpenAudioEngine::new();
//! engine.load_model(&PathBuf::from("checkpoints/s1-mini"))?;
//!
//! let params = OpenAudioSynthesisParamsBuilder::default()
//!     .reference_audio(std::fs::read("reference.wav")?)
//!     .stability(0.6_f32)
//!     .similarity(0.9_f32)
//!     .speed(1.1_f32)
//!     .build()?;
//!
//! engine.synthesize_to_file("Hello!", &PathBuf::from("out.wav"), Some(params))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod engine;
pub mod pipeline;

#[cfg(all(test, unix))]
pub(crate) mod testutil;

pub use engine::{
    OpenAudioEngine, OpenAudioModelParams, OpenAudioSynthesisParams,
    OpenAudioSynthesisParamsBuilder,
};
pub use pipeline::{OpenAudioError, OUTPUT_SAMPLE_RATE};
