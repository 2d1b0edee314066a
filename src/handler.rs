//! Serverless job adapter for the OpenAudio engine.
//!
//! Accepts a structured job payload with a base64-encoded reference voice
//! sample, runs synthesis, and returns base64-encoded 48 kHz WAV audio.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::engines::openaudio::{OpenAudioEngine, OpenAudioError, OpenAudioSynthesisParams};
use crate::SynthesisEngine;

/// Greeting used when a job omits `text`.
pub const DEFAULT_TEXT: &str = "Hello! This is a cloned voice speaking.";

/// A synthesis job as delivered by the queue.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisJob {
    /// Queue-assigned job id, if any.
    #[serde(default)]
    pub id: Option<String>,
    /// The synthesis request itself.
    #[serde(default)]
    pub input: JobInput,
}

/// Request fields, all optional on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobInput {
    pub text: String,
    /// Base64-encoded WAV bytes of the reference voice. Required for
    /// meaningful output; rejected up front when empty.
    pub speaker_wav_base64: String,
    pub reference_text: String,
    pub language: String,
    pub stability: f32,
    pub similarity: f32,
    pub speed: f32,
    pub repetition_penalty: f32,
}

impl Default for JobInput {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            speaker_wav_base64: String::new(),
            reference_text: String::new(),
            language: "en".to_string(),
            stability: 0.75,
            similarity: 0.85,
            speed: 1.0,
            repetition_penalty: 1.2,
        }
    }
}

/// Response payload: base64 WAV plus transport metadata.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutput {
    pub audio_base64: String,
    pub format: &'static str,
    pub sample_rate: u32,
}

/// Handle one synthesis job against a loaded engine.
pub fn handle_job(
    engine: &mut OpenAudioEngine,
    job: &SynthesisJob,
) -> Result<JobOutput, Box<dyn std::error::Error>> {
    if let Some(id) = &job.id {
        log::info!("Handling synthesis job {id}");
    }

    let input = &job.input;
    if input.speaker_wav_base64.is_empty() {
        return Err(OpenAudioError::InvalidParams(
            "speaker_wav_base64 is required".to_string(),
        )
        .into());
    }
    let reference_audio = general_purpose::STANDARD.decode(&input.speaker_wav_base64)?;

    let params = OpenAudioSynthesisParams {
        reference_audio,
        reference_text: input.reference_text.clone(),
        language: input.language.clone(),
        stability: input.stability,
        similarity: input.similarity,
        speed: input.speed,
        repetition_penalty: input.repetition_penalty,
    };

    let result = engine.synthesize(&input.text, Some(params))?;
    let wav = result.to_wav_bytes()?;

    Ok(JobOutput {
        audio_base64: general_purpose::STANDARD.encode(wav),
        format: "wav",
        sample_rate: result.sample_rate,
    })
}

/// Handle a raw JSON job payload; convenience wrapper over [`handle_job`].
pub fn handle_value(
    engine: &mut OpenAudioEngine,
    job: &serde_json::Value,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let job: SynthesisJob = serde_json::from_value(job.clone())?;
    Ok(serde_json::to_value(handle_job(engine, &job)?)?)
}
