//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! - `openaudio` - OpenAudio S1-mini voice cloning (external fish-speech
//!   checkpoint tools, python required)

pub mod openaudio;
