//! Waveform post-processing: WAV loading, time-stretching, resampling.

use std::f32::consts::PI;
use std::path::Path;

use rubato::{FftFixedIn, Resampler};

use super::pipeline::OpenAudioError;

/// Analysis/synthesis frame length for the overlap-add stretcher.
const STRETCH_FRAME: usize = 1024;
/// Synthesis hop for the overlap-add stretcher.
const STRETCH_HOP: usize = 256;

/// Resampler input block size.
const RESAMPLE_CHUNK: usize = 1024;
/// Number of FFT sub-chunks per block.
const RESAMPLE_SUB_CHUNKS: usize = 2;

/// Load a WAV file as mono f32 samples plus its native sample rate.
///
/// Integer PCM (16/24/32-bit) is normalized to [-1, 1]; multi-channel audio
/// is downmixed by averaging each frame.
pub fn load_wav_mono(path: &Path) -> Result<(Vec<f32>, u32), OpenAudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => {
            reader.samples::<f32>().collect::<Result<_, hound::Error>>()?
        }
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, hound::Error>>()?
        }
    };

    Ok((downmix(samples, spec.channels as usize), spec.sample_rate))
}

fn downmix(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Time-stretch mono audio by `rate` without changing pitch.
///
/// `rate > 1.0` speeds the audio up (shorter output), `rate < 1.0` slows it
/// down. Windowed overlap-add: frames are taken every `hop * rate` input
/// samples and laid down every `hop` output samples, then the Hann window
/// envelope is divided back out. Input shorter than one frame is returned
/// unchanged.
pub fn time_stretch(samples: &[f32], rate: f32) -> Vec<f32> {
    if samples.is_empty() || (rate - 1.0).abs() < f32::EPSILON || samples.len() < STRETCH_FRAME {
        return samples.to_vec();
    }

    let analysis_hop = ((STRETCH_HOP as f32) * rate).round().max(1.0) as usize;
    let window: Vec<f32> = (0..STRETCH_FRAME)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (STRETCH_FRAME - 1) as f32).cos()))
        .collect();

    let expected = (samples.len() as f32 / rate).round() as usize;
    let mut out = vec![0.0f32; expected + STRETCH_FRAME];
    let mut envelope = vec![0.0f32; expected + STRETCH_FRAME];

    let mut in_pos = 0usize;
    let mut out_pos = 0usize;
    while in_pos < samples.len() && out_pos + STRETCH_FRAME <= out.len() {
        // The final frames are partial; laying them down keeps the tail of
        // the signal in the output instead of a frame of silence.
        let frame_len = (samples.len() - in_pos).min(STRETCH_FRAME);
        for i in 0..frame_len {
            let w = window[i];
            out[out_pos + i] += samples[in_pos + i] * w;
            envelope[out_pos + i] += w;
        }
        in_pos += analysis_hop;
        out_pos += STRETCH_HOP;
    }

    for (o, &e) in out.iter_mut().zip(&envelope) {
        if e > 1e-6 {
            *o /= e;
        }
    }

    out.truncate(expected);
    out
}

/// Resample mono audio from `sr_in` to `sr_out`.
///
/// Returns the input unchanged when the rates already match. Processing is
/// chunked through an `FftFixedIn` resampler; the final partial chunk is
/// zero-padded, the filter delay is flushed with silent blocks and dropped
/// from the front, and the output is trimmed to the expected length, so the
/// result stays aligned with the input timeline.
pub fn resample_to(input: &[f32], sr_in: u32, sr_out: u32) -> Result<Vec<f32>, OpenAudioError> {
    if sr_in == sr_out {
        return Ok(input.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        sr_in as usize,
        sr_out as usize,
        RESAMPLE_CHUNK,
        RESAMPLE_SUB_CHUNKS,
        1,
    )?;
    let delay = resampler.output_delay();

    let expected = (input.len() as f64 * sr_out as f64 / sr_in as f64).ceil() as usize;
    let mut out = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut pos = 0;
    while pos < input.len() {
        let end = (pos + RESAMPLE_CHUNK).min(input.len());
        let mut block = vec![0.0f32; RESAMPLE_CHUNK];
        block[..end - pos].copy_from_slice(&input[pos..end]);

        let frames = resampler.process(&[block], None)?;
        out.extend_from_slice(&frames[0]);
        pos = end;
    }

    // The resampler holds `delay` output frames of latency; keep feeding
    // silence until the tail of the signal has made it out.
    while out.len() < expected + delay {
        let block = vec![0.0f32; RESAMPLE_CHUNK];
        let frames = resampler.process(&[block], None)?;
        out.extend_from_slice(&frames[0]);
    }

    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{load_wav_mono, resample_to, time_stretch, STRETCH_FRAME};

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| ((i % 200) as f32 - 100.0) / 100.0).collect()
    }

    #[test]
    fn stretch_at_unit_rate_is_identity() {
        let input = ramp(4096);
        assert_eq!(time_stretch(&input, 1.0), input);
    }

    #[test]
    fn stretch_shortens_at_rates_above_one() {
        let input = ramp(48000);
        let out = time_stretch(&input, 2.0);
        assert_eq!(out.len(), 24000);
    }

    #[test]
    fn stretch_lengthens_at_rates_below_one() {
        let input = ramp(48000);
        let out = time_stretch(&input, 0.5);
        assert_eq!(out.len(), 96000);
    }

    #[test]
    fn stretch_preserves_amplitude_bounds() {
        let input = ramp(16384);
        let out = time_stretch(&input, 1.5);
        let peak = out.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        assert!(peak <= 1.05, "peak {peak} exceeds input bounds");
    }

    #[test]
    fn slowed_audio_keeps_energy_to_the_end() {
        let input = vec![0.5f32; 48000];
        let out = time_stretch(&input, 0.5);
        assert_eq!(out.len(), 96000);
        for (i, &s) in out[95000..].iter().enumerate() {
            assert!(
                (s - 0.5).abs() < 0.05,
                "tail sample {} is {s}, expected ~0.5",
                95000 + i
            );
        }
    }

    #[test]
    fn stretch_passes_short_input_through() {
        let input = ramp(STRETCH_FRAME - 1);
        assert_eq!(time_stretch(&input, 2.0), input);
    }

    #[test]
    fn resample_is_identity_when_rates_match() {
        let input = ramp(4096);
        let out = resample_to(&input, 48000, 48000).expect("resample should succeed");
        assert_eq!(out, input);
    }

    #[test]
    fn resample_scales_length_by_rate_ratio() {
        let input = ramp(4800);
        let out = resample_to(&input, 16000, 48000).expect("resample should succeed");
        assert_eq!(out.len(), 14400);

        let out = resample_to(&input, 48000, 24000).expect("resample should succeed");
        assert_eq!(out.len(), 2400);
    }

    #[test]
    fn resample_aligns_output_with_input_timeline() {
        let input: Vec<f32> = (0..4800).map(|i| i as f32 / 4800.0).collect();
        let out = resample_to(&input, 16000, 48000).expect("resample should succeed");
        assert_eq!(out.len(), 14400);

        // A linear ramp survives resampling, so output samples away from the
        // edges must sit where the input timeline puts them.
        for &(idx, want) in &[(3600usize, 0.25f32), (7200, 0.5), (10800, 0.75)] {
            assert!(
                (out[idx] - want).abs() < 0.01,
                "out[{idx}] = {}, want ~{want}",
                out[idx]
            );
        }
    }

    #[test]
    fn loads_stereo_int_wav_as_normalized_mono() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("stereo.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
        for &(l, r) in &[(8192i16, 8192i16), (-16384, 0), (0, 0)] {
            writer.write_sample(l).expect("write");
            writer.write_sample(r).expect("write");
        }
        writer.finalize().expect("finalize");

        let (samples, sample_rate) = load_wav_mono(&path).expect("load should succeed");
        assert_eq!(sample_rate, 16000);
        assert_eq!(samples.len(), 3);
        assert!((samples[0] - 0.25).abs() < 1e-4);
        assert!((samples[1] - (-0.25)).abs() < 1e-4);
        assert!(samples[2].abs() < 1e-6);
    }

    #[test]
    fn loads_float_wav_exactly() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("float.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
        for &s in &[0.1f32, -0.9, 0.5] {
            writer.write_sample(s).expect("write");
        }
        writer.finalize().expect("finalize");

        let (samples, sample_rate) = load_wav_mono(&path).expect("load should succeed");
        assert_eq!(sample_rate, 44100);
        assert_eq!(samples, vec![0.1, -0.9, 0.5]);
    }
}
