//! Decode any supported container/codec to 16 kHz mono `f32` PCM.

use crate::defaults::SAMPLE_RATE;
use crate::error::{MinutesError, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

fn decode_error(message: impl Into<String>) -> MinutesError {
    MinutesError::AudioDecode {
        message: message.into(),
    }
}

/// Decode an audio file, using its extension as a probe hint.
pub fn decode_file(path: &Path) -> Result<Vec<f32>> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_error(format!("probe: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| decode_error("no audio track found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params
        .sample_rate
        .ok_or_else(|| decode_error("unknown sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(format!("codec: {e}")))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(decode_error(format!("packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                tracing::warn!(error = %e, "Skipping corrupt audio frame");
                continue;
            }
            Err(e) => return Err(decode_error(format!("decode: {e}"))),
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        if frames == 0 {
            continue;
        }

        // Some containers only announce the layout in the first decoded buffer
        channels = spec.channels.count().max(1);
        let mut buf = SampleBuffer::<f32>::new(frames as u64, spec);
        buf.copy_interleaved_ref(decoded);
        downmix_into(buf.samples(), channels, &mut mono);
    }

    if mono.is_empty() {
        return Err(decode_error("no audio samples decoded"));
    }

    if source_rate != SAMPLE_RATE {
        mono = resample(&mono, source_rate, SAMPLE_RATE)?;
    }

    tracing::debug!(
        samples = mono.len(),
        duration_secs = mono.len() as f32 / SAMPLE_RATE as f32,
        source_rate,
        channels,
        "Audio decoded to 16kHz mono PCM"
    );

    Ok(mono)
}

/// Average interleaved frames into mono.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    for frame in interleaved.chunks(channels) {
        out.push(frame.iter().sum::<f32>() / channels as f32);
    }
}

/// Sinc resampling to `to_rate`, trimmed to the input's duration.
///
/// The filter delays its output by `output_delay()` frames; that lead-in is
/// dropped and the tail flushed so the last input samples are kept.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;
    let resample_error = |e: rubato::ResampleError| decode_error(format!("resample: {e}"));

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| decode_error(format!("resampler init: {e}")))?;

    let delay = resampler.output_delay();
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(delay + expected_len + chunk_size);

    let mut chunks = samples.chunks_exact(chunk_size);
    for chunk in &mut chunks {
        let result = resampler.process(&[chunk], None).map_err(resample_error)?;
        output.extend(result.into_iter().flatten());
    }
    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let result = resampler
            .process_partial(Some(&[remainder][..]), None)
            .map_err(resample_error)?;
        output.extend(result.into_iter().flatten());
    }

    // Each flush yields about one chunk of output, so a few always suffice
    let max_flushes = delay / chunk_size + 2;
    for _ in 0..max_flushes {
        if output.len() >= delay + expected_len {
            break;
        }
        let result = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(resample_error)?;
        output.extend(result.into_iter().flatten());
    }

    let mut output = output.split_off(delay.min(output.len()));
    output.truncate(expected_len);
    Ok(output)
}
