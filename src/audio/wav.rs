//! PCM helpers: sample conversion and WAV packaging for analysis

use bytes::{BufMut, Bytes, BytesMut};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

use super::AudioFormat;

/// Down-mix interleaved frames to mono and encode as little-endian i16
pub fn samples_to_pcm16(samples: &[f32], channels: usize) -> Bytes {
    let channels = channels.max(1);
    let mut out = BytesMut::with_capacity(samples.len() / channels * 2);
    for frame in samples.chunks(channels) {
        let mono = frame.iter().sum::<f32>() / frame.len() as f32;
        let sample = (mono.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.put_i16_le(sample);
    }
    out.freeze()
}

/// Wrap a raw PCM payload in a WAV container
pub fn pcm16_to_wav(pcm: &[u8], format: AudioFormat) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for pair in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
