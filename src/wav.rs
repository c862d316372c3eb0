//! WAV input for the loop commands
//!
//! Compressed formats are decoded by the host application; the CLI only
//! reads PCM WAV through `hound`.

use std::io::Read;
use std::path::Path;

use loop_quantizer::PcmBuffer;

/// Read a WAV file into a normalized sample buffer
pub fn read_wav(path: &Path) -> hound::Result<PcmBuffer> {
    decode(hound::WavReader::open(path)?)
}

/// Read WAV data from any reader, e.g. an in-memory buffer
pub fn read_wav_from<R: Read>(reader: R) -> hound::Result<PcmBuffer> {
    decode(hound::WavReader::new(reader)?)
}

fn decode<R: Read>(reader: hound::WavReader<R>) -> hound::Result<PcmBuffer> {
    let spec = reader.spec();

    let pcm = match spec.sample_format {
        hound::SampleFormat::Float => {
            let samples = reader
                .into_samples::<f32>()
                .collect::<hound::Result<Vec<_>>>()?;
            PcmBuffer::new(samples, spec.sample_rate, spec.channels)
        }
        hound::SampleFormat::Int => {
            let samples = reader
                .into_samples::<i32>()
                .collect::<hound::Result<Vec<_>>>()?;
            PcmBuffer::from_int_samples(
                &samples,
                spec.bits_per_sample,
                spec.sample_rate,
                spec.channels,
            )
        }
    };

    log::debug!(
        "Decoded {} frames, {} channel(s) at {} Hz ({} bit {:?})",
        pcm.frames(),
        pcm.channels,
        pcm.sample_rate,
        spec.bits_per_sample,
        spec.sample_format
    );
    Ok(pcm)
}
