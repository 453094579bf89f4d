//! 16 kHz mono PCM decode, shared by the local recognizer and the diarizer.

use std::path::Path;

use ingest_core::{IngestError, IngestResult};

/// Reads `path` and returns mono `f32` samples in `[-1.0, 1.0]` at the
/// file's native sample rate. The Audio Acquirer already normalizes to 16
/// kHz mono, so callers generally don't need to resample.
pub(crate) fn read_samples(path: &Path) -> IngestResult<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| IngestError::asr_failed(format!("could not open {}: {e}", path.display())))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| IngestError::asr_failed(format!("corrupt audio: {e}")))?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) as f32).max(1.0);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(|e| IngestError::asr_failed(format!("corrupt audio: {e}")))?
        }
    };

    let mono = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}
