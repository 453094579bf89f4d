//! Quality-metric helpers shared by the local and remote recognizers.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

/// The standard ASR "compression ratio" signal: how much smaller `text`
/// gets under gzip. Repetitive/hallucinated output compresses unusually
/// well, which is why a high ratio flags `needs_refinement`.
pub(crate) fn compression_ratio(text: &str) -> f64 {
    if text.is_empty() {
        return 1.0;
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    if encoder.write_all(text.as_bytes()).is_err() {
        return 1.0;
    }
    let compressed = match encoder.finish() {
        Ok(bytes) => bytes,
        Err(_) => return 1.0,
    };
    if compressed.is_empty() {
        return 1.0;
    }
    text.len() as f64 / compressed.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repetitive_text_has_a_higher_ratio_than_varied_text() {
        let repetitive = "the the the the the the the the the the ".repeat(10);
        let varied = "Quick brown foxes jump over lazy dogs near the riverbank at dawn. ".repeat(10);
        assert!(compression_ratio(&repetitive) > compression_ratio(&varied));
    }

    #[test]
    fn empty_text_is_one() {
        assert!((compression_ratio("") - 1.0).abs() < 1e-9);
    }
}
