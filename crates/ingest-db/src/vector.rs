//! Encoding helpers for the Postgres `vector` column type (pgvector).
//!
//! `sqlx` has no native binding for `vector`; the column is written and
//! read through its text representation (`[0.1,0.2,...]`) and cast with
//! `::vector` in SQL. This avoids pulling in a crate solely for a type
//! that a literal-string cast handles in a few lines.

/// Render an embedding as the text literal pgvector expects.
#[must_use]
pub fn encode(embedding: &[f32]) -> String {
    let mut s = String::with_capacity(embedding.len() * 8 + 2);
    s.push('[');
    for (i, v) in embedding.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        s.push_str(&v.to_string());
    }
    s.push(']');
    s
}

/// Parse pgvector's text representation back into a dense `f32` vector.
#[must_use]
pub fn decode(text: &str) -> Option<Vec<f32>> {
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return Some(Vec::new());
    }
    inner
        .split(',')
        .map(|part| part.trim().parse::<f32>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_text_representation() {
        let embedding = vec![0.1_f32, -0.25, 3.0];
        let encoded = encode(&embedding);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.len(), embedding.len());
        for (a, b) in embedding.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn empty_vector_round_trips() {
        assert_eq!(encode(&[]), "[]");
        assert_eq!(decode("[]").unwrap(), Vec::<f32>::new());
    }

    #[test]
    fn decode_rejects_malformed_input() {
        assert!(decode("0.1,0.2").is_none());
    }
}
