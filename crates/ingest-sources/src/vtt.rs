//! Minimal WebVTT cue parser for the subtitle-extraction fallback rung.

use std::sync::OnceLock;

use regex::Regex;

use ingest_core::Caption;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn cue_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{2}:)?\d{2}:\d{2}[.,]\d{3}\s+-->\s+(\d{2}:)?\d{2}:\d{2}[.,]\d{3}").unwrap()
    })
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm` to seconds.
fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.replace(',', ".");
    let parts: Vec<&str> = raw.split(':').collect();
    match parts.as_slice() {
        [h, m, s] => {
            let h: f64 = h.parse().ok()?;
            let m: f64 = m.parse().ok()?;
            let s: f64 = s.parse().ok()?;
            Some(h * 3600.0 + m * 60.0 + s)
        }
        [m, s] => {
            let m: f64 = m.parse().ok()?;
            let s: f64 = s.parse().ok()?;
            Some(m * 60.0 + s)
        }
        _ => None,
    }
}

fn clean_cue_text(raw: &str) -> String {
    let no_tags = tag_re().replace_all(raw, "");
    no_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses the body of a `.vtt` file into raw `(start, end, text)` cues.
/// Cues with empty text after cleanup are dropped.
pub(crate) fn parse_vtt(contents: &str) -> Vec<Caption> {
    let mut captions = Vec::new();
    let mut lines = contents.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(caps) = cue_time_re().find(line) else {
            continue;
        };
        let header = caps.as_str();
        let mut parts = header.split("-->");
        let (Some(start_raw), Some(end_raw)) = (parts.next(), parts.next()) else {
            continue;
        };
        let (Some(start), Some(end)) = (
            parse_timestamp(start_raw.trim()),
            parse_timestamp(end_raw.trim().split_whitespace().next().unwrap_or("")),
        ) else {
            continue;
        };

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            text_lines.push(lines.next().unwrap());
        }
        let text = clean_cue_text(&text_lines.join(" "));
        if !text.is_empty() {
            captions.push(Caption { start, end, text });
        }
    }

    captions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_cues() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nHello there\n\n00:00:04.000 --> 00:00:05.000\nSecond <b>cue</b>\n";
        let out = parse_vtt(vtt);
        assert_eq!(out.len(), 2);
        assert!((out[0].start - 1.0).abs() < 1e-9);
        assert!((out[0].end - 3.5).abs() < 1e-9);
        assert_eq!(out[1].text, "Second cue");
    }

    #[test]
    fn drops_cues_with_empty_text() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n   \n";
        assert!(parse_vtt(vtt).is_empty());
    }

    #[test]
    fn handles_short_form_timestamps() {
        let vtt = "WEBVTT\n\n01:02.000 --> 01:05.000\nShort form\n";
        let out = parse_vtt(vtt);
        assert_eq!(out.len(), 1);
        assert!((out[0].start - 62.0).abs() < 1e-9);
    }
}
