use ingest_core::Segment;

const SUBSTANTIVE_LEN: usize = 20;
const TERMINAL_PUNCTUATION: [char; 3] = ['.', '!', '?'];

/// Collapses whitespace runs, trims, and appends terminal punctuation to
/// substantive fragments that lack it. Returns `None` if the
/// resulting text is empty.
pub(crate) fn normalize(segment: &Segment) -> Option<Segment> {
    let collapsed = segment
        .text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.is_empty() {
        return None;
    }

    let text = if collapsed.len() > SUBSTANTIVE_LEN
        && !collapsed.ends_with(TERMINAL_PUNCTUATION.as_slice())
    {
        format!("{collapsed}.")
    } else {
        collapsed
    };

    Some(Segment {
        text,
        ..segment.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::{SegmentMetrics, SpeakerLabel};

    fn seg(text: &str) -> Segment {
        Segment {
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
            speaker_label: SpeakerLabel::Chaffee,
            speaker_confidence: None,
            metrics: SegmentMetrics::default(),
            re_asr: false,
            is_overlap: false,
            needs_refinement: false,
            embedding: None,
        }
    }

    #[test]
    fn collapses_internal_whitespace() {
        let out = normalize(&seg("hello   world\n\tfoo")).unwrap();
        assert_eq!(out.text, "hello world foo");
    }

    #[test]
    fn appends_period_to_long_fragments_missing_terminal_punctuation() {
        let out = normalize(&seg("this fragment is definitely long enough to qualify")).unwrap();
        assert!(out.text.ends_with('.'));
    }

    #[test]
    fn short_fragments_are_left_unpunctuated() {
        let out = normalize(&seg("hi there")).unwrap();
        assert_eq!(out.text, "hi there");
    }

    #[test]
    fn blank_text_normalizes_away() {
        assert!(normalize(&seg("   \n\t  ")).is_none());
    }
}
