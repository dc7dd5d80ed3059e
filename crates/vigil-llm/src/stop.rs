//! Stop-sequence restoration
//!
//! Bedrock strips the matched stop sequence from the generated text. Callers
//! of an OpenAI-style client expect a completion that finished on a stop
//! sequence to end with it, so providers re-append the sequence here.

/// Suffix to append so `text` ends with a stop sequence
///
/// Returns `None` when no candidates were requested or `text` already ends
/// with one of them. Otherwise prefers the sequence the provider reported as
/// matched, falling back to the first candidate.
pub fn missing_stop_suffix<'a>(text: &str, candidates: &'a [String], matched: Option<&str>) -> Option<&'a str> {
    let candidates: Vec<&'a str> = candidates
        .iter()
        .map(String::as_str)
        .filter(|c| !c.is_empty())
        .collect();

    if candidates.is_empty() || candidates.iter().any(|c| text.ends_with(*c)) {
        return None;
    }

    matched
        .and_then(|m| candidates.iter().copied().find(|c| *c == m))
        .or_else(|| candidates.first().copied())
}

/// Append the missing stop sequence to `text` in place
pub fn restore_stop_sequence(text: &mut String, candidates: &[String], matched: Option<&str>) {
    if let Some(suffix) = missing_stop_suffix(text, candidates, matched) {
        tracing::debug!(suffix, "restoring stripped stop sequence");
        text.push_str(suffix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn appends_first_candidate_when_unmatched() {
        let mut text = "1, 2, 3, 4, ".to_owned();
        restore_stop_sequence(&mut text, &seqs(&["5", "10"]), None);
        assert_eq!(text, "1, 2, 3, 4, 5");
    }

    #[test]
    fn prefers_reported_match() {
        let mut text = "count: 1 2 3 4 ".to_owned();
        restore_stop_sequence(&mut text, &seqs(&["5", "10"]), Some("10"));
        assert_eq!(text, "count: 1 2 3 4 10");
    }

    #[test]
    fn ignores_reported_match_outside_candidates() {
        let candidates = seqs(&["</tool>"]);
        assert_eq!(missing_stop_suffix("<tool>1", &candidates, Some("```")), Some("</tool>"));
    }

    #[test]
    fn leaves_text_that_already_ends_with_a_candidate() {
        let mut text = "```".to_owned();
        restore_stop_sequence(&mut text, &seqs(&["```"]), None);
        assert_eq!(text, "```");

        let mut text = "1 2 3 4 5 6 7 8 9 10".to_owned();
        restore_stop_sequence(&mut text, &seqs(&["5", "10"]), None);
        assert_eq!(text, "1 2 3 4 5 6 7 8 9 10");
    }

    #[test]
    fn no_candidates_means_no_change() {
        assert_eq!(missing_stop_suffix("hello", &[], Some("x")), None);
        assert_eq!(missing_stop_suffix("hello", &seqs(&[""]), None), None);
    }
}
