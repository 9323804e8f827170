//! Transcript interpretation: wake word, end word, note commands
//!
//! Matching is deliberately literal — a case-insensitive prefix test for the
//! wake word and an anchored pattern for note triggers. No fuzzy matching.

use std::sync::LazyLock;

use regex::Regex;

/// Leading-anchored note trigger, tolerant of stray punctuation before it
static NOTE_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s,.;:!?-]*(?:take a note|record note|note)\b")
        .expect("note trigger pattern is valid")
});

/// Outcome of interpreting a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// Transcript did not start with the wake word; the turn is discarded
    NotWoken,
    /// Wake word matched; payload extracted
    Woken(ParsedUtterance),
}

/// A wake-word-authorized utterance, split into command kind and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUtterance {
    /// True for "note" commands, false for queries
    pub is_note: bool,
    /// Note body or query text; may be empty (wake word spoken alone)
    pub payload: String,
}

/// Interpret a raw transcript against the session's wake and end words
///
/// The wake word must prefix the transcript (case-insensitive). The end word,
/// if configured and present as a suffix, is stripped — it lets a speaker
/// explicitly close the utterance. An empty payload is passed through
/// unchanged; downstream accepts empty queries and note bodies.
#[must_use]
pub fn interpret(transcript: &str, wake_word: &str, end_word: &str) -> Interpretation {
    let Some(rest) = strip_prefix_ci(transcript.trim(), wake_word.trim()) else {
        return Interpretation::NotWoken;
    };

    // Stray punctuation is tolerated only at the wake-word boundary
    // ("Computer, …"); the payload's own punctuation is preserved.
    let mut payload = rest.trim_start_matches(is_edge_char).trim_end();
    if !end_word.trim().is_empty() {
        if let Some(stripped) = strip_end_word(payload, end_word.trim()) {
            payload = stripped;
        }
    }

    if let Some(m) = NOTE_TRIGGER.find(payload) {
        let body = payload[m.end()..].trim();
        return Interpretation::Woken(ParsedUtterance {
            is_note: true,
            payload: body.to_string(),
        });
    }

    Interpretation::Woken(ParsedUtterance {
        is_note: false,
        payload: payload.to_string(),
    })
}

/// Whitespace or stray punctuation at an utterance boundary
fn is_edge_char(c: char) -> bool {
    c.is_whitespace() || ",.;:!?-".contains(c)
}

/// Strip a trailing end word, if present
///
/// Punctuation after the end word ("… thank you.") and the separator before
/// it ("…, thank you") belong to the closing phrase and are removed with it.
/// Sentence punctuation the payload carries itself ("what time is it?") is
/// kept.
fn strip_end_word<'a>(payload: &'a str, end_word: &str) -> Option<&'a str> {
    let candidate = payload.trim_end_matches(is_edge_char);
    let front = strip_suffix_ci(candidate, end_word)?;
    Some(
        front
            .trim_end()
            .trim_end_matches(|c: char| ",;:-".contains(c))
            .trim_end(),
    )
}

/// Case-insensitive prefix strip returning the remainder of `text`
///
/// Walks characters so multibyte transcripts never split at a bad byte
/// offset.
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut expected = prefix.chars().flat_map(char::to_lowercase);
    let mut iter = text.char_indices();
    loop {
        let Some(want) = expected.next() else {
            return Some(iter.as_str());
        };
        let (_, got) = iter.next()?;
        let mut got_lower = got.to_lowercase();
        if got_lower.next() != Some(want) || got_lower.next().is_some() {
            return None;
        }
    }
}

/// Case-insensitive suffix strip returning the front of `text`
fn strip_suffix_ci<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let mut expected: Vec<char> = suffix.chars().flat_map(char::to_lowercase).collect();
    let mut end = text.len();
    for (idx, c) in text.char_indices().rev() {
        let Some(want) = expected.pop() else {
            return Some(&text[..end]);
        };
        let mut got_lower = c.to_lowercase();
        if got_lower.next() != Some(want) || got_lower.next().is_some() {
            return None;
        }
        end = idx;
    }
    if expected.is_empty() {
        Some(&text[..end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn woken(is_note: bool, payload: &str) -> Interpretation {
        Interpretation::Woken(ParsedUtterance {
            is_note,
            payload: payload.to_string(),
        })
    }

    #[test]
    fn note_command_with_punctuation_after_wake_word() {
        assert_eq!(
            interpret("Computer, note buy milk", "computer", ""),
            woken(true, "buy milk")
        );
    }

    #[test]
    fn query_with_end_word_stripped() {
        assert_eq!(
            interpret("Computer what time is it thank you", "computer", "thank you"),
            woken(false, "what time is it")
        );
    }

    #[test]
    fn missing_wake_word_is_not_woken() {
        assert_eq!(
            interpret("hello world", "computer", ""),
            Interpretation::NotWoken
        );
    }

    #[test]
    fn wake_word_alone_yields_empty_query() {
        assert_eq!(interpret("computer", "computer", ""), woken(false, ""));
    }

    #[test]
    fn note_trigger_variants() {
        assert_eq!(
            interpret("computer take a note remember the lighthouse", "computer", ""),
            woken(true, "remember the lighthouse")
        );
        assert_eq!(
            interpret("computer record note chapter twelve twist", "computer", ""),
            woken(true, "chapter twelve twist")
        );
    }

    #[test]
    fn note_word_must_be_whole() {
        // "notebook" is not a note command
        assert_eq!(
            interpret("computer notebook prices", "computer", ""),
            woken(false, "notebook prices")
        );
    }

    #[test]
    fn note_alone_yields_empty_body() {
        assert_eq!(interpret("computer note", "computer", ""), woken(true, ""));
    }

    #[test]
    fn wake_word_match_is_case_insensitive() {
        assert_eq!(
            interpret("COMPUTER, what's an orrery", "computer", ""),
            woken(false, "what's an orrery")
        );
    }

    #[test]
    fn end_word_case_insensitive_suffix() {
        assert_eq!(
            interpret("computer how long is the book, Thank You.", "computer", "thank you"),
            woken(false, "how long is the book")
        );
    }

    #[test]
    fn payload_keeps_its_own_trailing_punctuation() {
        assert_eq!(
            interpret("Computer, what time is it? Thank you.", "computer", "thank you"),
            woken(false, "what time is it?")
        );
        assert_eq!(
            interpret("computer what's the weather?", "computer", "thank you"),
            woken(false, "what's the weather?")
        );
    }

    #[test]
    fn note_body_keeps_inner_punctuation() {
        assert_eq!(
            interpret("computer note call Ana, then Ben.", "computer", ""),
            woken(true, "call Ana, then Ben.")
        );
    }

    #[test]
    fn end_word_only_stripped_at_end() {
        assert_eq!(
            interpret("computer say thank you in french", "computer", "thank you"),
            woken(false, "say thank you in french")
        );
    }
}
