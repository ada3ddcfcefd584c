//! Voice command recognition.
//!
//! Turns a transcribed utterance into a `RecognizedCommand`. Recognition is a
//! pure function of the text: the utterance is normalized, matched against
//! the phrase table, and the best confidence tier decides the result. Two
//! different commands at the best tier make the result ambiguous; it is then
//! reported with `Unknown` confidence so it can be shown but never executed.

pub mod patterns;

use std::sync::OnceLock;

use crate::types::{CommandConfidence, RecognizedCommand};
use patterns::{PatternMatch, PatternSet};

/// Sentence punctuation stripped from the end of an utterance.
const TRAILING_PUNCTUATION: &[char] = &['。', '、', '.', ',', '!', '?', '！', '？', '，'];

/// Trim, collapse whitespace runs (including U+3000) and drop trailing punctuation.
pub fn normalize(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| TRAILING_PUNCTUATION.contains(&c) || c.is_whitespace())
        .to_string()
}

/// Matches utterances against the compiled phrase table.
#[derive(Default)]
pub struct VoiceCommandRecognizer {
    patterns: PatternSet,
}

impl VoiceCommandRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognize a command, or `None` when nothing in the table matches.
    pub fn recognize(&self, text: &str) -> Option<RecognizedCommand> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }

        let matches = self.patterns.detect(&normalized);
        let best = matches.iter().map(|m| m.confidence).max()?;
        let tier: Vec<&PatternMatch> = matches.iter().filter(|m| m.confidence == best).collect();

        // A phrase found only inside a longer phrase of another command does not compete.
        let candidates: Vec<&PatternMatch> = tier
            .iter()
            .copied()
            .filter(|m| {
                !tier
                    .iter()
                    .any(|other| other.command != m.command && m.is_covered_by(other))
            })
            .collect();
        let first = candidates.first()?;
        let ambiguous = candidates.iter().any(|c| c.command != first.command);

        let confidence = if ambiguous {
            tracing::debug!(
                text = %normalized,
                candidates = candidates.len(),
                "Ambiguous voice command"
            );
            CommandConfidence::Unknown
        } else {
            best
        };
        Some(RecognizedCommand::new(first.command.clone(), confidence, normalized))
    }

    /// Like `recognize`, but an unmatched utterance becomes `Unknown(text)`.
    pub fn recognize_or_unknown(&self, text: &str) -> RecognizedCommand {
        self.recognize(text)
            .unwrap_or_else(|| RecognizedCommand::unknown(normalize(text)))
    }
}

fn shared() -> &'static VoiceCommandRecognizer {
    static RECOGNIZER: OnceLock<VoiceCommandRecognizer> = OnceLock::new();
    RECOGNIZER.get_or_init(VoiceCommandRecognizer::new)
}

/// Recognize with the process-wide recognizer.
pub fn recognize(text: &str) -> Option<RecognizedCommand> {
    shared().recognize(text)
}

/// `recognize`, falling back to `Unknown(text)`.
pub fn recognize_or_unknown(text: &str) -> RecognizedCommand {
    shared().recognize_or_unknown(text)
}

// =============================================================================
// Tests
// =============================================================================
