//! Phrase table for voice commands.
//!
//! Each command lists Japanese and English phrases plus a few bare keywords.
//! Every entry compiles into up to three regexes, one per confidence tier:
//! the whole utterance equals a phrase (high), a phrase appears inside the
//! utterance (medium), a keyword appears inside the utterance (low).

use regex::Regex;

use crate::types::{CommandConfidence, Destination, VoiceCommand};

/// Synonyms for one command.
struct CommandPhrases {
    command: VoiceCommand,
    phrases: &'static [&'static str],
    keywords: &'static [&'static str],
}

fn phrase_table() -> Vec<CommandPhrases> {
    vec![
        // =====================================================================
        // Recording
        // =====================================================================
        CommandPhrases {
            command: VoiceCommand::StartRecording,
            phrases: &[
                "録音開始",
                "録音を開始",
                "録音を開始して",
                "録音スタート",
                "録音して",
                "録音を始めて",
                "start recording",
                "begin recording",
                "record",
            ],
            keywords: &["開始", "スタート", "start"],
        },
        CommandPhrases {
            command: VoiceCommand::StopRecording,
            phrases: &[
                "録音停止",
                "録音を停止",
                "録音を停止して",
                "録音終了",
                "録音を終了",
                "録音を止めて",
                "録音ストップ",
                "stop recording",
                "end recording",
                "finish recording",
            ],
            keywords: &["停止", "終了", "ストップ", "stop"],
        },
        CommandPhrases {
            command: VoiceCommand::PauseRecording,
            phrases: &[
                "一時停止",
                "録音を一時停止",
                "一時停止して",
                "ポーズ",
                "pause recording",
                "pause",
            ],
            keywords: &[],
        },
        CommandPhrases {
            command: VoiceCommand::ResumeRecording,
            phrases: &[
                "録音再開",
                "録音を再開",
                "再開",
                "再開して",
                "続けて",
                "resume recording",
                "continue recording",
                "resume",
            ],
            keywords: &["続き"],
        },
        // =====================================================================
        // Navigation
        // =====================================================================
        CommandPhrases {
            command: VoiceCommand::GoBack,
            phrases: &["戻る", "戻って", "前の画面", "前の画面に戻る", "go back", "back"],
            keywords: &["戻"],
        },
        CommandPhrases {
            command: VoiceCommand::NavigateTo(Destination::Home),
            phrases: &[
                "ホーム",
                "ホーム画面",
                "ホームに戻る",
                "ホームに戻って",
                "ホームへ",
                "go home",
                "home",
            ],
            keywords: &[],
        },
        CommandPhrases {
            command: VoiceCommand::NavigateTo(Destination::DocumentList),
            phrases: &[
                "文書一覧",
                "ドキュメント一覧",
                "文書リスト",
                "一覧",
                "document list",
                "documents",
            ],
            keywords: &[],
        },
        CommandPhrases {
            command: VoiceCommand::NavigateTo(Destination::Settings),
            phrases: &["設定", "設定画面", "設定を開いて", "settings", "open settings"],
            keywords: &[],
        },
        CommandPhrases {
            command: VoiceCommand::NavigateTo(Destination::Recordings),
            phrases: &[
                "録音一覧",
                "録音リスト",
                "recordings",
                "recording list",
                "open recordings",
            ],
            keywords: &[],
        },
        CommandPhrases {
            command: VoiceCommand::NavigateTo(Destination::Help),
            phrases: &["ヘルプ", "ヘルプを開いて", "使い方", "help"],
            keywords: &[],
        },
        // =====================================================================
        // Document
        // =====================================================================
        CommandPhrases {
            command: VoiceCommand::Save,
            phrases: &["保存", "保存して", "セーブ", "save", "save document"],
            keywords: &[],
        },
        CommandPhrases {
            command: VoiceCommand::ReadAloud,
            phrases: &[
                "読み上げ",
                "読み上げて",
                "音読",
                "読んで",
                "read aloud",
                "read it",
            ],
            keywords: &["読"],
        },
    ]
}

/// Regex alternation over `words`; ASCII words only match whole words.
///
/// Longer words come first because the regex engine takes the first
/// alternative that matches at a position.
fn alternation(words: &[&str]) -> String {
    let mut words = words.to_vec();
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    words
        .iter()
        .map(|w| {
            let escaped = regex::escape(w);
            if w.is_ascii() {
                format!(r"\b{}\b", escaped)
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// A single compiled regex pattern linked to a command and tier.
pub struct CommandPattern {
    pub regex: Regex,
    pub command: VoiceCommand,
    pub confidence: CommandConfidence,
}

/// A match result from pattern detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub command: VoiceCommand,
    pub confidence: CommandConfidence,
    /// Byte range of the match within the normalized utterance.
    pub start: usize,
    pub end: usize,
}

impl PatternMatch {
    fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether `self` lies strictly inside `other`'s span.
    pub fn is_covered_by(&self, other: &PatternMatch) -> bool {
        other.start <= self.start && self.end <= other.end && other.len() > self.len()
    }
}

/// Collection of all command patterns, compiled once and reused.
pub struct PatternSet {
    patterns: Vec<CommandPattern>,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternSet {
    /// Compile the full phrase table, in table order.
    pub fn new() -> Self {
        let mut patterns = Vec::new();

        for entry in phrase_table() {
            let phrases = alternation(entry.phrases);
            patterns.push(CommandPattern {
                regex: Regex::new(&format!("(?i)^(?:{})$", phrases))
                    .expect("Invalid exact phrase regex"),
                command: entry.command.clone(),
                confidence: CommandConfidence::High,
            });
            patterns.push(CommandPattern {
                regex: Regex::new(&format!("(?i)(?:{})", phrases))
                    .expect("Invalid embedded phrase regex"),
                command: entry.command.clone(),
                confidence: CommandConfidence::Medium,
            });
            if !entry.keywords.is_empty() {
                patterns.push(CommandPattern {
                    regex: Regex::new(&format!("(?i)(?:{})", alternation(entry.keywords)))
                        .expect("Invalid keyword regex"),
                    command: entry.command,
                    confidence: CommandConfidence::Low,
                });
            }
        }

        Self { patterns }
    }

    /// Every pattern matching `text`, in table order.
    ///
    /// Embedded patterns report the longest phrase found, so a longer synonym
    /// is preferred over a shorter one it contains.
    pub fn detect(&self, text: &str) -> Vec<PatternMatch> {
        self.patterns
            .iter()
            .filter_map(|pattern| {
                let found = pattern
                    .regex
                    .find_iter(text)
                    .max_by_key(|m| m.end() - m.start())?;
                Some(PatternMatch {
                    command: pattern.command.clone(),
                    confidence: pattern.confidence,
                    start: found.start(),
                    end: found.end(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands_at(set: &PatternSet, text: &str, tier: CommandConfidence) -> Vec<VoiceCommand> {
        set.detect(text)
            .into_iter()
            .filter(|m| m.confidence == tier)
            .map(|m| m.command)
            .collect()
    }

    #[test]
    fn test_pattern_set_compiles() {
        let set = PatternSet::new();
        assert!(!set.is_empty());
        // Two tiers per command plus keyword tiers.
        assert!(set.len() >= 24);
    }

    #[test]
    fn test_exact_phrase_is_high() {
        let set = PatternSet::new();
        assert_eq!(
            commands_at(&set, "録音開始", CommandConfidence::High),
            vec![VoiceCommand::StartRecording]
        );
        assert_eq!(
            commands_at(&set, "Stop Recording", CommandConfidence::High),
            vec![VoiceCommand::StopRecording]
        );
    }

    #[test]
    fn test_embedded_phrase_is_medium() {
        let set = PatternSet::new();
        let text = "それでは録音を再開してください";
        assert!(commands_at(&set, text, CommandConfidence::High).is_empty());
        assert_eq!(
            commands_at(&set, text, CommandConfidence::Medium),
            vec![VoiceCommand::ResumeRecording]
        );
    }

    #[test]
    fn test_english_words_need_boundaries() {
        let set = PatternSet::new();
        // "record" must not match inside "recorder" or "recordings".
        assert!(!commands_at(&set, "the recorder broke", CommandConfidence::Medium)
            .contains(&VoiceCommand::StartRecording));
        assert!(!commands_at(&set, "recordings", CommandConfidence::High)
            .contains(&VoiceCommand::StartRecording));
    }

    #[test]
    fn test_keyword_is_low() {
        let set = PatternSet::new();
        assert_eq!(
            commands_at(&set, "もう停止で", CommandConfidence::Low),
            vec![VoiceCommand::StopRecording]
        );
    }

    #[test]
    fn test_longest_embedded_phrase_reported() {
        let set = PatternSet::new();
        let m = set
            .detect("録音を停止してね")
            .into_iter()
            .find(|m| m.confidence == CommandConfidence::Medium)
            .unwrap();
        assert_eq!(m.command, VoiceCommand::StopRecording);
        assert_eq!(&"録音を停止してね"[m.start..m.end], "録音を停止して");
    }

    #[test]
    fn test_covered_by() {
        let outer = PatternMatch {
            command: VoiceCommand::NavigateTo(Destination::Recordings),
            confidence: CommandConfidence::Medium,
            start: 0,
            end: 12,
        };
        let inner = PatternMatch {
            command: VoiceCommand::NavigateTo(Destination::DocumentList),
            confidence: CommandConfidence::Medium,
            start: 6,
            end: 12,
        };
        assert!(inner.is_covered_by(&outer));
        assert!(!outer.is_covered_by(&inner));
        assert!(!outer.is_covered_by(&outer));
    }
}
