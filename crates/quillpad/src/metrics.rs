//! Word, character and reading-time statistics for the document text.

use serde::Serialize;

const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub words: usize,
    pub chars: usize,
    pub reading_time_minutes: usize,
    pub paragraphs: usize,
    pub sentences: usize,
    pub avg_word_length: f64,
    pub avg_sentence_length: f64,
}

impl StatsSnapshot {
    /// Recompute in place. Without `detailed` the paragraph and sentence
    /// figures keep whatever the last detailed pass produced.
    pub fn refresh(&mut self, text: &str, detailed: bool) {
        let fresh = compute_stats(text, detailed);
        if detailed {
            *self = fresh;
        } else {
            self.words = fresh.words;
            self.chars = fresh.chars;
            self.reading_time_minutes = fresh.reading_time_minutes;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionStats {
    pub words: usize,
    pub chars: usize,
}

pub fn compute_stats(text: &str, detailed: bool) -> StatsSnapshot {
    let words = count_words(text);
    let chars = text.chars().count();
    let mut stats = StatsSnapshot {
        words,
        chars,
        reading_time_minutes: words.div_ceil(WORDS_PER_MINUTE).max(1),
        ..StatsSnapshot::default()
    };

    if detailed {
        let paragraphs = text.lines().filter(|line| !line.trim().is_empty()).count();
        let sentences = text
            .split(|c| matches!(c, '.' | '!' | '?'))
            .filter(|sentence| !sentence.trim().is_empty())
            .count();
        stats.paragraphs = paragraphs.max(1);
        stats.sentences = sentences.max(1);
        stats.avg_word_length = if words > 0 {
            round10((chars + 1).saturating_sub(words) as f64 / words as f64)
        } else {
            0.0
        };
        stats.avg_sentence_length = round10(words as f64 / stats.sentences as f64);
    }

    stats
}

pub fn selection_stats(selected: &str) -> Option<SelectionStats> {
    if selected.is_empty() {
        return None;
    }
    Some(SelectionStats {
        words: count_words(selected),
        chars: selected.chars().count(),
    })
}

fn count_words(text: &str) -> usize {
    if text.trim().is_empty() {
        0
    } else {
        text.split_whitespace().count()
    }
}

fn round10(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let stats = compute_stats("", true);
        assert_eq!(stats.words, 0);
        assert_eq!(stats.chars, 0);
        assert_eq!(stats.reading_time_minutes, 1);
        assert_eq!(stats.paragraphs, 1);
        assert_eq!(stats.sentences, 1);
        assert_eq!(stats.avg_word_length, 0.0);
        assert_eq!(stats.avg_sentence_length, 0.0);
    }

    #[test]
    fn test_chars_count_raw_text() {
        for text in ["  padded  ", "こんにちは 世界", "a\nb\n", "\t"] {
            let stats = compute_stats(text, false);
            assert_eq!(stats.chars, text.chars().count());
            assert_eq!(stats.words == 0, text.trim().is_empty());
        }
    }

    #[test]
    fn test_reading_time() {
        let text = "word ".repeat(200);
        assert_eq!(compute_stats(&text, false).reading_time_minutes, 1);

        let text = "word ".repeat(201);
        assert_eq!(compute_stats(&text, false).reading_time_minutes, 2);

        let text = "word ".repeat(650);
        assert_eq!(compute_stats(&text, false).reading_time_minutes, 4);
        assert_eq!(compute_stats("one", false).reading_time_minutes, 1);
    }

    #[test]
    fn test_detailed_stats() {
        let text = "Hello there. How are you?!\n\nFine";
        let stats = compute_stats(text, true);

        assert_eq!(stats.words, 6);
        assert_eq!(stats.paragraphs, 2);
        assert_eq!(stats.sentences, 3);
        assert_eq!(stats.avg_sentence_length, 2.0);
        // (32 - 6 + 1) / 6 = 4.5
        assert_eq!(stats.avg_word_length, 4.5);
    }

    #[test]
    fn test_non_detailed_leaves_detail_zeroed() {
        let stats = compute_stats("One. Two.", false);
        assert_eq!(stats.words, 2);
        assert_eq!(stats.paragraphs, 0);
        assert_eq!(stats.sentences, 0);
    }

    #[test]
    fn test_refresh_keeps_previous_detail() {
        let mut stats = compute_stats("One. Two. Three.", true);
        assert_eq!(stats.sentences, 3);

        stats.refresh("Just one sentence here", false);
        assert_eq!(stats.words, 4);
        assert_eq!(stats.sentences, 3);

        stats.refresh("Just one sentence here", true);
        assert_eq!(stats.sentences, 1);
    }

    #[test]
    fn test_selection_stats() {
        assert_eq!(selection_stats(""), None);
        assert_eq!(
            selection_stats("two words"),
            Some(SelectionStats { words: 2, chars: 9 })
        );
        assert_eq!(
            selection_stats("   "),
            Some(SelectionStats { words: 0, chars: 3 })
        );
    }
}
