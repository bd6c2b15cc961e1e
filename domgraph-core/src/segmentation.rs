//! Sentence boundary detection for text decomposition

use crate::config::SegmentationConfig;
use std::collections::HashSet;

/// Splits normalized text into sentences, in order. Implementations must not
/// return empty strings.
pub trait SentenceSegmenter {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Punctuation-driven segmenter.
///
/// A `.`, `!` or `?` (plus any trailing closers such as quotes) ends a
/// sentence when it is followed by whitespace and then an uppercase letter,
/// digit or opening quote, or by the end of the text. A period after a known
/// abbreviation or a single-letter initial never ends a sentence.
#[derive(Debug, Clone)]
pub struct RuleBasedSegmenter {
    abbreviations: HashSet<String>,
}

const TERMINATORS: &[char] = &['.', '!', '?'];
const CLOSERS: &[char] = &['"', '\'', ')', ']', '”', '’', '»'];
const OPENERS: &[char] = &['"', '\'', '(', '[', '“', '‘', '«'];

impl RuleBasedSegmenter {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            abbreviations: config
                .abbreviations
                .iter()
                .map(|a| a.trim_end_matches('.').to_lowercase())
                .collect(),
        }
    }

    fn is_abbreviation(&self, token: &str) -> bool {
        let token = token.trim_start_matches(|c: char| OPENERS.contains(&c));
        let mut chars = token.chars();
        let single_initial = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic());
        single_initial || self.abbreviations.contains(&token.to_lowercase())
    }

    fn starts_sentence(chars: &[(usize, char)], from: usize) -> bool {
        chars[from..]
            .iter()
            .map(|(_, c)| *c)
            .find(|c| !c.is_whitespace())
            .map_or(true, |c| c.is_uppercase() || c.is_ascii_digit() || OPENERS.contains(&c))
    }
}

impl Default for RuleBasedSegmenter {
    fn default() -> Self {
        Self::new(&SegmentationConfig::default())
    }
}

impl SentenceSegmenter for RuleBasedSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let byte_at = |k: usize| chars.get(k).map_or(text.len(), |(b, _)| *b);

        let mut sentences = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i].1;
            if !TERMINATORS.contains(&c) {
                i += 1;
                continue;
            }

            let mut end = i + 1;
            while end < chars.len()
                && (TERMINATORS.contains(&chars[end].1) || CLOSERS.contains(&chars[end].1))
            {
                end += 1;
            }

            let at_end = end >= chars.len();
            let spaced = !at_end && chars[end].1.is_whitespace();
            let mut boundary = at_end || (spaced && Self::starts_sentence(&chars, end));

            if boundary && c == '.' && end == i + 1 {
                let token_start = text[..byte_at(i)]
                    .char_indices()
                    .rev()
                    .find(|(_, c)| c.is_whitespace())
                    .map_or(0, |(p, c)| p + c.len_utf8());
                let token = &text[token_start.max(start)..byte_at(i)];
                if self.is_abbreviation(token) {
                    boundary = false;
                }
            }

            if boundary {
                let sentence = text[start..byte_at(end)].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = byte_at(end);
            }
            i = end;
        }

        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }
}
