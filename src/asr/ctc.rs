//! Greedy CTC decoding over streamed logit frames.

use crate::asr::interface::Word;

/// Outcome of decoding one output frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtcStep {
    Blank,
    /// Same symbol as the previous frame, collapsed
    Repeat(usize),
    /// A newly emitted symbol index
    Symbol(usize),
}

/// Greedy decoder whose collapse state carries across chunks
#[derive(Debug, Clone)]
pub struct CtcDecoder {
    vocabulary: Vec<String>,
    previous: Option<usize>,
}

impl CtcDecoder {
    pub fn new(vocabulary: Vec<String>) -> Self {
        Self {
            vocabulary,
            previous: None,
        }
    }

    /// Width of a logit row: every symbol plus the trailing blank
    pub fn num_classes(&self) -> usize {
        self.vocabulary.len() + 1
    }

    pub fn blank(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn symbol(&self, index: usize) -> &str {
        self.vocabulary.get(index).map(String::as_str).unwrap_or("")
    }

    /// True for symbols that separate words rather than spell them
    pub fn is_word_boundary(&self, index: usize) -> bool {
        matches!(self.symbol(index), " " | "\u{2581}")
    }

    pub fn step(&mut self, logits: &[f32]) -> CtcStep {
        let best = argmax(logits).unwrap_or(self.blank());
        let previous = self.previous.replace(best);

        if best == self.blank() {
            CtcStep::Blank
        } else if previous == Some(best) {
            CtcStep::Repeat(best)
        } else {
            CtcStep::Symbol(best)
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

/// A decoded symbol with the span of frames it covered
#[derive(Debug, Clone, PartialEq)]
pub struct TimedToken {
    pub text: String,
    pub start_time: f32,
    pub end_time: f32,
}

/// Join decoded tokens into words and text.
///
/// A `" "` token separates words; a token starting with `"▁"` begins one.
pub fn assemble_words(tokens: &[TimedToken]) -> (String, Vec<Word>) {
    let mut words: Vec<Word> = Vec::new();
    let mut current: Option<Word> = None;

    for token in tokens {
        let (starts_word, piece) = match token.text.strip_prefix('\u{2581}') {
            Some(rest) => (true, rest),
            None if token.text == " " => (true, ""),
            None => (false, token.text.as_str()),
        };

        if starts_word {
            words.extend(current.take());
        }
        if piece.is_empty() {
            continue;
        }

        match current.as_mut() {
            Some(word) => {
                word.text.push_str(piece);
                word.end_time = token.end_time;
            }
            None => {
                current = Some(Word {
                    text: piece.to_string(),
                    start_time: token.start_time,
                    end_time: token.end_time,
                    confidence: None,
                })
            }
        }
    }
    words.extend(current);

    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    (text, words)
}
