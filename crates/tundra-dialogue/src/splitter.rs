//! Splits generated text into chat-sized chunks.
//!
//! Text is first cut into sentences: after `.`, `!`, or `?` followed by
//! whitespace and a capital letter (but not after a single-letter
//! abbreviation such as `J.`), and at blank lines. Sentences shorter than
//! the minimum are carried forward and merged with the next one; sentences
//! longer than the maximum are wrapped on word boundaries. Lengths count
//! characters, not bytes.

/// Cut `text` into chunks of `min..=max` characters where possible.
///
/// Whitespace inside a chunk is normalized to single spaces. No chunk is
/// empty, and no chunk exceeds `max` unless a single word does.
pub fn split_sentences(text: &str, min: usize, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for sentence in sentences(text) {
        let candidate = join(&std::mem::take(&mut buffer), sentence);
        if char_len(&candidate) < min {
            buffer = candidate;
            continue;
        }
        for piece in wrap_words(&candidate, max) {
            if char_len(&piece) >= min {
                chunks.push(piece);
            } else {
                buffer = join(&buffer, &piece);
            }
        }
    }

    if !buffer.is_empty() {
        chunks.extend(wrap_words(&buffer, max));
    }
    chunks
}

/// Greedily pack the words of `text` into lines of at most `max` characters.
pub fn wrap_words(text: &str, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0_usize;

    for word in text.split_whitespace() {
        let word_len = char_len(word);
        if line.is_empty() {
            line.push_str(word);
            line_len = word_len;
        } else if line_len.saturating_add(1).saturating_add(word_len) <= max {
            line.push(' ');
            line.push_str(word);
            line_len = line_len.saturating_add(1).saturating_add(word_len);
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
            line_len = word_len;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Sentence pieces of `text`, in order.
fn sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while let Some(&(offset, c)) = chars.get(i) {
        if c.is_whitespace() && ends_sentence(&chars, i) {
            let mut next = i;
            while chars.get(next).is_some_and(|(_, c)| c.is_whitespace()) {
                next = next.saturating_add(1);
            }
            if let Some(&(resume, upper)) = chars.get(next)
                && upper.is_ascii_uppercase()
            {
                pieces.push(text.get(start..offset).unwrap_or_default());
                start = resume;
                i = next;
                continue;
            }
        }
        if c == '\n' && chars.get(i.saturating_add(1)).is_some_and(|&(_, n)| n == '\n') {
            pieces.push(text.get(start..offset).unwrap_or_default());
            start = offset.saturating_add(2);
            i = i.saturating_add(2);
            continue;
        }
        i = i.saturating_add(1);
    }
    pieces.push(text.get(start..).unwrap_or_default());
    pieces
}

/// Whether the character before index `i` closes a sentence.
fn ends_sentence(chars: &[(usize, char)], i: usize) -> bool {
    let at = |back: usize| {
        i.checked_sub(back)
            .and_then(|index| chars.get(index))
            .map(|&(_, c)| c)
    };
    match at(1) {
        Some('!' | '?') => true,
        Some('.') => {
            let initial = at(2).is_some_and(|c| c.is_ascii_uppercase())
                && !at(3).is_some_and(|c| c.is_alphanumeric() || c == '_');
            !initial
        }
        _ => false,
    }
}

fn join(head: &str, tail: &str) -> String {
    let words: Vec<&str> = head.split_whitespace().chain(tail.split_whitespace()).collect();
    words.join(" ")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
