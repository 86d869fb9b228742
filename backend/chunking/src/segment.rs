use anyhow::Result;
use semchunk_core::{Frame, Sentence, TokenCounter};

const TERMINALS: [char; 3] = ['.', '!', '?'];

/// Splits plain text into sentences bounded by `.`, `!` or `?`, enforcing
/// the per-sentence token ceiling. Untimed: every sentence carries an empty
/// `start_time`.
pub fn sentences_from_text<C: TokenCounter>(
    counter: &C,
    text: &str,
    max_size: usize,
) -> Result<Vec<Sentence>> {
    sentences_from_frames(counter, &text_frames(text), max_size)
}

/// Merges transcript frames into sentences. Frame texts accumulate into a
/// buffer joined by single spaces; a frame whose trimmed text ends in a
/// terminal punctuation mark closes the current sentence, which carries the
/// `start_time` of its first contributing frame. Any trailing buffer is
/// emitted as a final sentence.
pub fn sentences_from_frames<C: TokenCounter>(
    counter: &C,
    frames: &[Frame],
    max_size: usize,
) -> Result<Vec<Sentence>> {
    let mut provisional: Vec<Sentence> = Vec::new();
    let mut buffer = String::new();
    let mut start_time = String::new();

    for frame in frames {
        let trimmed = frame.text.trim();
        if trimmed.is_empty() {
            continue;
        }

        if buffer.is_empty() {
            start_time = frame.start_time.clone();
        } else {
            buffer.push(' ');
        }
        buffer.push_str(trimmed);

        if trimmed.ends_with(&TERMINALS[..]) {
            let text = std::mem::take(&mut buffer);
            let token_count = counter.count_tokens(&text)?;
            provisional.push(Sentence::new(text, std::mem::take(&mut start_time), token_count));
        }
    }

    if !buffer.is_empty() {
        let token_count = counter.count_tokens(&buffer)?;
        provisional.push(Sentence::new(buffer, start_time, token_count));
    }

    let mut sentences = Vec::with_capacity(provisional.len());
    for sentence in provisional {
        if sentence.token_count <= max_size {
            sentences.push(sentence);
        } else {
            split_oversize(counter, sentence, max_size, &mut sentences)?;
        }
    }

    Ok(sentences)
}

/// Converts plain text into untimed frames, one per terminal-punctuation
/// boundary, so text and transcript input share the same merging core.
fn text_frames(text: &str) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        if TERMINALS.contains(&ch) {
            let end = idx + ch.len_utf8();
            push_text_frame(&mut frames, &text[start..end]);
            start = end;
        }
    }
    push_text_frame(&mut frames, &text[start..]);

    frames
}

fn push_text_frame(frames: &mut Vec<Frame>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        frames.push(Frame {
            text: trimmed.to_string(),
            ..Default::default()
        });
    }
}

/// Word-greedy split of a sentence whose token count exceeds `max_size`.
/// Each sub-sentence takes as many words as fit and inherits the parent's
/// `start_time`. Counts are re-tokenized on the exact candidate text since
/// the tokenizer is not additive.
fn split_oversize<C: TokenCounter>(
    counter: &C,
    sentence: Sentence,
    max_size: usize,
    out: &mut Vec<Sentence>,
) -> Result<()> {
    let words: Vec<&str> = sentence.text.split_whitespace().collect();
    if words.is_empty() {
        out.push(sentence);
        return Ok(());
    }

    let mut idx = 0;
    while idx < words.len() {
        // A lone word over the budget still advances, so this terminates.
        let mut piece = words[idx].to_string();
        idx += 1;

        while idx < words.len() {
            let candidate = format!("{} {}", piece, words[idx]);
            if counter.count_tokens(&candidate)? > max_size {
                break;
            }
            piece = candidate;
            idx += 1;
        }

        let token_count = counter.count_tokens(&piece)?;
        out.push(Sentence::new(
            piece,
            sentence.start_time.clone(),
            token_count,
        ));
    }

    Ok(())
}
