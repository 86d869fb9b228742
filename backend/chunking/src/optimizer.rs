use anyhow::{bail, Context, Result};
use semchunk_core::{Chunk, ChunkingConfig, Sentence};

/// Groups embedded sentences into contiguous chunks maximizing total
/// in-chunk adjacent similarity, minus a hinge penalty on chunks larger
/// than `optimal_size` and a fixed cost per chunk. Every sentence lands in
/// exactly one chunk, in order, and no chunk exceeds `max_size` tokens.
pub fn chunk_sentences(sentences: &[Sentence], config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let embeddings: Vec<&[f32]> = sentences
        .iter()
        .enumerate()
        .map(|(idx, s)| {
            s.embedding
                .as_deref()
                .with_context(|| format!("sentence {idx} has no embedding"))
        })
        .collect::<Result<_>>()?;

    let sim = normalized_similarities(&embeddings);

    let n = sentences.len();

    // prefix_sim[k] = sum of the first k adjacent similarities
    let mut prefix_sim = vec![0.0f64; n];
    for k in 1..n {
        prefix_sim[k] = prefix_sim[k - 1] + sim[k - 1];
    }

    // prefix_tok[k] = tokens in the first k sentences
    let mut prefix_tok = vec![0usize; n + 1];
    for k in 1..=n {
        prefix_tok[k] = prefix_tok[k - 1] + sentences[k - 1].token_count;
    }

    // dp[j]: best score over the first j sentences; start[j]: the chosen
    // split point, i.e. the last chunk covers [start[j], j).
    let mut dp = vec![0.0f64; n + 1];
    let mut start = vec![0usize; n + 1];

    for j in 1..=n {
        let mut best = f64::NEG_INFINITY;
        let mut best_i = None;

        // Ties keep the smallest i: a longer final chunk, fewer chunks.
        for i in 0..j {
            let tokens = prefix_tok[j] - prefix_tok[i];
            if tokens > config.max_size {
                continue;
            }

            let reward = prefix_sim[j - 1] - prefix_sim[i];
            let score = dp[i] + reward - size_penalty(tokens, config) - config.chunk_penalty;
            if score > best {
                best = score;
                best_i = Some(i);
            }
        }

        match best_i {
            Some(i) => {
                dp[j] = best;
                start[j] = i;
            }
            None => bail!(
                "sentence {} is {} tokens, above max_size {}",
                j - 1,
                sentences[j - 1].token_count,
                config.max_size
            ),
        }
    }

    // Walk the split points back from n, then restore input order.
    let mut bounds = Vec::new();
    let mut j = n;
    while j > 0 {
        let i = start[j];
        bounds.push((i, j));
        j = i;
    }
    bounds.reverse();

    let chunks = bounds
        .into_iter()
        .enumerate()
        .map(|(chunk_index, (i, j))| {
            build_chunk(&sentences[i..j], prefix_tok[j] - prefix_tok[i], chunk_index)
        })
        .collect();

    Ok(chunks)
}

/// Zero at or below `optimal_size`, rising linearly to `lambda_size` at
/// `max_size`. Callers exclude segments above `max_size` outright.
fn size_penalty(tokens: usize, config: &ChunkingConfig) -> f64 {
    if tokens <= config.optimal_size {
        return 0.0;
    }
    let over = (tokens - config.optimal_size) as f64;
    let span = (config.max_size - config.optimal_size) as f64;
    config.lambda_size * over / span
}

/// Adjacent cosine similarities rescaled to [0, 1] by the sequence's own
/// min and max; all zeros when every pair is equally similar. Non-negative
/// rewards keep the optimizer monotone in raw similarity.
fn normalized_similarities(embeddings: &[&[f32]]) -> Vec<f64> {
    let raw: Vec<f64> = embeddings
        .windows(2)
        .map(|pair| cosine_similarity(pair[0], pair[1]))
        .collect();

    let lo = raw.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if hi > lo {
        raw.iter().map(|s| (s - lo) / (hi - lo)).collect()
    } else {
        vec![0.0; raw.len()]
    }
}

/// f64 accumulation, clamped to [-1, 1] to absorb float drift. Zero-norm
/// vectors compare as 0.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

fn build_chunk(sentences: &[Sentence], token_count: usize, chunk_index: usize) -> Chunk {
    let text = sentences
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let sentence_embeddings = sentences
        .iter()
        .map(|s| s.embedding.clone().unwrap_or_default())
        .collect();

    Chunk {
        text,
        start_time: sentences[0].start_time.clone(),
        num_sentences: sentences.len(),
        token_count,
        chunk_index,
        sentence_embeddings,
        embedding: None,
    }
}
