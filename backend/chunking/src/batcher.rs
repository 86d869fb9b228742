use std::ops::Range;

use anyhow::{ensure, Result};
use semchunk_core::{Chunk, Embedder, Sentence};

/// Anything the batcher can install an embedding on.
pub trait EmbedTarget {
    fn text(&self) -> &str;
    fn token_count(&self) -> usize;
    fn set_embedding(&mut self, embedding: Vec<f32>);
}

impl EmbedTarget for Sentence {
    fn text(&self) -> &str {
        &self.text
    }

    fn token_count(&self) -> usize {
        self.token_count
    }

    fn set_embedding(&mut self, embedding: Vec<f32>) {
        self.embedding = Some(embedding);
    }
}

impl EmbedTarget for Chunk {
    fn text(&self) -> &str {
        &self.text
    }

    fn token_count(&self) -> usize {
        self.token_count
    }

    fn set_embedding(&mut self, embedding: Vec<f32>) {
        self.embedding = Some(embedding);
    }
}

/// Groups consecutive items into batches whose token totals stay within
/// `max_batch_tokens`. The budget is soft: an item that alone exceeds it
/// becomes a batch of one rather than starving.
pub fn plan_batches(token_counts: &[usize], max_batch_tokens: usize) -> Vec<Range<usize>> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut running = 0usize;

    for (idx, &tokens) in token_counts.iter().enumerate() {
        if running + tokens > max_batch_tokens && idx > start {
            batches.push(start..idx);
            start = idx;
            running = 0;
        }
        running += tokens;
    }
    if start < token_counts.len() {
        batches.push(start..token_counts.len());
    }

    batches
}

/// Embeds every item, one capability call per planned batch, installing the
/// returned vectors in input order. Any capability error aborts the whole
/// document.
pub fn embed_items<E, T>(embedder: &E, items: &mut [T], max_batch_tokens: usize) -> Result<()>
where
    E: Embedder,
    T: EmbedTarget,
{
    let token_counts: Vec<usize> = items.iter().map(|item| item.token_count()).collect();

    for range in plan_batches(&token_counts, max_batch_tokens) {
        let vectors = {
            let texts: Vec<&str> = items[range.clone()].iter().map(|item| item.text()).collect();
            let vectors = embedder.embed(&texts)?;
            ensure!(
                vectors.len() == texts.len(),
                "embedder returned {} vectors for a batch of {}",
                vectors.len(),
                texts.len()
            );
            vectors
        };

        for (item, vector) in items[range].iter_mut().zip(vectors) {
            item.set_embedding(vector);
        }
    }

    Ok(())
}
