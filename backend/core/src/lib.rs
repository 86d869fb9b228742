use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One unit of raw input. Transcript input arrives as many short timed
/// frames; plain text is converted into untimed frames by the segmenter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    pub text: String,
    #[serde(default)]
    pub start_time: String,
    /// Accepted on the wire for transcript input; not used by the pipeline.
    #[serde(default)]
    pub end_time: String,
}

/// A single sentence, ready for embedding.
#[derive(Debug, Clone)]
pub struct Sentence {
    pub text: String,
    /// Empty for untimed input.
    pub start_time: String,
    pub token_count: usize,
    /// Filled exactly once by the embedding batcher.
    pub embedding: Option<Vec<f32>>,
}

impl Sentence {
    pub fn new(text: String, start_time: String, token_count: usize) -> Self {
        Self {
            text,
            start_time,
            token_count,
            embedding: None,
        }
    }
}

/// A contiguous run of sentences grouped by the optimizer, plus one
/// embedding over the concatenated text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub start_time: String,
    pub num_sentences: usize,
    pub token_count: usize,
    pub chunk_index: usize,
    /// Per-sentence embeddings, kept for downstream consumers.
    pub sentence_embeddings: Vec<Vec<f32>>,
    pub embedding: Option<Vec<f32>>,
}

/// Tunable parameters for the chunking optimizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// No size penalty at or below this many tokens.
    #[serde(default = "default_optimal_size")]
    pub optimal_size: usize,
    /// Hard per-chunk token limit.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Size penalty reached exactly at `max_size`.
    #[serde(default = "default_lambda_size")]
    pub lambda_size: f64,
    /// Fixed cost per emitted chunk, discourages fragmentation.
    #[serde(default = "default_chunk_penalty")]
    pub chunk_penalty: f64,
}

fn default_optimal_size() -> usize {
    470
}

fn default_max_size() -> usize {
    512
}

fn default_lambda_size() -> f64 {
    2.0
}

fn default_chunk_penalty() -> f64 {
    1.0
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            optimal_size: default_optimal_size(),
            max_size: default_max_size(),
            lambda_size: default_lambda_size(),
            chunk_penalty: default_chunk_penalty(),
        }
    }
}

impl ChunkingConfig {
    /// Rejects configs the optimizer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.optimal_size == 0 || self.max_size == 0 {
            anyhow::bail!("optimal_size and max_size must be positive");
        }
        if self.optimal_size > self.max_size {
            anyhow::bail!(
                "optimal_size ({}) must not exceed max_size ({})",
                self.optimal_size,
                self.max_size
            );
        }
        if self.lambda_size < 0.0 {
            anyhow::bail!("lambda_size must be non-negative");
        }
        if self.chunk_penalty < 0.0 {
            anyhow::bail!("chunk_penalty must be non-negative");
        }
        Ok(())
    }
}

/// Embedding dispatch configuration.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingConfig {
    /// Soft cap on total tokens per embedding call; bounds device memory.
    pub max_batch_tokens: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            max_batch_tokens: 6000,
        }
    }
}

/// Token counting capability. Counts come from the real tokenizer on the
/// exact text in question; the tokenizer is not assumed additive.
pub trait TokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

/// Embedding capability. Returns one vector per input text, in order, all
/// with the model's output dimension.
pub trait Embedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunking_config() {
        let config = ChunkingConfig::default();
        assert_eq!(config.optimal_size, 470);
        assert_eq!(config.max_size, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_optimal_above_max_rejected() {
        let config = ChunkingConfig {
            optimal_size: 600,
            max_size: 512,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_penalties_rejected() {
        let config = ChunkingConfig {
            lambda_size: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ChunkingConfig {
            chunk_penalty: -0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserializes_with_partial_fields() {
        let config: ChunkingConfig = serde_json::from_str(r#"{"max_size": 256}"#).unwrap();
        assert_eq!(config.max_size, 256);
        assert_eq!(config.optimal_size, 470);
        assert_eq!(config.chunk_penalty, 1.0);
    }
}
