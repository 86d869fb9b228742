use anyhow::{anyhow, Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use semchunk_core::{Embedder, TokenCounter};
use tokenizers::{PaddingParams, Tokenizer};
use tracing::info;

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Sentence-embedding model wrapper using Candle. Also the tokenizer
/// capability: token counts come from the same vocabulary the model embeds
/// with, so chunk budgets line up with what the model actually sees.
pub struct EmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl EmbeddingModel {
    /// Download and load a BERT-family sentence transformer from the
    /// HuggingFace Hub.
    pub fn load(model_id: &str) -> Result<Self> {
        info!("Loading embedding model: {}", model_id);

        let device = Device::Cpu;

        let api = Api::new()?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo.get("config.json").context("fetch config.json")?;
        let tokenizer_path = repo.get("tokenizer.json").context("fetch tokenizer.json")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("fetch model.safetensors")?;

        let config = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config)?;
        let hidden_size = config.hidden_size;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        // pad each batch to its longest member so one forward pass covers it
        tokenizer.with_padding(Some(PaddingParams::default()));

        info!("Embedding model ready ({} dimensions)", hidden_size);

        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size,
        })
    }

    /// Output dimensionality of the model.
    pub fn dimension(&self) -> usize {
        self.hidden_size
    }

    /// Embed a batch of texts in one padded forward pass: masked mean
    /// pooling over token embeddings, then L2 normalization. Output order
    /// matches input order.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let mut id_rows = Vec::with_capacity(encodings.len());
        let mut mask_rows = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            id_rows.push(Tensor::new(encoding.get_ids(), &self.device)?);
            mask_rows.push(Tensor::new(encoding.get_attention_mask(), &self.device)?);
        }
        let token_ids = Tensor::stack(&id_rows, 0)?;
        let attention_mask = Tensor::stack(&mask_rows, 0)?;
        let token_type_ids = token_ids.zeros_like()?;

        let outputs = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        // [batch, seq, hidden] -> [batch, hidden], ignoring padding positions
        let mask = attention_mask.unsqueeze(2)?.to_dtype(DTYPE)?;
        let summed = outputs.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;

        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norm)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}

impl TokenCounter for EmbeddingModel {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        Ok(encoding.get_ids().len())
    }
}

impl Embedder for EmbeddingModel {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires model download
    fn test_embed_single() -> Result<()> {
        let model = EmbeddingModel::load(DEFAULT_MODEL_ID)?;
        let embeddings = model.embed_batch(&["Hello world"])?;

        // all-MiniLM-L6-v2 produces 384-dimensional embeddings
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].len(), 384);
        assert_eq!(model.dimension(), 384);

        // L2 norm of a normalized embedding is ~1
        let norm: f32 = embeddings[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);

        Ok(())
    }

    #[test]
    #[ignore] // Requires model download
    fn test_embed_batch_order() -> Result<()> {
        let model = EmbeddingModel::load(DEFAULT_MODEL_ID)?;
        let batch = model.embed_batch(&["first text", "second text", "third text"])?;
        assert_eq!(batch.len(), 3);

        // each vector matches a solo embedding of the same text
        for (text, vector) in ["first text", "second text", "third text"]
            .iter()
            .zip(&batch)
        {
            let solo = model.embed_batch(&[text])?;
            for (a, b) in solo[0].iter().zip(vector.iter()) {
                assert!((a - b).abs() < 1e-3);
            }
        }

        Ok(())
    }

    #[test]
    #[ignore] // Requires model download
    fn test_count_tokens_includes_special_tokens() -> Result<()> {
        let model = EmbeddingModel::load(DEFAULT_MODEL_ID)?;
        // [CLS] hello world [SEP]
        let count = model.count_tokens("hello world")?;
        assert!(count >= 4);
        Ok(())
    }
}
