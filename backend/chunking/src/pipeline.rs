use anyhow::Result;
use semchunk_core::{Chunk, ChunkingConfig, Embedder, EmbeddingConfig, Frame, Sentence, TokenCounter};
use tracing::info;

/// Runs the full pipeline over plain text: segment, embed sentences, chunk,
/// embed chunks. Returns chunks in document order.
pub fn process_document<M>(
    model: &M,
    text: &str,
    chunking: &ChunkingConfig,
    embedding: &EmbeddingConfig,
) -> Result<Vec<Chunk>>
where
    M: TokenCounter + Embedder,
{
    chunking.validate()?;
    let sentences = crate::segment::sentences_from_text(model, text, chunking.max_size)?;
    embed_and_chunk(model, sentences, chunking, embedding)
}

/// Same pipeline over transcript frames; chunks keep the frames' timing.
pub fn process_frames<M>(
    model: &M,
    frames: &[Frame],
    chunking: &ChunkingConfig,
    embedding: &EmbeddingConfig,
) -> Result<Vec<Chunk>>
where
    M: TokenCounter + Embedder,
{
    chunking.validate()?;
    let sentences = crate::segment::sentences_from_frames(model, frames, chunking.max_size)?;
    embed_and_chunk(model, sentences, chunking, embedding)
}

fn embed_and_chunk<M>(
    model: &M,
    mut sentences: Vec<Sentence>,
    chunking: &ChunkingConfig,
    embedding: &EmbeddingConfig,
) -> Result<Vec<Chunk>>
where
    M: TokenCounter + Embedder,
{
    info!("segmented {} sentences", sentences.len());
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    crate::batcher::embed_items(model, &mut sentences, embedding.max_batch_tokens)?;

    let mut chunks = crate::optimizer::chunk_sentences(&sentences, chunking)?;
    info!("grouped into {} chunks", chunks.len());

    crate::batcher::embed_items(model, &mut chunks, embedding.max_batch_tokens)?;

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FailingCounter, FakeModel, HashEmbedder};

    struct FailingModel;

    impl TokenCounter for FailingModel {
        fn count_tokens(&self, text: &str) -> Result<usize> {
            FailingCounter.count_tokens(text)
        }
    }

    impl Embedder for FailingModel {
        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            HashEmbedder.embed(texts)
        }
    }

    #[test]
    fn test_empty_text_produces_no_chunks() {
        let chunks = process_document(
            &FakeModel,
            "",
            &ChunkingConfig::default(),
            &EmbeddingConfig::default(),
        )
        .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_single_sentence_document() {
        let chunks = process_document(
            &FakeModel,
            "Hello world.",
            &ChunkingConfig::default(),
            &EmbeddingConfig::default(),
        )
        .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world.");
        assert_eq!(chunks[0].num_sentences, 1);
        assert_eq!(chunks[0].token_count, 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert!(chunks[0].embedding.is_some());
        assert!(!chunks[0].embedding.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_every_chunk_respects_invariants() {
        let text = "One sentence here. Two sentences now. A third about weather. \
                    Fourth discusses cooking. Fifth returns to weather. Sixth is new.";
        let config = ChunkingConfig {
            optimal_size: 8,
            max_size: 10,
            ..Default::default()
        };
        let chunks = process_document(&FakeModel, text, &config, &EmbeddingConfig::default())
            .unwrap();

        assert!(!chunks.is_empty());
        let mut total_sentences = 0;
        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, idx);
            assert!(chunk.token_count <= config.max_size);
            assert!(chunk.num_sentences >= 1);
            assert_eq!(chunk.num_sentences, chunk.sentence_embeddings.len());
            assert!(chunk.embedding.is_some());
            total_sentences += chunk.num_sentences;
        }
        assert_eq!(total_sentences, 6);
    }

    #[test]
    fn test_frames_carry_start_times_through() {
        let frames = vec![
            Frame {
                text: "the meeting began".into(),
                start_time: "0.0".into(),
                end_time: "2.0".into(),
            },
            Frame {
                text: "at nine sharp.".into(),
                start_time: "2.0".into(),
                end_time: "4.0".into(),
            },
        ];
        let chunks = process_frames(
            &FakeModel,
            &frames,
            &ChunkingConfig::default(),
            &EmbeddingConfig::default(),
        )
        .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_time, "0.0");
        assert_eq!(chunks[0].text, "the meeting began at nine sharp.");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ChunkingConfig {
            optimal_size: 512,
            max_size: 128,
            ..Default::default()
        };
        let result =
            process_document(&FakeModel, "Hi there.", &config, &EmbeddingConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_tokenizer_failure_fails_the_document() {
        let result = process_document(
            &FailingModel,
            "Hello world.",
            &ChunkingConfig::default(),
            &EmbeddingConfig::default(),
        );
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("tokenizer"));
    }

    #[test]
    fn test_determinism() {
        let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota.";
        let run = || {
            process_document(
                &FakeModel,
                text,
                &ChunkingConfig::default(),
                &EmbeddingConfig::default(),
            )
            .unwrap()
        };
        let a = run();
        let b = run();

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.text, y.text);
            assert_eq!(x.embedding, y.embedding);
        }
    }
}
