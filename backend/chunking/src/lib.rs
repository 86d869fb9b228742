pub mod batcher;
pub mod optimizer;
pub mod pipeline;
pub mod segment;

pub use batcher::{embed_items, plan_batches, EmbedTarget};
pub use optimizer::chunk_sentences;
pub use pipeline::{process_document, process_frames};
pub use segment::{sentences_from_frames, sentences_from_text};
