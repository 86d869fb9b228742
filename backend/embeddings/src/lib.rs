pub mod model;

pub use model::{EmbeddingModel, DEFAULT_MODEL_ID};
