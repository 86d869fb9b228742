pub mod embed;
pub mod status;

pub use embed::{embed_documents, AppState};
pub use status::get_status;
