//! Persistence boundary for Minuta drafts: the store trait, an in-memory
//! store, the REST client, and the editor session that drives a draft
//! against a store.

mod error;
pub mod memory;
pub mod session;
pub mod store;

#[cfg(feature = "http")]
pub mod http;

pub use error::SyncError;
pub use memory::MemoryStore;
pub use session::{Catalog, EditorSession};
pub use store::DraftStore;

#[cfg(feature = "http")]
pub use http::HttpDraftStore;
