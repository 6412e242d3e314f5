//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod import;
mod init;
mod list;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use import::run_import;
pub use init::run_init;
pub use list::run_list;
pub use search::run_search;

use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::retrieval::{Retriever, VectorRetriever};
use crate::vector_store::{SqliteVectorStore, VectorStore};
use std::sync::Arc;

/// Open the configured vector store.
fn open_store(settings: &Settings) -> Result<Arc<SqliteVectorStore>> {
    Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?))
}

/// Build the query-side retriever over the configured store and embedder.
fn build_retriever(settings: &Settings) -> Result<Arc<dyn Retriever>> {
    let store = open_store(settings)? as Arc<dyn VectorStore>;
    let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    ));
    Ok(Arc::new(VectorRetriever::new(store, embedder)))
}
