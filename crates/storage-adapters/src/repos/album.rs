use std::sync::Arc;

use async_trait::async_trait;
use domains::{AlbumRepository, DocumentStore, DomainResult, Filter, Photo, Sort};
use tracing::warn;

use crate::codec::{from_document, to_document};
use crate::collections::ALBUM;

pub struct DocumentAlbum {
    store: Arc<dyn DocumentStore>,
}

impl DocumentAlbum {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AlbumRepository for DocumentAlbum {
    async fn list_photos(&self) -> DomainResult<Vec<Photo>> {
        let docs = self.store.find(ALBUM, &Filter::all(), &Sort::none()).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                from_document(doc)
                    .map_err(|err| warn!(error = %err, "skipping undecodable photo"))
                    .ok()
            })
            .collect())
    }

    async fn insert_photo(&self, photo: Photo) -> DomainResult<()> {
        self.store.insert_one(ALBUM, to_document(&photo)?).await?;
        Ok(())
    }
}
