use std::sync::Arc;

use domains::{AlbumRepository, DomainError, DomainResult, NewPhoto, Photo};
use uuid::Uuid;

pub struct AlbumService {
    album: Arc<dyn AlbumRepository>,
}

impl AlbumService {
    pub fn new(album: Arc<dyn AlbumRepository>) -> Self {
        Self { album }
    }

    pub async fn list_photos(&self) -> DomainResult<Vec<Photo>> {
        self.album.list_photos().await
    }

    pub async fn add_photo(&self, photo: NewPhoto) -> DomainResult<Uuid> {
        let url = photo.url.trim();
        if url.is_empty() {
            return Err(DomainError::BadRequest("photo url must not be empty".into()));
        }
        let id = Uuid::now_v7();
        self.album
            .insert_photo(Photo {
                id,
                url: url.to_string(),
            })
            .await?;
        Ok(id)
    }
}
