use std::sync::Arc;

use async_trait::async_trait;
use domains::{DocumentStore, DomainError, DomainResult, Filter, Profile, ProfileRepository, Sort};
use tracing::warn;
use uuid::Uuid;

use crate::codec::{from_document, to_document};
use crate::collections::PROFILES;

pub struct DocumentProfiles {
    store: Arc<dyn DocumentStore>,
}

impl DocumentProfiles {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProfileRepository for DocumentProfiles {
    async fn get_profile(&self, user_id: Uuid) -> DomainResult<Profile> {
        match self.store.find_one(PROFILES, &Filter::by_id(user_id)).await? {
            Some(doc) => from_document(doc),
            None => Err(DomainError::not_found("profile", user_id)),
        }
    }

    async fn list_profiles(&self) -> DomainResult<Vec<Profile>> {
        let docs = self.store.find(PROFILES, &Filter::all(), &Sort::none()).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                from_document(doc)
                    .map_err(|err| warn!(error = %err, "skipping undecodable profile"))
                    .ok()
            })
            .collect())
    }

    async fn insert_profile(&self, profile: Profile) -> DomainResult<()> {
        self.store.insert_one(PROFILES, to_document(&profile)?).await?;
        Ok(())
    }
}
