use std::sync::Arc;

use domains::{DomainError, DomainResult, NewProfile, Profile, ProfileRepository};
use tracing::info;
use uuid::Uuid;

pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }

    pub async fn list_profiles(&self) -> DomainResult<Vec<Profile>> {
        self.profiles.list_profiles().await
    }

    pub async fn get_profile(&self, user_id: Uuid) -> DomainResult<Profile> {
        self.profiles.get_profile(user_id).await
    }

    pub async fn create_profile(&self, profile: NewProfile) -> DomainResult<Uuid> {
        if profile.name.trim().is_empty() {
            return Err(DomainError::BadRequest("profile name must not be empty".into()));
        }
        let id = Uuid::now_v7();
        self.profiles
            .insert_profile(Profile {
                id,
                name: profile.name,
                title: profile.title,
                description: profile.description,
                avatar_url: profile.avatar_url,
            })
            .await?;
        info!(user_id = %id, "profile created");
        Ok(id)
    }
}
