use std::sync::Arc;

use async_trait::async_trait;
use domains::{
    DocumentStore, DomainResult, Filter, TallyChange, TargetKind, Update, UserVoteRecord,
    VoteRepository, VoteState, VoteTally,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::codec::from_document;
use crate::collections::{COMMENTS, POSTS, USER_VOTES};

/// The slice of a post or comment document the ledger cares about.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tallied {
    #[serde(default)]
    vote_tally: VoteTally,
}

pub struct DocumentVotes {
    store: Arc<dyn DocumentStore>,
}

impl DocumentVotes {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

fn collection_for(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Post => POSTS,
        TargetKind::Comment => COMMENTS,
    }
}

#[async_trait]
impl VoteRepository for DocumentVotes {
    async fn apply_tally(
        &self,
        kind: TargetKind,
        target_id: Uuid,
        change: TallyChange,
    ) -> DomainResult<Option<VoteTally>> {
        let update = Update::new()
            .inc("voteTally.upvotes", change.upvotes)
            .inc("voteTally.downvotes", change.downvotes)
            .inc("voteTally.netScore", change.net_score);

        let updated = self
            .store
            .update_one(collection_for(kind), &Filter::by_id(target_id), &update, false)
            .await?;
        Ok(match updated {
            Some(doc) => Some(from_document::<Tallied>(doc)?.vote_tally),
            None => None,
        })
    }

    async fn record_vote(&self, user_id: Uuid, target_id: Uuid, state: VoteState) -> DomainResult<()> {
        let update = Update::new().set(format!("voteMap.{target_id}"), i8::from(state));
        self.store
            .update_one(USER_VOTES, &Filter::by_id(user_id), &update, true)
            .await?;
        Ok(())
    }

    async fn vote_record(&self, user_id: Uuid) -> DomainResult<Option<UserVoteRecord>> {
        self.store
            .find_one(USER_VOTES, &Filter::by_id(user_id))
            .await?
            .map(from_document)
            .transpose()
    }
}
