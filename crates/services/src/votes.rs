//! # Vote Ledger
//!
//! Two entry points onto the same write path:
//!
//! - [`VoteLedger::apply_vote`] trusts the caller's delta (after clamping)
//!   and performs no read-modify-decide. Repeating a call repeats its
//!   effect.
//! - [`VoteLedger::cast_vote`] takes the state the user wants to end up
//!   in, derives the delta from the recorded state, and then applies it.
//!
//! The tally moves in one document update; the user's vote map is a
//! second, independent write.

use std::collections::BTreeMap;
use std::sync::Arc;

use domains::{
    CastVoteRequest, DomainError, DomainResult, TallyChange, TargetKind, VoteDelta, VoteRepository,
    VoteRequest, VoteState, VoteTally,
};
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct VoteLedger {
    votes: Arc<dyn VoteRepository>,
}

impl VoteLedger {
    pub fn new(votes: Arc<dyn VoteRepository>) -> Self {
        Self { votes }
    }

    #[instrument(skip(self, request), fields(target_id = %request.target_id, user_id = %request.user_id))]
    pub async fn apply_vote(&self, request: VoteRequest) -> DomainResult<VoteTally> {
        let kind = TargetKind::from_is_post(request.is_post);
        let delta = VoteDelta::clamped(request.delta);
        if i64::from(delta.value()) != request.delta {
            debug!(requested = request.delta, "vote delta out of range, applying zero");
        }

        let resulting = request.vote_status.or_else(|| VoteState::implied_by(delta));
        let change = TallyChange::for_transition(delta, resulting);

        let tally = self
            .votes
            .apply_tally(kind, request.target_id, change)
            .await?
            .ok_or_else(|| DomainError::not_found(kind.as_str(), request.target_id))?;

        if let Some(state) = resulting {
            self.votes
                .record_vote(request.user_id, request.target_id, state)
                .await?;
        }
        Ok(tally)
    }

    #[instrument(skip(self, request), fields(target_id = %request.target_id, user_id = %request.user_id))]
    pub async fn cast_vote(&self, request: CastVoteRequest) -> DomainResult<VoteTally> {
        let current = self
            .votes
            .vote_record(request.user_id)
            .await?
            .map(|record| record.state_for(request.target_id))
            .unwrap_or_default();
        let delta = VoteDelta::between(current, request.vote_status);
        debug!(?current, desired = ?request.vote_status, delta = delta.value(), "derived vote delta");

        self.apply_vote(VoteRequest {
            target_id: request.target_id,
            user_id: request.user_id,
            is_post: request.is_post,
            delta: i64::from(delta.value()),
            vote_status: Some(request.vote_status),
        })
        .await
    }

    /// The user's last known vote per target; empty before the first vote.
    pub async fn vote_map(&self, user_id: Uuid) -> DomainResult<BTreeMap<Uuid, VoteState>> {
        Ok(self
            .votes
            .vote_record(user_id)
            .await?
            .map(|record| record.vote_map)
            .unwrap_or_default())
    }
}
