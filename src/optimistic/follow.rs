//! Follow and unfollow, applied optimistically.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ActionOutcome, OptimisticModel, Reconciler};
use crate::auth::ApiClient;
use crate::error::TetherResult;
use crate::models::FollowEdge;
use crate::traits::RemoteMutation;

/// What the viewer sees for one follow target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowView {
    pub is_following: bool,
    pub follower_count: u64,
}

impl FollowView {
    pub fn new(is_following: bool, follower_count: u64) -> Self {
        Self {
            is_following,
            follower_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowIntent {
    Follow,
    Unfollow,
}

/// Follow state per [`FollowEdge`].
pub struct FollowModel;

impl OptimisticModel for FollowModel {
    type Key = FollowEdge;
    type Value = FollowView;
    type Intent = FollowIntent;

    fn apply(current: &FollowView, intent: &FollowIntent) -> FollowView {
        match intent {
            FollowIntent::Follow if !current.is_following => FollowView {
                is_following: true,
                follower_count: current.follower_count.saturating_add(1),
            },
            FollowIntent::Unfollow if current.is_following => FollowView {
                is_following: false,
                follower_count: current.follower_count.saturating_sub(1),
            },
            _ => *current,
        }
    }

    fn satisfies(current: &FollowView, intent: &FollowIntent) -> bool {
        match intent {
            FollowIntent::Follow => current.is_following,
            FollowIntent::Unfollow => !current.is_following,
        }
    }
}

#[async_trait]
impl RemoteMutation<FollowModel> for ApiClient {
    async fn execute(&self, edge: &FollowEdge, intent: &FollowIntent) -> TetherResult<()> {
        match intent {
            FollowIntent::Follow => self.follow(edge).await,
            FollowIntent::Unfollow => self.unfollow(edge).await,
        }
    }
}

impl Reconciler<FollowModel> {
    pub async fn follow(&self, edge: FollowEdge) -> ActionOutcome {
        self.dispatch(edge, FollowIntent::Follow).await
    }

    pub async fn unfollow(&self, edge: FollowEdge) -> ActionOutcome {
        self.dispatch(edge, FollowIntent::Unfollow).await
    }

    /// Follow if not following, otherwise unfollow.
    pub async fn toggle(&self, edge: FollowEdge) -> ActionOutcome {
        let intent = if self.get(&edge).is_following {
            FollowIntent::Unfollow
        } else {
            FollowIntent::Follow
        };
        self.dispatch(edge, intent).await
    }
}
