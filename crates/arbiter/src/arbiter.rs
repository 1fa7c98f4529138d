//! Stateless, deterministic responder selection.
//!
//! No consensus protocol: the decision is a pure function of the static
//! priority list and a liveness snapshot. Membership flaps can cause brief
//! double-answers; that race is accepted, not corrected.

use std::{collections::HashSet, sync::Arc};

use {
    async_trait::async_trait,
    magpie_common::BotId,
    tracing::{debug, warn},
};

/// Liveness collaborator: which bot identities are currently reachable.
#[async_trait]
pub trait Liveness: Send + Sync {
    async fn online_bots(&self) -> anyhow::Result<HashSet<BotId>>;
}

/// Group-visibility collaborator: whether a bot can see a given group.
pub trait Visibility: Send + Sync {
    /// Must return `true` unless membership data positively says the bot is
    /// absent. Missing data means "assume present", so a freshly started
    /// process without a membership snapshot never mutes everyone.
    fn bot_in_group(&self, bot: BotId, group_id: i64) -> bool;
}

/// The designated responder: first entry of the priority list that is in the
/// online set. `None` when no configured bot is online.
pub fn designated(priority: &[BotId], online: &HashSet<BotId>) -> Option<BotId> {
    priority.iter().copied().find(|bot| online.contains(bot))
}

/// Decides, per trigger, whether this process answers.
pub struct PriorityArbiter {
    priority: Vec<BotId>,
    liveness: Arc<dyn Liveness>,
    visibility: Option<Arc<dyn Visibility>>,
}

impl PriorityArbiter {
    pub fn new(priority: Vec<BotId>, liveness: Arc<dyn Liveness>) -> Self {
        Self {
            priority,
            liveness,
            visibility: None,
        }
    }

    /// Attach a group-visibility collaborator; group-scoped decisions then
    /// skip candidates that are known to be absent from the group.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Arc<dyn Visibility>) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Whether `me` should answer a trigger with no group scope.
    pub async fn should_respond(&self, me: BotId) -> bool {
        self.should_respond_in(me, None).await
    }

    /// Whether `me` should answer a trigger scoped to `group_id`.
    ///
    /// Fail-open twice over: an unreachable liveness collaborator is treated
    /// as an empty online set, and an empty candidate list means any process
    /// may answer. Availability wins over strict exclusivity.
    pub async fn should_respond_in(&self, me: BotId, group_id: Option<i64>) -> bool {
        let online = match self.liveness.online_bots().await {
            Ok(online) => online,
            Err(e) => {
                warn!(error = %e, "liveness unavailable, assuming no online peers");
                HashSet::new()
            },
        };

        let winner = self
            .priority
            .iter()
            .copied()
            .filter(|bot| online.contains(bot))
            .find(|bot| match (group_id, &self.visibility) {
                (Some(group), Some(visibility)) => visibility.bot_in_group(*bot, group),
                _ => true,
            });

        match winner {
            Some(winner) => {
                debug!(%winner, me = %me, group = ?group_id, "designated responder");
                winner == me
            },
            // No configured-priority bot online: permissive, everyone may answer.
            None => true,
        }
    }
}
