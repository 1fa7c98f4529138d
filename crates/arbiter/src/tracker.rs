//! In-process liveness view maintained by the transport layer.
//!
//! One tracker instance is shared across the process; connection handlers
//! mark identities online/offline as sockets come and go, and periodically
//! push group-membership snapshots.

use std::{
    collections::{HashMap, HashSet},
    sync::RwLock,
};

use {
    async_trait::async_trait,
    magpie_common::BotId,
    tracing::debug,
};

use crate::arbiter::{Liveness, Visibility};

#[derive(Default)]
struct TrackerState {
    online: HashSet<BotId>,
    groups: HashMap<BotId, HashSet<i64>>,
}

/// Shared live-connection registry: which of our identities are connected,
/// and which groups each can see.
#[derive(Default)]
pub struct BotTracker {
    state: RwLock<TrackerState>,
}

impl BotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_online(&self, bot: BotId) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.online.insert(bot) {
            debug!(%bot, "bot online");
        }
    }

    pub fn mark_offline(&self, bot: BotId) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.online.remove(&bot) {
            debug!(%bot, "bot offline");
        }
    }

    /// Replace the group-membership snapshot for `bot`.
    pub fn set_groups(&self, bot: BotId, groups: impl IntoIterator<Item = i64>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.groups.insert(bot, groups.into_iter().collect());
    }

    /// Drop membership data for `bot` (e.g. on reconnect, until refreshed).
    pub fn clear_groups(&self, bot: BotId) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.groups.remove(&bot);
    }

    pub fn online(&self) -> HashSet<BotId> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.online.clone()
    }

    pub fn is_online(&self, bot: BotId) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.online.contains(&bot)
    }
}

#[async_trait]
impl Liveness for BotTracker {
    async fn online_bots(&self) -> anyhow::Result<HashSet<BotId>> {
        Ok(self.online())
    }
}

impl Visibility for BotTracker {
    fn bot_in_group(&self, bot: BotId, group_id: i64) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        // No snapshot for this bot yet: assume present.
        match state.groups.get(&bot) {
            Some(groups) => groups.contains(&group_id),
            None => true,
        }
    }
}
