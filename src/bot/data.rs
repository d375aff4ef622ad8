use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sqlx::SqlitePool;

use crate::config::Settings;
use crate::constants::timeouts::PROPOSAL_TIMEOUT_SECONDS;

/// A marriage proposal waiting for the target's answer
#[derive(Debug, Clone, Copy)]
pub struct Proposal {
    pub proposer_id: u64,
    pub created_at: Instant,
}

/// Shared data available to all commands and handlers
pub struct Data {
    pub pool: SqlitePool,
    pub settings: Settings,
    /// Open proposals keyed by (guild_id, target_id)
    pub proposals: DashMap<(u64, u64), Proposal>,
}

impl Data {
    pub fn new(pool: SqlitePool, settings: Settings) -> Self {
        Self {
            pool,
            settings,
            proposals: DashMap::new(),
        }
    }

    /// Record a proposal, replacing any older one addressed to the same member
    pub fn add_proposal(&self, guild_id: u64, target_id: u64, proposer_id: u64) {
        self.proposals.insert(
            (guild_id, target_id),
            Proposal {
                proposer_id,
                created_at: Instant::now(),
            },
        );
    }

    /// Consume the proposal from `proposer_id` if it is still answerable
    pub fn take_proposal(&self, guild_id: u64, target_id: u64, proposer_id: u64) -> Option<Proposal> {
        let (_, proposal) = self
            .proposals
            .remove_if(&(guild_id, target_id), |_, p| p.proposer_id == proposer_id)?;

        if proposal.created_at.elapsed() < Duration::from_secs(PROPOSAL_TIMEOUT_SECONDS) {
            Some(proposal)
        } else {
            None
        }
    }

    /// Whether someone already has an unanswered proposal to `target_id`
    pub fn has_pending_proposal(&self, guild_id: u64, target_id: u64) -> bool {
        self.proposals
            .get(&(guild_id, target_id))
            .map(|p| p.created_at.elapsed() < Duration::from_secs(PROPOSAL_TIMEOUT_SECONDS))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("pending_proposals", &self.proposals.len())
            .finish_non_exhaustive()
    }
}

pub type Context<'a> = poise::Context<'a, Arc<Data>, crate::bot::error::Error>;
