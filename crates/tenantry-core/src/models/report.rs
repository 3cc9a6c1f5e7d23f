//! Seed run report
//!
//! Seeding is best-effort: every entity is attempted and its result recorded
//! here instead of being propagated as an error.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Group,
    DefaultChannel,
    SubChannel,
    Member,
    GroupMembership,
    GroupRole,
    ChannelMembership,
    Cleanup,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            EntityKind::Group => "group",
            EntityKind::DefaultChannel => "default_channel",
            EntityKind::SubChannel => "sub_channel",
            EntityKind::Member => "member",
            EntityKind::GroupMembership => "group_membership",
            EntityKind::GroupRole => "group_role",
            EntityKind::ChannelMembership => "channel_membership",
            EntityKind::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    /// Already existed remotely and was looked up.
    Reused,
    Updated,
    /// Deliberately not attempted.
    Skipped(String),
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Created | Outcome::Reused | Outcome::Updated)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityOutcome {
    pub kind: EntityKind,
    pub key: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedReport {
    pub outcomes: Vec<EntityOutcome>,
}

impl SeedReport {
    pub fn record(&mut self, kind: EntityKind, key: impl Into<String>, outcome: Outcome) {
        self.outcomes.push(EntityOutcome {
            kind,
            key: key.into(),
            outcome,
        });
    }

    pub fn outcomes_for(&self, kind: EntityKind) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn outcome_of(&self, kind: EntityKind, key: &str) -> Option<&Outcome> {
        self.outcomes_for(kind)
            .find(|entry| entry.key == key)
            .map(|entry| &entry.outcome)
    }

    pub fn succeeded(&self, kind: EntityKind) -> usize {
        self.outcomes_for(kind)
            .filter(|entry| entry.outcome.is_success())
            .count()
    }

    pub fn failed(&self, kind: EntityKind) -> usize {
        self.outcomes_for(kind)
            .filter(|entry| matches!(entry.outcome, Outcome::Failed(_)))
            .count()
    }

    pub fn total_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|entry| matches!(entry.outcome, Outcome::Failed(_)))
            .count()
    }

    pub fn merge(&mut self, other: SeedReport) {
        self.outcomes.extend(other.outcomes);
    }
}
