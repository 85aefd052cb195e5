//! `UserStore` trait — single async interface for conversation persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::engine::Stage;
use crate::error::DatabaseError;

/// Placeholder name until the user tells us theirs during onboarding.
pub const NAME_PLACEHOLDER: &str = "there";

/// Which kind of interview the user is practicing for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewType {
    College,
    Job,
}

impl InterviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::College => "college",
            InterviewType::Job => "job",
        }
    }

    pub fn parse(s: &str) -> Option<InterviewType> {
        match s {
            "college" => Some(InterviewType::College),
            "job" => Some(InterviewType::Job),
            _ => None,
        }
    }
}

/// In-flight interview-practice fields. Only meaningful while the stage is
/// inside the interview sub-flow; overwritten, not cleared, between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterviewState {
    pub interview_type: Option<InterviewType>,
    pub role: Option<String>,
    pub last_question: Option<String>,
    pub last_response: Option<String>,
    pub last_follow_up: Option<String>,
    pub last_follow_up_response: Option<String>,
}

/// One conversation's durable state, keyed by normalized sender identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Unique key (E.164 number without the transport prefix). Immutable.
    pub identity: String,
    pub name: String,
    pub stage: Stage,
    /// Updated on every inbound message; drives the idle sweeper.
    pub last_interaction: DateTime<Utc>,
    pub last_advice: Option<String>,
    pub interview: InterviewState,
}

impl UserRecord {
    /// A fresh record for a first-time sender.
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            name: NAME_PLACEHOLDER.to_string(),
            stage: Stage::Initial,
            last_interaction: Utc::now(),
            last_advice: None,
            interview: InterviewState::default(),
        }
    }

    /// Whether onboarding has captured a real name yet.
    pub fn has_name(&self) -> bool {
        self.name != NAME_PLACEHOLDER
    }
}

/// Backend-agnostic persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load a record by identity, if one exists.
    async fn load(&self, identity: &str) -> Result<Option<UserRecord>, DatabaseError>;

    /// Create a fresh record for a first-time sender.
    async fn create(&self, identity: &str) -> Result<UserRecord, DatabaseError>;

    /// Persist a record. The stage transition and field updates land in one
    /// write so a failure leaves no partial state visible.
    async fn save(&self, record: &UserRecord) -> Result<(), DatabaseError>;

    /// Records whose `last_interaction` is older than `cutoff` and whose
    /// stage is in-flight (not `Initial`/`Onboarded`).
    async fn list_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<UserRecord>, DatabaseError>;
}
