//! Conversation stages — the persisted state of one user's dialogue.

use serde::{Deserialize, Serialize};

/// The discrete stages of a conversation.
///
/// Onboarding runs `Initial → AwaitingName → Onboarded → AwaitingPurpose`,
/// then branches into the interview-practice or general-advice sub-flow.
/// There is no terminal stage; every stage has an outgoing transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initial,
    AwaitingName,
    Onboarded,
    AwaitingPurpose,
    AwaitingInterviewType,
    AwaitingInterviewRole,
    AwaitingInterviewQuestionResponse,
    AwaitingFollowUpResponse,
    AwaitingMoreInterview,
    AwaitingAdviceCategory,
    AwaitingAdviceFollowup,
    AwaitingMoreAdviceFollowup,
    AwaitingMoreAdvice,
}

impl Stage {
    /// All stages, for catalog validation and tests.
    pub const ALL: [Stage; 13] = [
        Stage::Initial,
        Stage::AwaitingName,
        Stage::Onboarded,
        Stage::AwaitingPurpose,
        Stage::AwaitingInterviewType,
        Stage::AwaitingInterviewRole,
        Stage::AwaitingInterviewQuestionResponse,
        Stage::AwaitingFollowUpResponse,
        Stage::AwaitingMoreInterview,
        Stage::AwaitingAdviceCategory,
        Stage::AwaitingAdviceFollowup,
        Stage::AwaitingMoreAdviceFollowup,
        Stage::AwaitingMoreAdvice,
    ];

    /// The stable string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Initial => "initial",
            Stage::AwaitingName => "awaiting_name",
            Stage::Onboarded => "onboarded",
            Stage::AwaitingPurpose => "awaiting_purpose",
            Stage::AwaitingInterviewType => "awaiting_interview_type",
            Stage::AwaitingInterviewRole => "awaiting_interview_role",
            Stage::AwaitingInterviewQuestionResponse => "awaiting_interview_question_response",
            Stage::AwaitingFollowUpResponse => "awaiting_follow_up_response",
            Stage::AwaitingMoreInterview => "awaiting_more_interview",
            Stage::AwaitingAdviceCategory => "awaiting_advice_category",
            Stage::AwaitingAdviceFollowup => "awaiting_advice_followup",
            Stage::AwaitingMoreAdviceFollowup => "awaiting_more_advice_followup",
            Stage::AwaitingMoreAdvice => "awaiting_more_advice",
        }
    }

    /// Parse a persisted stage string.
    pub fn parse(s: &str) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|stage| stage.as_str() == s)
    }

    /// Parse a persisted stage string, treating anything unrecognized as
    /// `Onboarded`. A corrupted stage must never be fatal; the user simply
    /// lands back on the main menu.
    pub fn parse_lossy(s: &str) -> Stage {
        Stage::parse(s).unwrap_or(Stage::Onboarded)
    }

    /// Whether this stage is inside the interview-practice sub-flow.
    pub fn in_interview_flow(&self) -> bool {
        matches!(
            self,
            Stage::AwaitingInterviewType
                | Stage::AwaitingInterviewRole
                | Stage::AwaitingInterviewQuestionResponse
                | Stage::AwaitingFollowUpResponse
                | Stage::AwaitingMoreInterview
        )
    }

    /// Whether this stage is inside the general-advice sub-flow.
    pub fn in_advice_flow(&self) -> bool {
        matches!(
            self,
            Stage::AwaitingAdviceCategory
                | Stage::AwaitingAdviceFollowup
                | Stage::AwaitingMoreAdviceFollowup
                | Stage::AwaitingMoreAdvice
        )
    }

    /// Whether a conversation in this stage counts as in-flight for the idle
    /// sweeper. `Initial` and `Onboarded` are resting states.
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, Stage::Initial | Stage::Onboarded)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Initial
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
