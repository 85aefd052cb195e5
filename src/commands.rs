//! Control commands — a small fixed vocabulary that bypasses stage dispatch.
//!
//! Checked against every inbound message before the engine consults the
//! stage table; a match fully short-circuits normal handling.

use crate::engine::Stage;

/// The closed set of control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Leave the current flow and say goodbye.
    Exit,
    /// Restart the current section of the conversation.
    Restart,
    /// Return to the main menu.
    Options,
    /// Show the command reference.
    Help,
}

impl Command {
    /// Parse a raw message body. The trimmed, lower-cased body must equal a
    /// command token exactly; embedded words ("please help") do not match.
    pub fn parse(raw: &str) -> Option<Command> {
        match raw.trim().to_lowercase().as_str() {
            "exit" => Some(Command::Exit),
            "restart" => Some(Command::Restart),
            "options" => Some(Command::Options),
            "help" => Some(Command::Help),
            _ => None,
        }
    }

    /// Where `restart` lands from a given stage. Grouped by sub-flow: the
    /// interview stages restart interview preparation, the advice stages
    /// restart advice, onboarding restarts from the top, and everything
    /// else returns to the menu.
    pub fn restart_target(stage: Stage) -> Stage {
        if stage.in_interview_flow() {
            Stage::AwaitingInterviewType
        } else if stage.in_advice_flow() {
            Stage::AwaitingAdviceCategory
        } else if matches!(stage, Stage::Initial | Stage::AwaitingName) {
            Stage::Initial
        } else {
            Stage::Onboarded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_tokens_case_insensitively() {
        assert_eq!(Command::parse("exit"), Some(Command::Exit));
        assert_eq!(Command::parse("  RESTART  "), Some(Command::Restart));
        assert_eq!(Command::parse("Options"), Some(Command::Options));
        assert_eq!(Command::parse("\thelp\n"), Some(Command::Help));
    }

    #[test]
    fn rejects_embedded_and_unknown_tokens() {
        assert_eq!(Command::parse("please help"), None);
        assert_eq!(Command::parse("exit now"), None);
        assert_eq!(Command::parse("helpme"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn restart_targets_by_sub_flow() {
        assert_eq!(Command::restart_target(Stage::Initial), Stage::Initial);
        assert_eq!(Command::restart_target(Stage::AwaitingName), Stage::Initial);
        assert_eq!(
            Command::restart_target(Stage::AwaitingFollowUpResponse),
            Stage::AwaitingInterviewType
        );
        assert_eq!(
            Command::restart_target(Stage::AwaitingMoreInterview),
            Stage::AwaitingInterviewType
        );
        assert_eq!(
            Command::restart_target(Stage::AwaitingMoreAdvice),
            Stage::AwaitingAdviceCategory
        );
        assert_eq!(Command::restart_target(Stage::Onboarded), Stage::Onboarded);
        assert_eq!(
            Command::restart_target(Stage::AwaitingPurpose),
            Stage::Onboarded
        );
    }
}
