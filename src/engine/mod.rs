//! Conversation engine — the state machine behind every reply.
//!
//! One inbound message runs one handling sequence: acquire the identity's
//! lock, load (or lazily create) the user record, check for a control
//! command, otherwise dispatch on the current stage, then save the record
//! once. Handlers mutate the record and emit messages through the
//! `Notifier`; the single save at the end keeps the stage transition and
//! field updates atomic.
//!
//! The uniform rule for menu-like stages: unrecognized input re-sends a
//! clarification and holds the stage, so bad input can never strand a user.

pub mod questions;
pub mod session;
pub mod stage;

pub use questions::QuestionBank;
pub use session::SessionLocks;
pub use stage::Stage;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::catalog::MessageCatalog;
use crate::commands::Command;
use crate::config::AssistConfig;
use crate::error::Result;
use crate::llm::{prompts, ChatMessage, Generator};
use crate::llm::prompts::AdviceCategory;
use crate::channels::Notifier;
use crate::store::{InterviewType, UserRecord, UserStore};

/// External collaborators the engine drives.
pub struct EngineDeps {
    pub store: Arc<dyn UserStore>,
    pub notifier: Arc<dyn Notifier>,
    pub generator: Arc<dyn Generator>,
}

/// The conversation state machine.
pub struct ConversationEngine {
    store: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    generator: Arc<dyn Generator>,
    catalog: MessageCatalog,
    questions: QuestionBank,
    locks: SessionLocks,
    config: AssistConfig,
}

impl ConversationEngine {
    pub fn new(
        config: AssistConfig,
        catalog: MessageCatalog,
        questions: QuestionBank,
        deps: EngineDeps,
    ) -> Self {
        Self {
            store: deps.store,
            notifier: deps.notifier,
            generator: deps.generator,
            catalog,
            questions,
            locks: SessionLocks::new(),
            config,
        }
    }

    /// Handle one inbound message from `identity`.
    ///
    /// Serialized per identity; concurrent messages from different senders
    /// proceed in parallel.
    pub async fn handle_inbound(&self, identity: &str, body: &str) -> Result<()> {
        let _guard = self.locks.acquire(identity).await;

        let mut record = match self.store.load(identity).await? {
            Some(record) => record,
            None => {
                info!(identity, "First contact, creating user record");
                self.store.create(identity).await?
            }
        };
        record.last_interaction = Utc::now();

        if let Some(command) = Command::parse(body) {
            debug!(identity, ?command, "Command intercepted");
            self.handle_command(&mut record, command).await?;
        } else {
            self.dispatch(&mut record, body).await?;
        }

        self.store.save(&record).await?;
        Ok(())
    }

    /// Reset conversations idle past `cutoff`, notifying each user.
    ///
    /// Each reset takes the same per-identity lock as request handling and
    /// re-checks staleness under it, so a reply that arrives mid-sweep wins.
    /// Returns the number of conversations reset.
    pub async fn sweep_idle(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let stale = self.store.list_idle(cutoff).await?;
        let mut reset = 0;

        for candidate in stale {
            let _guard = self.locks.acquire(&candidate.identity).await;

            let Some(mut record) = self.store.load(&candidate.identity).await? else {
                continue;
            };
            if record.last_interaction >= cutoff || !record.stage.is_in_flight() {
                continue;
            }

            if let Err(e) = self.say(&record.identity, "idle", "disconnect", &[]).await {
                warn!(identity = %record.identity, error = %e, "Disconnect notice failed");
            }
            record.stage = Stage::Onboarded;
            self.store.save(&record).await?;
            info!(identity = %record.identity, "Idle conversation reset");
            reset += 1;
        }
        Ok(reset)
    }

    // ── Command handling ────────────────────────────────────────────

    async fn handle_command(&self, record: &mut UserRecord, command: Command) -> Result<()> {
        match command {
            Command::Exit => {
                self.say(&record.identity, "commands", "farewell", &[]).await?;
                record.stage = Stage::Onboarded;
            }
            Command::Restart => {
                let target = Command::restart_target(record.stage);
                let notice = match target {
                    Stage::Initial => "restart_onboarding",
                    Stage::AwaitingInterviewType => "restart_interview",
                    Stage::AwaitingAdviceCategory => "restart_advice",
                    _ => "restart_menu",
                };
                self.say(&record.identity, "commands", notice, &[]).await?;
                record.stage = target;
            }
            Command::Options => {
                self.say(&record.identity, "commands", "options_notice", &[]).await?;
                record.stage = Stage::Onboarded;
            }
            Command::Help => {
                // Stage deliberately untouched.
                self.say(&record.identity, "commands", "help", &[]).await?;
            }
        }
        Ok(())
    }

    // ── Stage dispatch ──────────────────────────────────────────────

    async fn dispatch(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        debug!(identity = %record.identity, stage = %record.stage, "Dispatching");
        match record.stage {
            Stage::Initial => self.handle_initial(record).await,
            Stage::AwaitingName => self.handle_awaiting_name(record, body).await,
            Stage::Onboarded => self.handle_onboarded(record).await,
            Stage::AwaitingPurpose => self.handle_awaiting_purpose(record, body).await,
            Stage::AwaitingInterviewType => self.handle_interview_type(record, body).await,
            Stage::AwaitingInterviewRole => self.handle_interview_role(record, body).await,
            Stage::AwaitingInterviewQuestionResponse => {
                self.handle_question_response(record, body).await
            }
            Stage::AwaitingFollowUpResponse => self.handle_follow_up_response(record, body).await,
            Stage::AwaitingMoreInterview => self.handle_more_interview(record, body).await,
            Stage::AwaitingAdviceCategory => self.handle_advice_category(record, body).await,
            Stage::AwaitingAdviceFollowup => self.handle_advice_followup(record, body).await,
            Stage::AwaitingMoreAdviceFollowup => {
                self.handle_more_advice_followup(record, body).await
            }
            Stage::AwaitingMoreAdvice => self.handle_more_advice(record, body).await,
        }
    }

    // ── Onboarding ──────────────────────────────────────────────────

    async fn handle_initial(&self, record: &mut UserRecord) -> Result<()> {
        let welcome = self.catalog.get("onboarding", "welcome")?;
        let ask_name = self.catalog.get("onboarding", "ask_name")?;
        self.notifier
            .send_sequence(&record.identity, &[welcome, ask_name])
            .await?;
        record.stage = Stage::AwaitingName;
        Ok(())
    }

    async fn handle_awaiting_name(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        let name = body.trim();
        if name.is_empty() {
            self.say(&record.identity, "onboarding", "ask_name", &[]).await?;
            return Ok(());
        }

        record.name = name.to_string();
        self.say(
            &record.identity,
            "onboarding",
            "confirm_name",
            &[("name", name)],
        )
        .await?;
        // Onboarded, and straight on to the purpose menu.
        self.send_menu(record).await
    }

    async fn handle_onboarded(&self, record: &mut UserRecord) -> Result<()> {
        if record.has_name() {
            self.say(
                &record.identity,
                "menu",
                "greeting",
                &[("name", &record.name.clone())],
            )
            .await?;
        }
        self.send_menu(record).await
    }

    async fn send_menu(&self, record: &mut UserRecord) -> Result<()> {
        self.say(&record.identity, "menu", "options", &[]).await?;
        record.stage = Stage::AwaitingPurpose;
        Ok(())
    }

    async fn handle_awaiting_purpose(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        match body.trim().to_lowercase().as_str() {
            "1" | "interview preparation" | "interview practice" => {
                self.say(&record.identity, "interview", "type_prompt", &[]).await?;
                record.stage = Stage::AwaitingInterviewType;
            }
            "2" | "general advice" => {
                self.say(&record.identity, "advice", "category_prompt", &[]).await?;
                record.stage = Stage::AwaitingAdviceCategory;
            }
            _ => {
                self.say(&record.identity, "menu", "invalid_choice", &[]).await?;
            }
        }
        Ok(())
    }

    // ── Interview sub-flow ──────────────────────────────────────────

    async fn handle_interview_type(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        match InterviewType::parse(&body.trim().to_lowercase()) {
            Some(interview_type) => {
                record.interview.interview_type = Some(interview_type);
                let key = match interview_type {
                    InterviewType::College => "role_prompt_college",
                    InterviewType::Job => "role_prompt_job",
                };
                self.say(&record.identity, "interview", key, &[]).await?;
                record.stage = Stage::AwaitingInterviewRole;
            }
            None => {
                // Explicit no-op: wait for a valid type without re-prompting.
                debug!(identity = %record.identity, "Unrecognized interview type, holding");
            }
        }
        Ok(())
    }

    async fn handle_interview_role(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        let Some(interview_type) = record.interview.interview_type else {
            // Type went missing (e.g. sub-flow restarted mid-way); recover
            // by asking for it again.
            self.say(&record.identity, "interview", "type_prompt", &[]).await?;
            record.stage = Stage::AwaitingInterviewType;
            return Ok(());
        };

        let role = body.trim();
        if role.is_empty() {
            let key = match interview_type {
                InterviewType::College => "role_prompt_college",
                InterviewType::Job => "role_prompt_job",
            };
            self.say(&record.identity, "interview", key, &[]).await?;
            return Ok(());
        }

        record.interview.role = Some(role.to_string());
        let confirm_key = match interview_type {
            InterviewType::College => "role_confirm_college",
            InterviewType::Job => "role_confirm_job",
        };
        self.say(&record.identity, "interview", confirm_key, &[("role", role)])
            .await?;

        self.send_next_question(record, interview_type).await
    }

    async fn send_next_question(
        &self,
        record: &mut UserRecord,
        interview_type: InterviewType,
    ) -> Result<()> {
        let question = self
            .questions
            .pick(interview_type, record.interview.last_question.as_deref());
        self.say(
            &record.identity,
            "interview",
            "question",
            &[("question", &question)],
        )
        .await?;
        record.interview.last_question = Some(question);
        record.stage = Stage::AwaitingInterviewQuestionResponse;
        Ok(())
    }

    async fn handle_question_response(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        let Some(interview_type) = record.interview.interview_type else {
            self.say(&record.identity, "interview", "type_prompt", &[]).await?;
            record.stage = Stage::AwaitingInterviewType;
            return Ok(());
        };

        let response = body.trim().to_string();
        let role = record.interview.role.clone().unwrap_or_default();

        let messages = prompts::interview_follow_up(&response, interview_type, &role);
        let Some(follow_up) = self
            .generate(record, &messages, self.config.max_reply_tokens)
            .await?
        else {
            return Ok(()); // stage held
        };

        record.interview.last_response = Some(response);
        self.notifier.say(&record.identity, &follow_up).await?;
        record.interview.last_follow_up = Some(follow_up);
        record.stage = Stage::AwaitingFollowUpResponse;
        Ok(())
    }

    async fn handle_follow_up_response(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        let Some(interview_type) = record.interview.interview_type else {
            self.say(&record.identity, "interview", "type_prompt", &[]).await?;
            record.stage = Stage::AwaitingInterviewType;
            return Ok(());
        };

        let follow_up_response = body.trim().to_string();
        let role = record.interview.role.clone().unwrap_or_default();
        let messages = prompts::interview_feedback(
            record.interview.last_question.as_deref().unwrap_or_default(),
            record.interview.last_response.as_deref().unwrap_or_default(),
            record.interview.last_follow_up.as_deref().unwrap_or_default(),
            &follow_up_response,
            interview_type,
            &role,
        );
        let Some(feedback) = self
            .generate(record, &messages, self.config.max_feedback_tokens)
            .await?
        else {
            return Ok(());
        };

        record.interview.last_follow_up_response = Some(follow_up_response);
        self.notifier.say(&record.identity, &feedback).await?;
        self.say(&record.identity, "interview", "continue_prompt", &[]).await?;
        record.stage = Stage::AwaitingMoreInterview;
        Ok(())
    }

    async fn handle_more_interview(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        match yes_no(body) {
            Some(true) => {
                let Some(interview_type) = record.interview.interview_type else {
                    self.say(&record.identity, "interview", "type_prompt", &[]).await?;
                    record.stage = Stage::AwaitingInterviewType;
                    return Ok(());
                };
                self.send_next_question(record, interview_type).await
            }
            Some(false) => {
                self.say(&record.identity, "interview", "closing", &[]).await?;
                record.stage = Stage::Onboarded;
                Ok(())
            }
            None => {
                self.say(&record.identity, "interview", "invalid_continue", &[]).await?;
                Ok(())
            }
        }
    }

    // ── Advice sub-flow ─────────────────────────────────────────────

    async fn handle_advice_category(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        let Some(category) = AdviceCategory::from_menu_choice(body.trim()) else {
            self.say(&record.identity, "advice", "invalid_category", &[]).await?;
            return Ok(());
        };

        info!(identity = %record.identity, category = category.id(), "Generating advice");
        let messages = prompts::advice(category);
        let Some(advice) = self
            .generate(record, &messages, self.config.max_reply_tokens)
            .await?
        else {
            return Ok(());
        };

        self.notifier.say(&record.identity, &advice).await?;
        record.last_advice = Some(advice);
        self.say(&record.identity, "advice", "followup_prompt", &[]).await?;
        record.stage = Stage::AwaitingAdviceFollowup;
        Ok(())
    }

    async fn handle_advice_followup(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        if matches!(yes_no(body), Some(false)) {
            self.say(&record.identity, "advice", "more_advice_prompt", &[]).await?;
            record.stage = Stage::AwaitingMoreAdvice;
            return Ok(());
        }

        let question = body.trim();
        if question.is_empty() {
            self.say(&record.identity, "advice", "followup_prompt", &[]).await?;
            return Ok(());
        }

        let last_advice = record.last_advice.clone().unwrap_or_default();
        let messages = prompts::advice_follow_up(&last_advice, question);
        let Some(answer) = self
            .generate(record, &messages, self.config.max_reply_tokens)
            .await?
        else {
            return Ok(());
        };

        self.notifier.say(&record.identity, &answer).await?;
        self.say(&record.identity, "advice", "more_questions_prompt", &[]).await?;
        record.stage = Stage::AwaitingMoreAdviceFollowup;
        Ok(())
    }

    async fn handle_more_advice_followup(
        &self,
        record: &mut UserRecord,
        body: &str,
    ) -> Result<()> {
        match yes_no(body) {
            Some(true) => {
                self.say(&record.identity, "advice", "followup_prompt", &[]).await?;
                record.stage = Stage::AwaitingAdviceFollowup;
            }
            Some(false) => {
                self.say(&record.identity, "advice", "more_advice_prompt", &[]).await?;
                record.stage = Stage::AwaitingMoreAdvice;
            }
            None => {
                self.say(&record.identity, "advice", "invalid_yes_no", &[]).await?;
            }
        }
        Ok(())
    }

    async fn handle_more_advice(&self, record: &mut UserRecord, body: &str) -> Result<()> {
        match yes_no(body) {
            Some(true) => {
                self.say(&record.identity, "advice", "category_prompt", &[]).await?;
                record.stage = Stage::AwaitingAdviceCategory;
            }
            Some(false) => {
                self.say(&record.identity, "advice", "closing", &[]).await?;
                record.stage = Stage::Onboarded;
            }
            None => {
                self.say(&record.identity, "advice", "invalid_yes_no", &[]).await?;
            }
        }
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────

    async fn say(
        &self,
        identity: &str,
        category: &str,
        key: &str,
        substitutions: &[(&str, &str)],
    ) -> Result<()> {
        let text = self.catalog.render(category, key, substitutions)?;
        self.notifier.say(identity, &text).await?;
        Ok(())
    }

    /// Run one generation call. On provider failure the user is told a
    /// response could not be generated and `None` comes back, which holds
    /// the current stage.
    async fn generate(
        &self,
        record: &UserRecord,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<Option<String>> {
        match self
            .generator
            .complete(messages, max_tokens, self.config.temperature)
            .await
        {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                warn!(identity = %record.identity, error = %e, "Generation failed");
                self.say(&record.identity, "errors", "generation_failed", &[]).await?;
                Ok(None)
            }
        }
    }
}

/// Classify a single-word yes/no reply. Anything else is unrecognized.
fn yes_no(body: &str) -> Option<bool> {
    match body.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}
