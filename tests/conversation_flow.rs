//! End-to-end conversation scenarios against an in-memory store, a scripted
//! generator, and a recording notifier.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use prep_assist::catalog::MessageCatalog;
use prep_assist::channels::Notifier;
use prep_assist::config::AssistConfig;
use prep_assist::engine::{ConversationEngine, EngineDeps, QuestionBank, Stage};
use prep_assist::error::{ChannelError, LlmError};
use prep_assist::llm::{ChatMessage, ChatRole, Generator};
use prep_assist::store::{InterviewType, LibSqlStore, UserStore};

const USER: &str = "+15551234567";

/// Notifier that records every send in order.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    async fn texts_for(&self, identity: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == identity)
            .map(|(_, text)| text.clone())
            .collect()
    }

    async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn say(&self, identity: &str, text: &str) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .await
            .push((identity.to_string(), text.to_string()));
        Ok(())
    }
}

/// Generator that pops scripted replies and records every request.
#[derive(Default)]
struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    fail: AtomicBool,
}

impl ScriptedGenerator {
    async fn script(&self, replies: &[&str]) {
        let mut queue = self.replies.lock().await;
        queue.extend(replies.iter().map(|r| r.to_string()));
    }

    async fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        self.calls.lock().await.push(messages.to_vec());
        Ok(self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "generated reply".to_string()))
    }
}

struct Harness {
    engine: ConversationEngine,
    store: Arc<dyn UserStore>,
    notifier: Arc<RecordingNotifier>,
    generator: Arc<ScriptedGenerator>,
}

async fn harness() -> Harness {
    let store: Arc<dyn UserStore> = Arc::new(LibSqlStore::new_memory().await.unwrap());
    let notifier = Arc::new(RecordingNotifier::default());
    let generator = Arc::new(ScriptedGenerator::default());
    let engine = ConversationEngine::new(
        AssistConfig::default(),
        MessageCatalog::builtin().unwrap(),
        QuestionBank::builtin(),
        EngineDeps {
            store: Arc::clone(&store),
            notifier: Arc::clone(&notifier) as Arc<dyn Notifier>,
            generator: Arc::clone(&generator) as Arc<dyn Generator>,
        },
    );
    Harness {
        engine,
        store,
        notifier,
        generator,
    }
}

impl Harness {
    async fn stage(&self, identity: &str) -> Stage {
        self.store.load(identity).await.unwrap().unwrap().stage
    }

    /// Force a user into a stage (creating the record if needed).
    async fn put_in_stage(&self, identity: &str, stage: Stage) {
        let mut record = match self.store.load(identity).await.unwrap() {
            Some(record) => record,
            None => self.store.create(identity).await.unwrap(),
        };
        record.stage = stage;
        self.store.save(&record).await.unwrap();
    }
}

// ── Onboarding ──────────────────────────────────────────────────────

#[tokio::test]
async fn first_contact_creates_record_and_asks_name() {
    let h = harness().await;
    h.engine.handle_inbound(USER, "Hi").await.unwrap();

    assert_eq!(h.stage(USER).await, Stage::AwaitingName);
    let texts = h.notifier.texts_for(USER).await;
    assert_eq!(texts.len(), 2, "welcome + ask-name");
    assert!(texts[1].contains("what should I call you"));
}

#[tokio::test]
async fn name_reply_onboards_and_cascades_to_menu() {
    let h = harness().await;
    h.engine.handle_inbound(USER, "Hi").await.unwrap();
    h.notifier.clear().await;

    h.engine.handle_inbound(USER, "Alex").await.unwrap();

    let record = h.store.load(USER).await.unwrap().unwrap();
    assert_eq!(record.name, "Alex");
    assert_eq!(record.stage, Stage::AwaitingPurpose);

    let texts = h.notifier.texts_for(USER).await;
    assert!(texts[0].contains("Alex"), "confirmation names the user");
    assert!(texts[1].contains("1️⃣"), "menu follows immediately");
}

#[tokio::test]
async fn blank_name_re_asks_and_holds() {
    let h = harness().await;
    h.engine.handle_inbound(USER, "Hi").await.unwrap();
    h.engine.handle_inbound(USER, "   ").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingName);
}

// ── Purpose menu ────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_purpose_holds_stage_with_error() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingPurpose).await;

    h.engine.handle_inbound(USER, "3").await.unwrap();

    assert_eq!(h.stage(USER).await, Stage::AwaitingPurpose);
    let texts = h.notifier.texts_for(USER).await;
    assert!(texts.last().unwrap().contains("couldn't understand"));
}

#[tokio::test]
async fn purpose_one_enters_interview_flow() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingPurpose).await;

    h.engine.handle_inbound(USER, "1").await.unwrap();

    assert_eq!(h.stage(USER).await, Stage::AwaitingInterviewType);
    let texts = h.notifier.texts_for(USER).await;
    assert!(texts.last().unwrap().contains("college"));
}

#[tokio::test]
async fn purpose_accepts_worded_replies() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingPurpose).await;
    h.engine
        .handle_inbound(USER, "Interview Practice")
        .await
        .unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingInterviewType);

    h.put_in_stage(USER, Stage::AwaitingPurpose).await;
    h.engine.handle_inbound(USER, "general advice").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingAdviceCategory);
}

// ── Interview sub-flow ──────────────────────────────────────────────

#[tokio::test]
async fn full_interview_round_trip() {
    let h = harness().await;
    h.generator
        .script(&["Why did you choose that project?", "Strong answers overall! ✅"])
        .await;

    h.engine.handle_inbound(USER, "hello").await.unwrap();
    h.engine.handle_inbound(USER, "Sam").await.unwrap();
    h.engine.handle_inbound(USER, "1").await.unwrap();
    h.engine.handle_inbound(USER, "job").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingInterviewRole);

    h.engine.handle_inbound(USER, "data analyst").await.unwrap();
    let record = h.store.load(USER).await.unwrap().unwrap();
    assert_eq!(record.stage, Stage::AwaitingInterviewQuestionResponse);
    assert_eq!(record.interview.interview_type, Some(InterviewType::Job));
    assert_eq!(record.interview.role.as_deref(), Some("data analyst"));
    assert!(record.interview.last_question.is_some());

    h.engine
        .handle_inbound(USER, "I led a dashboard rebuild last year.")
        .await
        .unwrap();
    let record = h.store.load(USER).await.unwrap().unwrap();
    assert_eq!(record.stage, Stage::AwaitingFollowUpResponse);
    assert_eq!(
        record.interview.last_follow_up.as_deref(),
        Some("Why did you choose that project?")
    );

    h.notifier.clear().await;
    h.engine
        .handle_inbound(USER, "It had the most user impact.")
        .await
        .unwrap();
    let record = h.store.load(USER).await.unwrap().unwrap();
    assert_eq!(record.stage, Stage::AwaitingMoreInterview);
    let texts = h.notifier.texts_for(USER).await;
    assert!(texts[0].contains("Strong answers"));
    assert!(texts[1].contains("another practice question"));

    // The feedback call saw the full exchange.
    let calls = h.generator.calls().await;
    let feedback_prompt = &calls.last().unwrap()[0];
    assert_eq!(feedback_prompt.role, ChatRole::System);
    assert!(feedback_prompt.content.contains("dashboard rebuild"));
    assert!(feedback_prompt.content.contains("data analyst"));

    h.engine.handle_inbound(USER, "no").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::Onboarded);
}

#[tokio::test]
async fn unrecognized_interview_type_is_silent_hold() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingInterviewType).await;
    h.notifier.clear().await;

    h.engine.handle_inbound(USER, "maybe").await.unwrap();

    assert_eq!(h.stage(USER).await, Stage::AwaitingInterviewType);
    assert!(h.notifier.texts_for(USER).await.is_empty());
}

#[tokio::test]
async fn more_interview_yes_avoids_repeating_question() {
    let h = harness().await;
    let mut record = h.store.create(USER).await.unwrap();
    record.stage = Stage::AwaitingMoreInterview;
    record.interview.interview_type = Some(InterviewType::College);
    record.interview.last_question = Some("Tell me about yourself.".to_string());
    h.store.save(&record).await.unwrap();

    let mut previous = record.interview.last_question.clone().unwrap();
    for _ in 0..20 {
        h.put_in_stage(USER, Stage::AwaitingMoreInterview).await;
        h.engine.handle_inbound(USER, "yes").await.unwrap();
        let record = h.store.load(USER).await.unwrap().unwrap();
        assert_eq!(record.stage, Stage::AwaitingInterviewQuestionResponse);
        let question = record.interview.last_question.unwrap();
        assert_ne!(question, previous, "same question twice in a row");
        previous = question;
    }
}

#[tokio::test]
async fn replayed_no_from_more_interview_is_idempotent() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingMoreInterview).await;

    h.engine.handle_inbound(USER, "no").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::Onboarded);

    // Replay of the same input from the same stage lands the same place.
    h.put_in_stage(USER, Stage::AwaitingMoreInterview).await;
    h.engine.handle_inbound(USER, "n").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::Onboarded);
}

// ── Advice sub-flow ─────────────────────────────────────────────────

#[tokio::test]
async fn advice_category_two_generates_and_stores() {
    let h = harness().await;
    h.generator.script(&["Research the company beforehand."]).await;
    h.put_in_stage(USER, Stage::AwaitingAdviceCategory).await;
    h.notifier.clear().await;

    h.engine.handle_inbound(USER, "2").await.unwrap();

    let record = h.store.load(USER).await.unwrap().unwrap();
    assert_eq!(record.stage, Stage::AwaitingAdviceFollowup);
    assert_eq!(
        record.last_advice.as_deref(),
        Some("Research the company beforehand.")
    );

    // Category 2 is pre-interview preparation; the system prompt says so.
    let calls = h.generator.calls().await;
    assert!(calls[0][0].content.contains("before an interview"));

    let texts = h.notifier.texts_for(USER).await;
    assert!(texts[0].contains("Research the company"));
    assert!(texts[1].contains("question about this advice"));
}

#[tokio::test]
async fn invalid_advice_category_holds_stage() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingAdviceCategory).await;

    for bad in ["0", "6", "first", ""] {
        h.engine.handle_inbound(USER, bad).await.unwrap();
        assert_eq!(h.stage(USER).await, Stage::AwaitingAdviceCategory);
    }
}

#[tokio::test]
async fn advice_followup_question_uses_prior_advice_as_context() {
    let h = harness().await;
    h.generator.script(&["Practice aloud.", "Twice a day works well."]).await;
    h.put_in_stage(USER, Stage::AwaitingAdviceCategory).await;
    h.engine.handle_inbound(USER, "3").await.unwrap();

    h.engine
        .handle_inbound(USER, "How often should I practice?")
        .await
        .unwrap();

    assert_eq!(h.stage(USER).await, Stage::AwaitingMoreAdviceFollowup);
    let calls = h.generator.calls().await;
    let followup_call = calls.last().unwrap();
    assert_eq!(followup_call[1].role, ChatRole::Assistant);
    assert_eq!(followup_call[1].content, "Practice aloud.");
    assert_eq!(followup_call[2].role, ChatRole::User);
    assert_eq!(followup_call[2].content, "How often should I practice?");
}

#[tokio::test]
async fn advice_followup_no_moves_to_more_advice() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingAdviceFollowup).await;
    h.engine.handle_inbound(USER, "No").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingMoreAdvice);

    // yes → back to category menu; no → closing
    h.engine.handle_inbound(USER, "yes").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingAdviceCategory);

    h.put_in_stage(USER, Stage::AwaitingMoreAdvice).await;
    h.notifier.clear().await;
    h.engine.handle_inbound(USER, "n").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::Onboarded);
    let texts = h.notifier.texts_for(USER).await;
    assert!(texts[0].contains("Glad I could help"));
}

// ── Bad input never advances the stage ──────────────────────────────

#[tokio::test]
async fn unrecognized_input_holds_every_menu_stage() {
    let h = harness().await;
    let menu_stages = [
        Stage::AwaitingPurpose,
        Stage::AwaitingInterviewType,
        Stage::AwaitingMoreInterview,
        Stage::AwaitingAdviceCategory,
        Stage::AwaitingMoreAdviceFollowup,
        Stage::AwaitingMoreAdvice,
    ];
    for stage in menu_stages {
        h.put_in_stage(USER, stage).await;
        h.engine.handle_inbound(USER, "???").await.unwrap();
        assert_eq!(h.stage(USER).await, stage, "bad input advanced {stage}");
    }
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn help_is_intercepted_at_any_stage_without_side_effects() {
    let h = harness().await;
    for stage in [Stage::Initial, Stage::AwaitingPurpose, Stage::AwaitingFollowUpResponse] {
        h.put_in_stage(USER, stage).await;
        h.notifier.clear().await;

        h.engine.handle_inbound(USER, "  HELP \n").await.unwrap();

        assert_eq!(h.stage(USER).await, stage, "help changed the stage");
        let texts = h.notifier.texts_for(USER).await;
        assert_eq!(texts.len(), 1, "only the help text is sent");
        assert!(texts[0].contains("'restart'"));
    }
}

#[tokio::test]
async fn exit_returns_to_onboarded_with_farewell() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingMoreAdvice).await;
    h.notifier.clear().await;

    h.engine.handle_inbound(USER, "exit").await.unwrap();

    assert_eq!(h.stage(USER).await, Stage::Onboarded);
    let texts = h.notifier.texts_for(USER).await;
    assert!(texts[0].contains("Goodbye"));
}

#[tokio::test]
async fn restart_targets_the_current_section() {
    let h = harness().await;

    h.put_in_stage(USER, Stage::AwaitingFollowUpResponse).await;
    h.engine.handle_inbound(USER, "restart").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingInterviewType);

    h.put_in_stage(USER, Stage::AwaitingMoreAdviceFollowup).await;
    h.engine.handle_inbound(USER, "Restart").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingAdviceCategory);

    h.put_in_stage(USER, Stage::AwaitingName).await;
    h.engine.handle_inbound(USER, "restart").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::Initial);

    h.put_in_stage(USER, Stage::AwaitingPurpose).await;
    h.engine.handle_inbound(USER, "restart").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::Onboarded);
}

#[tokio::test]
async fn options_returns_to_menu_stage() {
    let h = harness().await;
    h.put_in_stage(USER, Stage::AwaitingInterviewRole).await;
    h.engine.handle_inbound(USER, "options").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::Onboarded);
}

// ── Generation failure ──────────────────────────────────────────────

#[tokio::test]
async fn generation_failure_holds_stage_and_informs_user() {
    let h = harness().await;
    let mut record = h.store.create(USER).await.unwrap();
    record.stage = Stage::AwaitingInterviewQuestionResponse;
    record.interview.interview_type = Some(InterviewType::Job);
    record.interview.role = Some("engineer".to_string());
    record.interview.last_question = Some("Why us?".to_string());
    h.store.save(&record).await.unwrap();

    h.generator.fail.store(true, Ordering::SeqCst);
    h.notifier.clear().await;

    h.engine.handle_inbound(USER, "Because I like it.").await.unwrap();

    assert_eq!(h.stage(USER).await, Stage::AwaitingInterviewQuestionResponse);
    let texts = h.notifier.texts_for(USER).await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("couldn't generate"));

    // The provider recovers; the retried answer goes through.
    h.generator.fail.store(false, Ordering::SeqCst);
    h.engine.handle_inbound(USER, "Because I like it.").await.unwrap();
    assert_eq!(h.stage(USER).await, Stage::AwaitingFollowUpResponse);
}

// ── Idle sweep ──────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_resets_only_stale_in_flight_conversations() {
    let h = harness().await;

    let mut stale = h.store.create("+15550000001").await.unwrap();
    stale.stage = Stage::AwaitingAdviceFollowup;
    stale.last_interaction = Utc::now() - chrono::Duration::minutes(30);
    h.store.save(&stale).await.unwrap();

    let mut fresh = h.store.create("+15550000002").await.unwrap();
    fresh.stage = Stage::AwaitingPurpose;
    h.store.save(&fresh).await.unwrap();

    let mut resting = h.store.create("+15550000003").await.unwrap();
    resting.stage = Stage::Onboarded;
    resting.last_interaction = Utc::now() - chrono::Duration::hours(2);
    h.store.save(&resting).await.unwrap();

    let cutoff = Utc::now() - chrono::Duration::minutes(15);
    let reset = h.engine.sweep_idle(cutoff).await.unwrap();

    assert_eq!(reset, 1);
    assert_eq!(h.stage("+15550000001").await, Stage::Onboarded);
    assert_eq!(h.stage("+15550000002").await, Stage::AwaitingPurpose);
    let texts = h.notifier.texts_for("+15550000001").await;
    assert!(texts[0].contains("disconnected"));
    assert!(h.notifier.texts_for("+15550000002").await.is_empty());
}

// ── Persistence of the stage itself ─────────────────────────────────

#[tokio::test]
async fn every_handled_message_leaves_an_enumerated_stage() {
    let h = harness().await;
    let inputs = ["Hi", "Alex", "1", "job", "engineer", "answer", "answer two", "no", "help"];
    for input in inputs {
        h.engine.handle_inbound(USER, input).await.unwrap();
        let stage = h.stage(USER).await;
        assert!(Stage::ALL.contains(&stage));
    }
}
