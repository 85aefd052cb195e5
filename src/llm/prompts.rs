//! Prompt assembly for the generation calls the engine makes.
//!
//! Each function returns the role-tagged message list for one call; the
//! wording here is content, not control flow, and never mentions stages.

use crate::llm::ChatMessage;
use crate::store::InterviewType;

/// Shared output-shaping instructions appended to every system prompt.
/// Replies land in a WhatsApp chat, so no Markdown and a hard length cap.
const FORMATTING_INSTRUCTIONS: &str = "\
Format the reply for a WhatsApp message: short sections with simple bullet \
points, a few professional emojis are fine, no Markdown or HTML. Keep it \
under 200 words. Output only the content itself, with no acknowledgement \
of these instructions.";

/// The fixed advice categories offered on the advice menu, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceCategory {
    CollegeApplications,
    PreInterviewPreparation,
    DuringTheInterview,
    PostInterviewFollowup,
    CareerPlanning,
}

impl AdviceCategory {
    /// Map a menu reply (`1`..`5`) to a category.
    pub fn from_menu_choice(choice: &str) -> Option<AdviceCategory> {
        match choice {
            "1" => Some(AdviceCategory::CollegeApplications),
            "2" => Some(AdviceCategory::PreInterviewPreparation),
            "3" => Some(AdviceCategory::DuringTheInterview),
            "4" => Some(AdviceCategory::PostInterviewFollowup),
            "5" => Some(AdviceCategory::CareerPlanning),
            _ => None,
        }
    }

    /// Stable id for logging and tests.
    pub fn id(&self) -> &'static str {
        match self {
            AdviceCategory::CollegeApplications => "college_applications",
            AdviceCategory::PreInterviewPreparation => "pre_interview_preparation",
            AdviceCategory::DuringTheInterview => "during_the_interview",
            AdviceCategory::PostInterviewFollowup => "post_interview_followup",
            AdviceCategory::CareerPlanning => "career_planning",
        }
    }

    fn topic(&self) -> &'static str {
        match self {
            AdviceCategory::CollegeApplications => {
                "putting together a strong college application"
            }
            AdviceCategory::PreInterviewPreparation => {
                "preparing in the days and hours before an interview"
            }
            AdviceCategory::DuringTheInterview => {
                "performing well during the interview itself"
            }
            AdviceCategory::PostInterviewFollowup => {
                "following up effectively after an interview"
            }
            AdviceCategory::CareerPlanning => "planning the next steps of a career",
        }
    }
}

/// Messages for a fresh advice request in a category.
pub fn advice(category: AdviceCategory) -> Vec<ChatMessage> {
    vec![ChatMessage::system(format!(
        "You are an experienced interview and careers coach. Give practical, \
         encouraging advice about {}. {FORMATTING_INSTRUCTIONS}",
        category.topic()
    ))]
}

/// Messages for a follow-up question about advice already given. The prior
/// advice rides along as an assistant turn so the model answers in context.
pub fn advice_follow_up(last_advice: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You are an experienced interview and careers coach answering a \
             follow-up question about advice you just gave. \
             {FORMATTING_INSTRUCTIONS}"
        )),
        ChatMessage::assistant(last_advice),
        ChatMessage::user(question),
    ]
}

/// Messages for generating one probing follow-up to an interview answer.
pub fn interview_follow_up(
    response: &str,
    interview_type: InterviewType,
    role: &str,
) -> Vec<ChatMessage> {
    vec![ChatMessage::system(format!(
        "You are running a mock {} interview for the {role} position. The \
         candidate just answered:\n\n{response}\n\nAsk exactly one short, \
         probing follow-up question about that answer. Output only the \
         question.",
        interview_type.as_str()
    ))]
}

/// Messages for feedback on a full question/answer/follow-up exchange.
pub fn interview_feedback(
    question: &str,
    response: &str,
    follow_up: &str,
    follow_up_response: &str,
    interview_type: InterviewType,
    role: &str,
) -> Vec<ChatMessage> {
    vec![ChatMessage::system(format!(
        "You are an experienced {} interview coach evaluating a mock \
         interview for the {role} position.\n\
         Question: {question}\n\
         Answer: {response}\n\
         Follow-up question: {follow_up}\n\
         Follow-up answer: {follow_up_response}\n\n\
         Give specific, constructive feedback on the candidate's answers: \
         what worked, what to improve, and one concrete suggestion for next \
         time. {FORMATTING_INSTRUCTIONS}",
        interview_type.as_str()
    ))]
}
