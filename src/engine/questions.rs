//! Question banks for mock interviews.
//!
//! One plain-text file per interview type, one question per line, embedded
//! at compile time. Picking is a uniform sample over the bank minus the
//! immediately prior question, so the user never sees the same question
//! twice in a row.

use rand::seq::SliceRandom;

use crate::store::InterviewType;

/// Static question banks, split by interview type.
pub struct QuestionBank {
    college: Vec<String>,
    job: Vec<String>,
}

impl QuestionBank {
    /// Load the embedded banks.
    pub fn builtin() -> Self {
        Self {
            college: parse_bank(include_str!("../../data/questions_college.txt")),
            job: parse_bank(include_str!("../../data/questions_job.txt")),
        }
    }

    fn bank(&self, interview_type: InterviewType) -> &[String] {
        match interview_type {
            InterviewType::College => &self.college,
            InterviewType::Job => &self.job,
        }
    }

    /// Pick a question uniformly at random, excluding `previous` so a user
    /// never gets an immediate repeat. Falls back to the full bank when the
    /// exclusion would empty it.
    pub fn pick(&self, interview_type: InterviewType, previous: Option<&str>) -> String {
        let bank = self.bank(interview_type);
        let mut rng = rand::thread_rng();

        let candidates: Vec<&String> = match previous {
            Some(prev) => bank.iter().filter(|q| q.as_str() != prev).collect(),
            None => bank.iter().collect(),
        };
        let pool = if candidates.is_empty() {
            bank.iter().collect()
        } else {
            candidates
        };

        pool.choose(&mut rng)
            .map(|q| (*q).clone())
            .unwrap_or_default()
    }

    /// Number of questions for an interview type.
    pub fn len(&self, interview_type: InterviewType) -> usize {
        self.bank(interview_type).len()
    }
}

fn parse_bank(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_banks_are_nonempty() {
        let bank = QuestionBank::builtin();
        assert!(bank.len(InterviewType::College) >= 5);
        assert!(bank.len(InterviewType::Job) >= 5);
    }

    #[test]
    fn pick_never_repeats_previous() {
        let bank = QuestionBank::builtin();
        let previous = bank.pick(InterviewType::Job, None);
        for _ in 0..100 {
            let next = bank.pick(InterviewType::Job, Some(&previous));
            assert_ne!(next, previous);
        }
    }

    #[test]
    fn pick_from_single_question_bank_falls_back() {
        let bank = QuestionBank {
            college: vec!["Only question?".to_string()],
            job: vec![],
        };
        // Exclusion would empty the pool; the lone question comes back.
        let picked = bank.pick(InterviewType::College, Some("Only question?"));
        assert_eq!(picked, "Only question?");
    }
}
