use chrono::{DateTime, Utc};

use crate::model::ids::{AnswerLogId, QuestionId, SessionId};
use crate::model::question::Choice;

/// Immutable record of one submitted choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerLog {
    pub id: AnswerLogId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub selected: Choice,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Correct/total answer counts of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerCounts {
    pub total: u32,
    pub correct: u32,
}

impl AnswerCounts {
    #[must_use]
    pub fn from_logs(logs: &[AnswerLog]) -> Self {
        logs.iter().fold(Self::default(), |mut acc, log| {
            acc.total = acc.total.saturating_add(1);
            if log.is_correct {
                acc.correct = acc.correct.saturating_add(1);
            }
            acc
        })
    }

    /// Percentage of correct answers, 0 when nothing was answered.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn log(id: u64, is_correct: bool) -> AnswerLog {
        AnswerLog {
            id: AnswerLogId::new(id),
            session_id: SessionId::new(1),
            question_id: QuestionId::new(id),
            selected: Choice::A,
            is_correct,
            answered_at: fixed_now(),
        }
    }

    #[test]
    fn accuracy_of_nothing_is_zero() {
        assert_eq!(AnswerCounts::default().accuracy(), 0.0);
    }

    #[test]
    fn counts_and_accuracy() {
        let counts = AnswerCounts::from_logs(&[log(1, true), log(2, false), log(3, true), log(4, true)]);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.correct, 3);
        assert!((counts.accuracy() - 75.0).abs() < f64::EPSILON);
    }
}
