use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::scoring::STAGE_MAX;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("choice {0} cannot be empty")]
    EmptyChoice(Choice),

    #[error("stage must be between 1 and {max}, got {stage}")]
    InvalidStage { stage: u8, max: u8 },

    #[error("invalid choice label: {0:?}")]
    InvalidChoice(String),
}

//
// ─── CHOICE ────────────────────────────────────────────────────────────────────
//

/// Label of one of the four answers of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Choice {
    A,
    B,
    C,
    D,
}

impl Choice {
    pub const ALL: [Choice; 4] = [Choice::A, Choice::B, Choice::C, Choice::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
        }
    }

    fn index(self) -> usize {
        match self {
            Choice::A => 0,
            Choice::B => 1,
            Choice::C => 2,
            Choice::D => 3,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Choice::A),
            "B" | "b" => Ok(Choice::B),
            "C" | "c" => Ok(Choice::C),
            "D" | "d" => Ok(Choice::D),
            other => Err(QuestionError::InvalidChoice(other.to_owned())),
        }
    }
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Unvalidated question content, as authored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub choices: [String; 4],
    pub correct_choice: Choice,
    pub stage: u8,
    pub hint: String,
}

impl QuestionDraft {
    /// Validates prompt, choices and stage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for blank text or a stage outside `1..=STAGE_MAX`.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionError> {
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        for choice in Choice::ALL {
            if self.choices[choice.index()].trim().is_empty() {
                return Err(QuestionError::EmptyChoice(choice));
            }
        }
        validate_stage(self.stage)?;

        Ok(ValidatedQuestion {
            prompt,
            choices: self.choices,
            correct_choice: self.correct_choice,
            stage: self.stage,
            hint: self.hint.trim().to_owned(),
        })
    }
}

fn validate_stage(stage: u8) -> Result<(), QuestionError> {
    if stage == 0 || stage > STAGE_MAX {
        return Err(QuestionError::InvalidStage {
            stage,
            max: STAGE_MAX,
        });
    }
    Ok(())
}

/// Question content that passed validation but has no row id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    prompt: String,
    choices: [String; 4],
    correct_choice: Choice,
    stage: u8,
    hint: String,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choice(&self, choice: Choice) -> &str {
        &self.choices[choice.index()]
    }

    #[must_use]
    pub fn correct_choice(&self) -> Choice {
        self.correct_choice
    }

    #[must_use]
    pub fn stage(&self) -> u8 {
        self.stage
    }

    #[must_use]
    pub fn hint(&self) -> &str {
        &self.hint
    }

    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            prompt: self.prompt,
            choices: self.choices,
            correct_choice: self.correct_choice,
            stage: self.stage,
            hint: self.hint,
        }
    }
}

/// Stage-tagged multiple-choice item. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    choices: [String; 4],
    correct_choice: Choice,
    stage: u8,
    hint: String,
}

impl Question {
    /// Rehydrate a question from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the stored row violates question invariants.
    pub fn from_persisted(
        id: QuestionId,
        prompt: String,
        choices: [String; 4],
        correct_choice: Choice,
        stage: u8,
        hint: String,
    ) -> Result<Self, QuestionError> {
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        validate_stage(stage)?;
        Ok(Self {
            id,
            prompt,
            choices,
            correct_choice,
            stage,
            hint,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn choice(&self, choice: Choice) -> &str {
        &self.choices[choice.index()]
    }

    /// Choices paired with their labels, in A..D order.
    pub fn labeled_choices(&self) -> impl Iterator<Item = (Choice, &str)> {
        Choice::ALL
            .into_iter()
            .map(|choice| (choice, self.choices[choice.index()].as_str()))
    }

    #[must_use]
    pub fn correct_choice(&self) -> Choice {
        self.correct_choice
    }

    #[must_use]
    pub fn is_correct(&self, selected: Choice) -> bool {
        self.correct_choice == selected
    }

    #[must_use]
    pub fn stage(&self) -> u8 {
        self.stage
    }

    /// Hint text, `None` when the question has none.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        if self.hint.is_empty() {
            None
        } else {
            Some(&self.hint)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(stage: u8) -> QuestionDraft {
        QuestionDraft {
            prompt: "2 ** 3 ?".into(),
            choices: ["6".into(), "8".into(), "9".into(), "12".into()],
            correct_choice: Choice::B,
            stage,
            hint: "  puissance ".into(),
        }
    }

    #[test]
    fn draft_validates_and_gets_an_id() {
        let question = draft(1).validate().unwrap().assign_id(QuestionId::new(3));
        assert_eq!(question.id(), QuestionId::new(3));
        assert_eq!(question.choice(Choice::B), "8");
        assert_eq!(question.hint(), Some("puissance"));
        assert!(question.is_correct(Choice::B));
        assert!(!question.is_correct(Choice::A));
    }

    #[test]
    fn stage_out_of_range_is_rejected() {
        assert!(matches!(
            draft(0).validate().unwrap_err(),
            QuestionError::InvalidStage { stage: 0, .. }
        ));
        assert!(matches!(
            draft(5).validate().unwrap_err(),
            QuestionError::InvalidStage { stage: 5, .. }
        ));
    }

    #[test]
    fn blank_choice_is_rejected() {
        let mut d = draft(2);
        d.choices[2] = " ".into();
        assert_eq!(d.validate().unwrap_err(), QuestionError::EmptyChoice(Choice::C));
    }

    #[test]
    fn empty_hint_reads_as_none() {
        let mut d = draft(2);
        d.hint = String::new();
        let question = d.validate().unwrap().assign_id(QuestionId::new(1));
        assert_eq!(question.hint(), None);
    }

    #[test]
    fn choice_parsing() {
        assert_eq!("c".parse::<Choice>().unwrap(), Choice::C);
        assert!(matches!(
            "E".parse::<Choice>().unwrap_err(),
            QuestionError::InvalidChoice(_)
        ));
        let labels: Vec<_> = draft(1)
            .validate()
            .unwrap()
            .assign_id(QuestionId::new(1))
            .labeled_choices()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(labels, Choice::ALL.to_vec());
    }
}
