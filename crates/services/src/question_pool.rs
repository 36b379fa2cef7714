use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use clavier_core::model::{Question, QuestionId};

/// Randomized working set of questions, shuffled once per load.
///
/// The next question for a stage is the first entry of that stage, so the
/// order only changes when the pool is refilled.
#[derive(Debug)]
pub struct QuestionPool {
    rng: StdRng,
    entries: Vec<Question>,
}

impl QuestionPool {
    #[must_use]
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            entries: Vec::new(),
        }
    }

    /// Pool with a reproducible shuffle order.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Pool seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Replace the pool content with `questions` in a fresh random order.
    pub fn refill(&mut self, mut questions: Vec<Question>) {
        questions.shuffle(&mut self.rng);
        self.entries = questions;
    }

    /// First entry of `stage` not in `answered`, else the first entry of `stage`.
    #[must_use]
    pub fn pick(&self, stage: u8, answered: &HashSet<QuestionId>) -> Option<&Question> {
        let mut of_stage = self.entries.iter().filter(|q| q.stage() == stage);
        let first = of_stage.next()?;
        if !answered.contains(&first.id()) {
            return Some(first);
        }
        of_stage
            .find(|q| !answered.contains(&q.id()))
            .or(Some(first))
    }

    /// Drops `id` from the pool. Returns whether it was present.
    pub fn discard(&mut self, id: QuestionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|q| q.id() != id);
        self.entries.len() != before
    }

    #[cfg(test)]
    fn ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.entries.iter().map(Question::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clavier_core::model::{Choice, QuestionDraft};

    fn question(id: u64, stage: u8) -> Question {
        QuestionDraft {
            prompt: format!("Q{id}"),
            choices: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_choice: Choice::A,
            stage,
            hint: String::new(),
        }
        .validate()
        .unwrap()
        .assign_id(QuestionId::new(id))
    }

    fn catalog() -> Vec<Question> {
        (1..=12).map(|id| question(id, ((id - 1) % 4 + 1) as u8)).collect()
    }

    #[test]
    fn same_seed_same_order() {
        let mut a = QuestionPool::seeded(7);
        let mut b = QuestionPool::seeded(7);
        a.refill(catalog());
        b.refill(catalog());
        assert_eq!(a.ids().collect::<Vec<_>>(), b.ids().collect::<Vec<_>>());
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn pick_respects_stage_and_is_stable() {
        let mut pool = QuestionPool::seeded(1);
        pool.refill(catalog());
        let none = HashSet::new();
        let first = pool.pick(3, &none).unwrap().id();
        assert_eq!(pool.pick(3, &none).unwrap().stage(), 3);
        assert_eq!(pool.pick(3, &none).unwrap().id(), first);
    }

    #[test]
    fn pick_prefers_unanswered_then_falls_back() {
        let mut pool = QuestionPool::seeded(3);
        pool.refill(catalog());
        let stage_ids: Vec<_> = pool
            .ids()
            .filter(|id| (id.value() - 1) % 4 + 1 == 2)
            .collect();
        assert_eq!(stage_ids.len(), 3);

        let mut answered = HashSet::from([stage_ids[0]]);
        assert_eq!(pool.pick(2, &answered).unwrap().id(), stage_ids[1]);

        answered.extend(stage_ids.iter().copied());
        assert_eq!(pool.pick(2, &answered).unwrap().id(), stage_ids[0]);
    }

    #[test]
    fn discard_changes_the_pick() {
        let mut pool = QuestionPool::seeded(5);
        pool.refill(catalog());
        let none = HashSet::new();
        let shown = pool.pick(1, &none).unwrap().id();
        assert!(pool.discard(shown));
        assert!(!pool.discard(shown));
        assert_ne!(pool.pick(1, &none).unwrap().id(), shown);
        assert_eq!(pool.len(), 11);
    }

    #[test]
    fn empty_stage_yields_nothing() {
        let mut pool = QuestionPool::seeded(9);
        pool.refill(vec![question(1, 1)]);
        assert!(pool.pick(4, &HashSet::new()).is_none());
        assert!(pool.pick(1, &HashSet::new()).is_some());
    }
}
