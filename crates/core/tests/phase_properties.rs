//! Property tests for the phase scheduler and scorer.
//!
//! - A question is never due before its trigger offset
//! - A question is never displayed twice in one session
//! - Playing to the end displays every question exactly once
//! - Re-submitting the same answers does not change the score

use std::collections::{BTreeMap, HashSet};

use lms_core::model::{AnswerRecord, AnswerSet, Question, QuestionId, QuestionType};
use lms_core::phase::PhaseScheduler;
use lms_core::scoring::merge_and_score;
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn build_bank(layout: &BTreeMap<u64, (u32, bool)>) -> Vec<Question> {
    layout
        .iter()
        .map(|(id, (half_seconds, multiple))| {
            let kind = if *multiple {
                QuestionType::Multiple
            } else {
                QuestionType::Single
            };
            let correct = if *multiple { "A:B" } else { "A" };
            Question::new(
                QuestionId::new(*id),
                format!("Q{id}"),
                ["A", "B", "C"].map(|o| Some(o.to_owned())),
                lms_core::model::parse_correct_answers(Some(correct)),
                kind,
                f64::from(*half_seconds) / 2.0,
            )
            .unwrap()
        })
        .collect()
}

fn arb_bank() -> impl Strategy<Value = BTreeMap<u64, (u32, bool)>> {
    prop::collection::btree_map(1u64..64, (0u32..1200, any::<bool>()), 0..16)
}

fn arb_positions() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((0u32..1400).prop_map(|v| f64::from(v) / 2.0), 1..40)
}

fn arb_answer() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["A", "B", "A,B", "C", "A,B,C"])
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn never_due_before_offset_and_never_twice(
        layout in arb_bank(),
        positions in arb_positions(),
    ) {
        let bank = build_bank(&layout);
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(bank.clone(), None).unwrap();

        let mut answers = AnswerSet::new();
        let mut shown = HashSet::new();
        for position in positions {
            if let Some(due) = scheduler.on_time_update(position) {
                prop_assert!(!due.is_empty());
                for pair in due.windows(2) {
                    prop_assert!(Question::trigger_order(&pair[0], &pair[1]).is_lt());
                }
                for question in &due {
                    prop_assert!(question.trigger_offset() <= position);
                    prop_assert!(shown.insert(question.id()));
                }
                let batch: Vec<AnswerRecord> =
                    due.iter().map(|q| AnswerRecord::new(q.id(), "A")).collect();
                let outcome = merge_and_score(&answers, &batch, scheduler.bank());
                answers = outcome.answers.clone();
                scheduler.complete_quiz(&outcome).unwrap();
            }
        }
    }

    #[test]
    fn playing_to_the_end_shows_every_question_once(layout in arb_bank()) {
        let bank = build_bank(&layout);
        let mut scheduler = PhaseScheduler::new();
        scheduler.load(bank.clone(), None).unwrap();

        let mut shown = Vec::new();
        let mut answers = AnswerSet::new();
        let mut reports = 0;
        for step in 0..=1200 {
            let position = f64::from(step) / 2.0;
            if let Some(due) = scheduler.on_time_update(position) {
                shown.extend(due.iter().map(Question::id));
                let batch: Vec<AnswerRecord> =
                    due.iter().map(|q| AnswerRecord::new(q.id(), "A")).collect();
                let outcome = merge_and_score(&answers, &batch, scheduler.bank());
                answers = outcome.answers.clone();
                if scheduler.complete_quiz(&outcome).unwrap().is_some() {
                    reports += 1;
                }
            }
        }

        shown.sort_unstable();
        let expected: Vec<QuestionId> = layout.keys().copied().map(QuestionId::new).collect();
        prop_assert_eq!(shown, expected);
        prop_assert_eq!(reports, usize::from(!layout.is_empty()));
    }

    #[test]
    fn resubmission_is_idempotent(
        layout in arb_bank(),
        picks in prop::collection::vec(arb_answer(), 16),
    ) {
        let bank = build_bank(&layout);
        let batch: Vec<AnswerRecord> = bank
            .iter()
            .zip(picks.iter())
            .map(|(q, pick)| AnswerRecord::new(q.id(), *pick))
            .collect();

        let first = merge_and_score(&AnswerSet::new(), &batch, &bank);
        let second = merge_and_score(&first.answers, &batch, &bank);

        prop_assert_eq!(first.score, second.score);
        prop_assert_eq!(first.status, second.status);
        prop_assert_eq!(first.answers, second.answers);
        prop_assert!(first.score <= first.total);
    }
}
