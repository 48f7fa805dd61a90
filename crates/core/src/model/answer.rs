use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionType};

/// Separates selected options inside stored answer text.
///
/// Option text must not contain this character.
pub const SELECTION_DELIMITER: char = ',';

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("option {option:?} contains the selection delimiter")]
    DelimiterInOption { option: String },
    #[error("question {question_id} does not offer option {option:?}")]
    UnknownOption {
        question_id: QuestionId,
        option: String,
    },
}

//
// ─── ANSWER RECORD ─────────────────────────────────────────────────────────────
//

/// One candidate answer: the options picked for a question, joined by
/// [`SELECTION_DELIMITER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(rename = "QuestionId")]
    pub question_id: QuestionId,
    #[serde(rename = "Answer")]
    pub answer_text: String,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(question_id: QuestionId, answer_text: impl Into<String>) -> Self {
        Self {
            question_id,
            answer_text: answer_text.into(),
        }
    }

    /// Serialize a selection, keeping pick order.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::DelimiterInOption` if an option contains
    /// [`SELECTION_DELIMITER`], since it could not be split back apart.
    pub fn from_selection<I, S>(question_id: QuestionId, selection: I) -> Result<Self, AnswerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parts = Vec::new();
        for option in selection {
            let option = option.as_ref();
            if option.contains(SELECTION_DELIMITER) {
                return Err(AnswerError::DelimiterInOption {
                    option: option.to_owned(),
                });
            }
            parts.push(option.to_owned());
        }
        Ok(Self::new(question_id, parts.join(",")))
    }

    /// The picked options as a set.
    #[must_use]
    pub fn selected(&self) -> BTreeSet<&str> {
        selected_options(&self.answer_text)
    }
}

/// Splits stored answer text back into the set of picked options.
#[must_use]
pub fn selected_options(answer_text: &str) -> BTreeSet<&str> {
    answer_text
        .split(SELECTION_DELIMITER)
        .filter(|s| !s.is_empty())
        .collect()
}

//
// ─── ANSWER SET ────────────────────────────────────────────────────────────────
//

/// Counts of what a merge did to an [`AnswerSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub overwritten: usize,
}

/// All answers a candidate gave for one learning item, keyed by question.
///
/// Never holds two answers for the same question. Persisted as a JSON array
/// of `{"QuestionId", "Answer"}` objects in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AnswerRecord>", into = "Vec<AnswerRecord>")]
pub struct AnswerSet {
    answers: BTreeMap<QuestionId, String>,
}

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, question_id: QuestionId) -> bool {
        self.answers.contains_key(&question_id)
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    /// Question ids in ascending order.
    pub fn question_ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.answers.keys().copied()
    }

    /// `(question, answer text)` pairs in ascending question order.
    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &str)> + '_ {
        self.answers.iter().map(|(id, text)| (*id, text.as_str()))
    }

    /// Insert or overwrite one answer. Returns the replaced answer text.
    pub fn insert(&mut self, record: AnswerRecord) -> Option<String> {
        self.answers.insert(record.question_id, record.answer_text)
    }

    /// Merge a batch into this set; later answers for the same question win.
    pub fn merge<I>(&mut self, batch: I) -> MergeStats
    where
        I: IntoIterator<Item = AnswerRecord>,
    {
        let mut stats = MergeStats::default();
        for record in batch {
            if self.insert(record).is_some() {
                stats.overwritten += 1;
            } else {
                stats.inserted += 1;
            }
        }
        stats
    }

    #[must_use]
    pub fn to_records(&self) -> Vec<AnswerRecord> {
        self.iter()
            .map(|(id, text)| AnswerRecord::new(id, text))
            .collect()
    }
}

impl FromIterator<AnswerRecord> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = AnswerRecord>>(iter: T) -> Self {
        let mut set = AnswerSet::new();
        set.merge(iter);
        set
    }
}

impl From<Vec<AnswerRecord>> for AnswerSet {
    fn from(records: Vec<AnswerRecord>) -> Self {
        records.into_iter().collect()
    }
}

impl From<AnswerSet> for Vec<AnswerRecord> {
    fn from(set: AnswerSet) -> Self {
        set.answers
            .into_iter()
            .map(|(question_id, answer_text)| AnswerRecord {
                question_id,
                answer_text,
            })
            .collect()
    }
}

//
// ─── ANSWER DRAFT ──────────────────────────────────────────────────────────────
//

/// In-progress selection for one displayed question.
///
/// `Single` questions keep only the latest pick; `Multiple` questions toggle
/// each picked option in and out of the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerDraft<'q> {
    question: &'q Question,
    selection: Vec<String>,
}

impl<'q> AnswerDraft<'q> {
    #[must_use]
    pub fn new(question: &'q Question) -> Self {
        Self {
            question,
            selection: Vec::new(),
        }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question.id()
    }

    #[must_use]
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    /// Pick (or, for `Multiple`, un-pick) an option.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::UnknownOption` if the question does not offer it.
    pub fn pick(&mut self, option: &str) -> Result<(), AnswerError> {
        if !self.question.offers(option) {
            return Err(AnswerError::UnknownOption {
                question_id: self.question.id(),
                option: option.to_owned(),
            });
        }
        match self.question.question_type() {
            QuestionType::Single => {
                self.selection.clear();
                self.selection.push(option.to_owned());
            }
            QuestionType::Multiple => {
                if let Some(pos) = self.selection.iter().position(|o| o == option) {
                    self.selection.remove(pos);
                } else {
                    self.selection.push(option.to_owned());
                }
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AnswerError::DelimiterInOption` if a picked option cannot be
    /// serialized.
    pub fn into_record(self) -> Result<AnswerRecord, AnswerError> {
        AnswerRecord::from_selection(self.question.id(), &self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::parse_correct_answers;

    fn question(kind: QuestionType) -> Question {
        Question::new(
            QuestionId::new(3),
            "Which?",
            ["A", "B", "C"].map(|o| Some(o.to_owned())),
            parse_correct_answers(Some("A")),
            kind,
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn merge_overwrites_existing_and_inserts_new() {
        let mut set: AnswerSet = vec![
            AnswerRecord::new(QuestionId::new(1), "A"),
            AnswerRecord::new(QuestionId::new(2), "B"),
        ]
        .into();

        let stats = set.merge([
            AnswerRecord::new(QuestionId::new(2), "C"),
            AnswerRecord::new(QuestionId::new(5), "D"),
        ]);

        assert_eq!(stats, MergeStats { inserted: 1, overwritten: 1 });
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(QuestionId::new(1)), Some("A"));
        assert_eq!(set.get(QuestionId::new(2)), Some("C"));
    }

    #[test]
    fn json_uses_list_store_field_names_and_collapses_duplicates() {
        let set: AnswerSet = serde_json::from_str(
            r#"[{"QuestionId":2,"Answer":"x"},{"QuestionId":1,"Answer":"A,B"},{"QuestionId":2,"Answer":"y"}]"#,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(QuestionId::new(2)), Some("y"));

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(
            json,
            r#"[{"QuestionId":1,"Answer":"A,B"},{"QuestionId":2,"Answer":"y"}]"#
        );
    }

    #[test]
    fn selection_rejects_delimiter_in_option() {
        let err = AnswerRecord::from_selection(QuestionId::new(1), ["ok", "a,b"]).unwrap_err();
        assert!(matches!(err, AnswerError::DelimiterInOption { .. }));
    }

    #[test]
    fn selected_options_ignores_empty_segments() {
        let picked = selected_options("B,,A");
        assert_eq!(picked.into_iter().collect::<Vec<_>>(), ["A", "B"]);
        assert!(selected_options("").is_empty());
    }

    #[test]
    fn single_draft_replaces_selection() {
        let question = question(QuestionType::Single);
        let mut draft = AnswerDraft::new(&question);
        draft.pick("A").unwrap();
        draft.pick("B").unwrap();
        assert_eq!(draft.selection(), ["B"]);
        assert_eq!(draft.into_record().unwrap().answer_text, "B");
    }

    #[test]
    fn multiple_draft_toggles_options() {
        let question = question(QuestionType::Multiple);
        let mut draft = AnswerDraft::new(&question);
        draft.pick("A").unwrap();
        draft.pick("C").unwrap();
        draft.pick("A").unwrap();
        draft.pick("B").unwrap();
        assert_eq!(draft.into_record().unwrap().answer_text, "C,B");
    }

    #[test]
    fn draft_rejects_unknown_option() {
        let question = question(QuestionType::Single);
        let mut draft = AnswerDraft::new(&question);
        let err = draft.pick("Z").unwrap_err();
        assert!(matches!(err, AnswerError::UnknownOption { .. }));
        assert!(draft.is_empty());
    }
}
