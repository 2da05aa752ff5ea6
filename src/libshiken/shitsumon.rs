use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Per-question answer state: slot key (`answer_a`, ...) to "selected".
/// Slots that were never touched are simply absent.
pub type AnswerSelection = BTreeMap<String, bool>;

const CORRECT_SUFFIX: &str = "_correct";

macro_rules! flag_is_true {
    ($value:expr) => {
        $value.map(|v| v == "true").unwrap_or(false)
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_correct_answers: Option<String>,
    #[serde(default)]
    pub correct_answers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

// quizapi.io sends numeric ids, stored sessions carry strings.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

impl Question {
    /// Answer slots that actually carry text, in slot order.
    pub fn populated_slots(&self) -> impl Iterator<Item = (&str, &str)> {
        self.answers.iter().filter_map(|(slot, text)| match text {
            Some(text) if !text.is_empty() => Some((slot.as_str(), text.as_str())),
            _ => None,
        })
    }

    pub fn has_slot(&self, slot: &str) -> bool {
        self.populated_slots().any(|(key, _)| key == slot)
    }

    pub fn is_slot_correct(&self, slot: &str) -> bool {
        flag_is_true!(self
            .correct_answers
            .get(&format!("{slot}{CORRECT_SUFFIX}")))
    }

    /// Every populated slot set to unselected.
    pub fn fresh_selection(&self) -> AnswerSelection {
        self.populated_slots()
            .map(|(slot, _)| (slot.to_string(), false))
            .collect()
    }

    /// A question counts only when every slot in the correctness map agrees
    /// with the selection (missing selection entries count as unselected).
    pub fn is_answered_correctly(&self, selection: Option<&AnswerSelection>) -> bool {
        self.correct_answers.iter().all(|(key, value)| {
            let slot = key.strip_suffix(CORRECT_SUFFIX).unwrap_or(key);
            let expected = value == "true";
            let actual = selection
                .and_then(|selection| selection.get(slot))
                .copied()
                .unwrap_or(false);
            expected == actual
        })
    }
}

/// Percentage of fully correct questions, 0 for an empty quiz.
pub fn score(questions: &[Question], answers: &BTreeMap<String, AnswerSelection>) -> f64 {
    if questions.is_empty() {
        return 0.0;
    }
    let correct = questions
        .iter()
        .filter(|question| question.is_answered_correctly(answers.get(&question.id)))
        .count();
    (correct as f64 / questions.len() as f64) * 100.0
}
