use crate::libshiken::shitsumon::{self, AnswerSelection, Question};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    #[default]
    NotStarted,
    Loading,
    Loaded,
    Failed,
}

/// Inputs to the reducer. The fetch itself runs elsewhere and reports back
/// through `FetchSucceeded` / `FetchFailed`.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    FetchStarted,
    FetchSucceeded(Vec<Question>),
    FetchFailed(String),
    SetCurrentQuestion(usize),
    SelectAnswer {
        question_id: String,
        answer_id: String,
    },
    SubmitQuiz,
    ResetQuiz,
    Retry,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizState {
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub user_answers: BTreeMap<String, AnswerSelection>,
    pub is_submitted: bool,
    pub score: f64,
    pub status: FetchStatus,
    pub error: Option<String>,
}

impl QuizState {
    pub fn apply(mut self, action: Action) -> QuizState {
        match action {
            Action::FetchStarted => {
                if self.status == FetchStatus::NotStarted {
                    self.status = FetchStatus::Loading;
                    self.error = None;
                }
            }
            Action::FetchSucceeded(questions) => {
                if self.status != FetchStatus::Loading {
                    warn!("[Quiz] Dropping fetch result, status is {:?}", self.status);
                    return self;
                }
                debug!("[Quiz] Loaded {} questions", questions.len());
                self = QuizState {
                    questions,
                    status: FetchStatus::Loaded,
                    ..QuizState::default()
                };
            }
            Action::FetchFailed(message) => {
                if self.status != FetchStatus::Loading {
                    warn!("[Quiz] Dropping fetch failure, status is {:?}", self.status);
                    return self;
                }
                self.status = FetchStatus::Failed;
                self.error = Some(message);
            }
            Action::SetCurrentQuestion(target) => {
                if target < self.questions.len() {
                    self.current_question_index = target;
                } else {
                    debug!(
                        "[Quiz] Ignoring navigation to {} of {}",
                        target,
                        self.questions.len()
                    );
                }
            }
            Action::SelectAnswer {
                question_id,
                answer_id,
            } => self.select_answer(question_id, answer_id),
            Action::SubmitQuiz => {
                self.score = shitsumon::score(&self.questions, &self.user_answers);
                self.is_submitted = true;
                debug!("[Quiz] Submitted with score {}", self.score);
            }
            Action::ResetQuiz => self = QuizState::default(),
            Action::Retry => {
                if self.status == FetchStatus::Failed {
                    self.status = FetchStatus::NotStarted;
                    self.error = None;
                }
            }
        }
        self
    }

    fn select_answer(&mut self, question_id: String, answer_id: String) {
        if self.is_submitted {
            return;
        }
        let Some(question) = self.questions.iter().find(|q| q.id == question_id) else {
            warn!("[Quiz] No question with id {question_id:?}");
            return;
        };
        if !question.has_slot(&answer_id) {
            warn!("[Quiz] Question {question_id:?} has no answer {answer_id:?}");
            return;
        }

        let was_selected = self
            .user_answers
            .get(&question_id)
            .and_then(|selection| selection.get(&answer_id))
            .copied()
            .unwrap_or(false);
        let mut selection = question.fresh_selection();
        selection.insert(answer_id, !was_selected);
        self.user_answers.insert(question_id, selection);
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    pub fn selection_for(&self, question_id: &str) -> Option<&AnswerSelection> {
        self.user_answers.get(question_id)
    }

    /// Repairs a document read back from storage.
    pub fn restored(mut self) -> QuizState {
        if self.status == FetchStatus::Loading {
            debug!("[Quiz] Stored session was mid-fetch, starting over");
            self.status = FetchStatus::NotStarted;
        }
        if self.status != FetchStatus::Failed {
            self.error = None;
        }
        if self.current_question_index >= self.questions.len() {
            self.current_question_index = self.questions.len().saturating_sub(1);
        }
        if !self.is_submitted {
            self.score = 0.0;
        }
        self.score = self.score.clamp(0.0, 100.0);
        self
    }
}
