use crate::libshiken::joutai::{FetchStatus, QuizState};
use crate::libshiken::shitsumon::Question;

pub const QUIZ_TITLE: &str = "JavaScript Quiz";
pub const CHART_MAX: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Screen<'a> {
    Loading,
    Failed(&'a str),
    /// Loaded but the provider sent nothing.
    Empty,
    Quiz(QuizView<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    None,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRow<'a> {
    pub slot: &'a str,
    pub text: &'a str,
    pub selected: bool,
    pub mark: Mark,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizView<'a> {
    pub question: &'a Question,
    /// 1-based, for "Question i of n".
    pub position: usize,
    pub total: usize,
    pub progress: f64,
    pub answers: Vec<AnswerRow<'a>>,
    pub answers_enabled: bool,
    pub can_go_previous: bool,
    pub can_go_next: bool,
    pub show_submit: bool,
    pub show_new_quiz: bool,
    /// Set once submitted; drives the results chart.
    pub score: Option<f64>,
    pub explanation: Option<&'a str>,
}

impl<'a> Screen<'a> {
    pub fn of(state: &'a QuizState) -> Screen<'a> {
        match state.status {
            FetchStatus::NotStarted | FetchStatus::Loading => return Screen::Loading,
            FetchStatus::Failed => {
                return Screen::Failed(state.error.as_deref().unwrap_or("Unknown error"))
            }
            FetchStatus::Loaded => {}
        }
        match QuizView::of(state) {
            Some(view) => Screen::Quiz(view),
            None => Screen::Empty,
        }
    }
}

impl<'a> QuizView<'a> {
    pub fn of(state: &'a QuizState) -> Option<QuizView<'a>> {
        let question = state.current_question()?;
        let index = state.current_question_index;
        let total = state.questions.len();
        let is_last = index + 1 == total;
        let submitted = state.is_submitted;
        let selection = state.selection_for(&question.id);

        let answers = question
            .populated_slots()
            .map(|(slot, text)| {
                let selected = selection
                    .and_then(|selection| selection.get(slot))
                    .copied()
                    .unwrap_or(false);
                let mark = match (submitted, question.is_slot_correct(slot), selected) {
                    (false, _, _) => Mark::None,
                    (true, true, _) => Mark::Correct,
                    (true, false, true) => Mark::Incorrect,
                    (true, false, false) => Mark::None,
                };
                AnswerRow {
                    slot,
                    text,
                    selected,
                    mark,
                }
            })
            .collect();

        Some(QuizView {
            question,
            position: index + 1,
            total,
            progress: progress(index, total),
            answers,
            answers_enabled: !submitted,
            can_go_previous: index > 0,
            can_go_next: !is_last,
            show_submit: is_last && !submitted,
            show_new_quiz: is_last && submitted,
            score: submitted.then_some(state.score),
            explanation: if submitted {
                question.explanation.as_deref()
            } else {
                None
            },
        })
    }
}

pub fn progress(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (index + 1) as f64 / total as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libshiken::joutai::Action;
    use crate::libshiken::shitsumon::tests::capital_question;

    fn loaded(count: usize) -> QuizState {
        QuizState::default()
            .apply(Action::FetchStarted)
            .apply(Action::FetchSucceeded(
                (1..=count).map(|i| capital_question(&i.to_string())).collect(),
            ))
    }

    #[test]
    fn status_picks_the_screen() {
        assert_eq!(Screen::of(&QuizState::default()), Screen::Loading);
        let failed = QuizState::default()
            .apply(Action::FetchStarted)
            .apply(Action::FetchFailed("Failed to fetch questions".into()));
        assert_eq!(Screen::of(&failed), Screen::Failed("Failed to fetch questions"));
        assert_eq!(Screen::of(&loaded(0)), Screen::Empty);
        assert!(matches!(Screen::of(&loaded(1)), Screen::Quiz(_)));
    }

    #[test]
    fn first_question_gates_previous() {
        let state = loaded(4);
        let view = QuizView::of(&state).unwrap();
        assert_eq!(view.position, 1);
        assert_eq!(view.total, 4);
        assert_eq!(view.progress, 25.0);
        assert!(!view.can_go_previous);
        assert!(view.can_go_next);
        assert!(!view.show_submit);
        assert_eq!(view.answers.len(), 2);
        assert_eq!(view.answers[0].text, "Paris");
        assert!(view.score.is_none());
    }

    #[test]
    fn last_question_offers_submit_then_new_quiz() {
        let state = loaded(2).apply(Action::SetCurrentQuestion(1));
        let view = QuizView::of(&state).unwrap();
        assert!(view.can_go_previous);
        assert!(!view.can_go_next);
        assert!(view.show_submit);
        assert!(!view.show_new_quiz);
        assert_eq!(view.progress, 100.0);

        let submitted = state.apply(Action::SubmitQuiz);
        let view = QuizView::of(&submitted).unwrap();
        assert!(!view.show_submit);
        assert!(view.show_new_quiz);
        assert!(!view.answers_enabled);
        assert_eq!(view.score, Some(0.0));
    }

    #[test]
    fn marks_appear_after_submission() {
        let state = loaded(1).apply(Action::SelectAnswer {
            question_id: "1".into(),
            answer_id: "answer_b".into(),
        });
        let view = QuizView::of(&state).unwrap();
        assert!(view.answers.iter().all(|row| row.mark == Mark::None));
        assert!(view.answers[1].selected);

        let submitted = state.apply(Action::SubmitQuiz);
        let view = QuizView::of(&submitted).unwrap();
        assert_eq!(view.answers[0].mark, Mark::Correct);
        assert_eq!(view.answers[1].mark, Mark::Incorrect);
    }

    #[test]
    fn progress_of_empty_quiz_is_zero() {
        assert_eq!(progress(0, 0), 0.0);
    }
}
