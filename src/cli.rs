use crate::libshiken::store::QuizStore;
use crate::libshiken::view::{Mark, QuizView, Screen, CHART_MAX, QUIZ_TITLE};
use crate::Error;
use colored::Colorize;
use log::debug;
use std::io::Write;
use std::time::Duration;
use text_io::try_read;

const FETCH_WAIT: Duration = Duration::from_secs(30);
const CHART_WIDTH: usize = 40;
const PROGRESS_WIDTH: usize = 30;

#[derive(Debug, PartialEq)]
enum Command {
    Toggle { question_id: String, answer_id: String },
    Goto(usize),
    Submit,
    NewQuiz,
    Retry,
    Wait,
    Quit,
    Unknown(String),
}

impl Command {
    fn from_view(view: &QuizView, input: &str) -> Command {
        let input = input.trim();
        let index = view.position - 1;
        match input {
            "q" => Command::Quit,
            "n" if view.can_go_next => Command::Goto(index + 1),
            "p" if view.can_go_previous => Command::Goto(index - 1),
            "s" if view.show_submit => Command::Submit,
            "r" if view.show_new_quiz => Command::NewQuiz,
            input => {
                if let Some(target) = input.strip_prefix("g ") {
                    return match target.trim().parse::<usize>() {
                        Ok(num) if num >= 1 => Command::Goto(num - 1),
                        _ => Command::Unknown(input.to_string()),
                    };
                }
                match input.parse::<usize>() {
                    Ok(num) if view.answers_enabled && (1..=view.answers.len()).contains(&num) => {
                        Command::Toggle {
                            question_id: view.question.id.clone(),
                            answer_id: view.answers[num - 1].slot.to_string(),
                        }
                    }
                    _ => Command::Unknown(input.to_string()),
                }
            }
        }
    }

    fn from_failed(input: &str) -> Command {
        match input.trim() {
            "r" => Command::Retry,
            "q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

pub fn cli_loop(store: &mut QuizStore) -> Result<(), Error> {
    loop {
        store.load();

        let command = match Screen::of(store.state()) {
            Screen::Loading => {
                println!("{}", "Loading questions...".cyan());
                Command::Wait
            }
            Screen::Failed(message) => {
                println!("{}", message.bright_red());
                Command::from_failed(&prompt("(r to retry, q to quit):")?)
            }
            Screen::Empty => {
                println!("{}", "The quiz came back without questions.".yellow());
                match prompt("(r to start a new quiz, q to quit):")?.trim() {
                    "r" => Command::NewQuiz,
                    "q" => Command::Quit,
                    other => Command::Unknown(other.to_string()),
                }
            }
            Screen::Quiz(view) => {
                draw_question(&view);
                Command::from_view(&view, &prompt(&hint(&view))?)
            }
        };
        debug!("command: {:?}", command);

        match command {
            Command::Toggle {
                question_id,
                answer_id,
            } => store.select_answer(&question_id, &answer_id),
            Command::Goto(index) => {
                if index >= store.state().questions.len() {
                    println!("{}", "There is no such question!".bright_red());
                }
                store.set_current_question(index)
            }
            Command::Submit => store.submit_quiz(),
            Command::NewQuiz => store.reset_quiz(),
            Command::Retry => store.retry(),
            Command::Wait => {
                if !store.wait(FETCH_WAIT) {
                    println!("{}", "Still waiting for questions...".yellow());
                }
            }
            Command::Quit => {
                println!("{}", "Quitting! Your progress is saved.".cyan());
                return Ok(());
            }
            Command::Unknown(input) => {
                println!("{}", format!("Unknown command {:?}.", input).bright_red())
            }
        }
    }
}

fn prompt(text: &str) -> Result<String, Error> {
    print!("{} ", text.cyan());
    std::io::stdout().flush()?;
    let input: Result<String, _> = try_read!("{}\n");
    // Closed stdin ends the session like `q`.
    Ok(input.unwrap_or_else(|_| "q".to_string()))
}

fn hint(view: &QuizView) -> String {
    let mut parts = Vec::new();
    if view.answers_enabled && !view.answers.is_empty() {
        parts.push(format!("1-{} toggle", view.answers.len()));
    }
    if view.can_go_previous {
        parts.push("p previous".to_string());
    }
    if view.can_go_next {
        parts.push("n next".to_string());
    }
    parts.push("g <n> jump".to_string());
    if view.show_submit {
        parts.push("s submit".to_string());
    }
    if view.show_new_quiz {
        parts.push("r new quiz".to_string());
    }
    parts.push("q quit".to_string());
    format!("({}):", parts.join(", "))
}

fn draw_question(view: &QuizView) {
    let leading = format!("{}/{}. ", view.position, view.total);
    println!(
        "{}",
        format!("==========> {} <==========", QUIZ_TITLE).cyan()
    );
    println!(
        "{} {}",
        bar(view.progress, PROGRESS_WIDTH).blue(),
        format!("{:.0}%", view.progress).blue()
    );
    println!(
        "{}{}",
        leading.cyan(),
        view.question.question.black().bold().on_white()
    );

    let indent = " ".repeat(leading.len());
    for (i, row) in view.answers.iter().enumerate() {
        let bullet = if row.selected { "●" } else { "○" };
        let line = format!("{}{}. {} {}", indent, i + 1, bullet, row.text);
        match row.mark {
            Mark::Correct => println!("{} {}", line.green(), "✔".green()),
            Mark::Incorrect => println!("{} {}", line.red(), "✘".red()),
            Mark::None if row.selected => println!("{}", line.bold()),
            Mark::None => println!("{}", line),
        }
    }

    if let Some(explanation) = view.explanation {
        println!("{}{}", indent, explanation.italic());
    }
    if let Some(score) = view.score {
        draw_chart(score);
    }
}

fn draw_chart(score: f64) {
    println!("{}", "Quiz Score".bold());
    println!(
        "{:>5.1} |{}| {}",
        score,
        bar(score, CHART_WIDTH).bright_blue(),
        CHART_MAX
    );
}

fn bar(value: f64, width: usize) -> String {
    let filled = ((value / CHART_MAX) * width as f64).round().clamp(0.0, width as f64) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libshiken::joutai::{Action, QuizState};
    use crate::libshiken::shitsumon::tests::capital_question;

    fn loaded() -> QuizState {
        QuizState::default()
            .apply(Action::FetchStarted)
            .apply(Action::FetchSucceeded(vec![
                capital_question("1"),
                capital_question("2"),
            ]))
    }

    #[test]
    fn numbers_toggle_visible_answers() {
        let state = loaded();
        let view = QuizView::of(&state).unwrap();
        assert_eq!(
            Command::from_view(&view, "2"),
            Command::Toggle {
                question_id: "1".to_string(),
                answer_id: "answer_b".to_string()
            }
        );
        assert_eq!(Command::from_view(&view, "3"), Command::Unknown("3".into()));
        assert_eq!(Command::from_view(&view, "0"), Command::Unknown("0".into()));
    }

    #[test]
    fn navigation_respects_gating() {
        let state = loaded();
        let first = QuizView::of(&state).unwrap();
        assert_eq!(Command::from_view(&first, "n"), Command::Goto(1));
        assert_eq!(Command::from_view(&first, "p"), Command::Unknown("p".into()));
        assert_eq!(Command::from_view(&first, "s"), Command::Unknown("s".into()));
        assert_eq!(Command::from_view(&first, "g 2"), Command::Goto(1));

        let state = state.apply(Action::SetCurrentQuestion(1));
        let last = QuizView::of(&state).unwrap();
        assert_eq!(Command::from_view(&last, "p"), Command::Goto(0));
        assert_eq!(Command::from_view(&last, "n"), Command::Unknown("n".into()));
        assert_eq!(Command::from_view(&last, "s"), Command::Submit);
    }

    #[test]
    fn submitted_quiz_only_offers_new_quiz() {
        let state = loaded()
            .apply(Action::SetCurrentQuestion(1))
            .apply(Action::SubmitQuiz);
        let view = QuizView::of(&state).unwrap();
        assert_eq!(Command::from_view(&view, "r"), Command::NewQuiz);
        assert_eq!(Command::from_view(&view, "1"), Command::Unknown("1".into()));
        assert_eq!(Command::from_view(&view, "s"), Command::Unknown("s".into()));
    }

    #[test]
    fn failed_screen_commands() {
        assert_eq!(Command::from_failed("r\n"), Command::Retry);
        assert_eq!(Command::from_failed("q"), Command::Quit);
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar(50.0, 4), "██░░");
        assert_eq!(bar(0.0, 4), "░░░░");
        assert_eq!(bar(100.0, 4), "████");
    }
}
