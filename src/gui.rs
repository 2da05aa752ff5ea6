use crate::libshiken::joutai::FetchStatus;
use crate::libshiken::store::QuizStore;
use crate::libshiken::view::{Mark, QuizView, Screen, CHART_MAX, QUIZ_TITLE};
use crate::Error;
use eframe::egui;
use eframe::egui::{
    Align, Align2, Color32, FontId, Layout, Pos2, ProgressBar, Rect, RichText, Sense, Stroke, Ui,
    Vec2,
};
use log::debug;
use std::time::Duration;

const BAR_COLOR: Color32 = Color32::from_rgb(0x18, 0x90, 0xff);
const CHART_SIZE: Vec2 = Vec2::new(350.0, 250.0);

#[derive(Debug)]
enum Intent {
    Start,
    Select { question_id: String, answer_id: String },
    Goto(usize),
    Submit,
    NewQuiz,
    Retry,
}

struct GuiState {
    store: QuizStore,
    started: bool,
}

impl GuiState {
    fn new(store: QuizStore) -> Self {
        // A resumed session skips the welcome screen.
        let started = store.state().status != FetchStatus::NotStarted;
        Self { store, started }
    }

    fn apply(&mut self, intent: Intent) {
        debug!("intent: {:?}", intent);
        match intent {
            Intent::Start => {
                self.started = true;
                self.store.load();
            }
            Intent::Select {
                question_id,
                answer_id,
            } => self.store.select_answer(&question_id, &answer_id),
            Intent::Goto(index) => self.store.set_current_question(index),
            Intent::Submit => self.store.submit_quiz(),
            Intent::NewQuiz => {
                self.store.reset_quiz();
                self.store.load();
            }
            Intent::Retry => self.store.retry(),
        }
    }
}

fn draw_welcome(ui: &mut Ui, intent: &mut Option<Intent>) {
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() / 4.0);
        ui.heading(RichText::new("Welcome to the Ultimate Quiz Challenge").size(32.0));
        ui.add_space(8.0);
        ui.label("Test your knowledge across a variety of categories. Click below to begin!");
        ui.add_space(24.0);
        if ui
            .button(RichText::new("Start Quiz ➡").size(20.0))
            .clicked()
        {
            *intent = Some(Intent::Start);
        }
    });
}

fn draw_loading(ui: &mut Ui) {
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() / 3.0);
        ui.spinner();
        ui.label("Loading questions...");
    });
}

fn draw_failed(ui: &mut Ui, message: &str, intent: &mut Option<Intent>) {
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() / 3.0);
        ui.label(RichText::new(message).color(Color32::LIGHT_RED));
        if ui.button("Retry").clicked() {
            *intent = Some(Intent::Retry);
        }
    });
}

fn draw_quiz(ui: &mut Ui, view: &QuizView, intent: &mut Option<Intent>) {
    ui.horizontal(|ui| {
        ui.heading(QUIZ_TITLE);
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            ui.label(format!("Question {} of {}", view.position, view.total));
        });
    });
    ui.add(
        ProgressBar::new((view.progress / 100.0) as f32)
            .show_percentage()
            .animate(!view.show_new_quiz),
    );
    ui.add_space(12.0);

    ui.label(RichText::new(&view.question.question).size(18.0).strong());
    ui.add_space(8.0);
    for row in &view.answers {
        let text = match row.mark {
            Mark::Correct => RichText::new(format!("{}  ✔", row.text)).color(Color32::GREEN),
            Mark::Incorrect => RichText::new(row.text).color(Color32::LIGHT_RED),
            Mark::None => RichText::new(row.text),
        };
        let button = egui::Button::new(text)
            .selected(row.selected)
            .min_size(Vec2::new(ui.available_width(), 32.0));
        if ui.add_enabled(view.answers_enabled, button).clicked() {
            *intent = Some(Intent::Select {
                question_id: view.question.id.clone(),
                answer_id: row.slot.to_string(),
            });
        }
    }

    if let Some(explanation) = view.explanation {
        ui.add_space(8.0);
        ui.label(RichText::new(explanation).italics());
    }

    if let Some(score) = view.score {
        ui.add_space(12.0);
        ui.vertical_centered(|ui| draw_chart(ui, score));
    }

    ui.add_space(16.0);
    ui.horizontal(|ui| {
        let index = view.position - 1;
        if ui
            .add_enabled(view.can_go_previous, egui::Button::new("◀ Previous"))
            .clicked()
        {
            *intent = Some(Intent::Goto(index - 1));
        }
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if view.show_new_quiz {
                if ui.button("Start a new quiz").clicked() {
                    *intent = Some(Intent::NewQuiz);
                }
            } else if view.show_submit {
                if ui.button("Submit Quiz").clicked() {
                    *intent = Some(Intent::Submit);
                }
            } else if ui
                .add_enabled(view.can_go_next, egui::Button::new("Next ▶"))
                .clicked()
            {
                *intent = Some(Intent::Goto(index + 1));
            }
        });
    });
}

fn draw_chart(ui: &mut Ui, score: f64) {
    let (response, painter) = ui.allocate_painter(CHART_SIZE, Sense::hover());
    let rect = response.rect;
    let plot = Rect::from_min_max(
        Pos2::new(rect.left() + 36.0, rect.top() + 8.0),
        Pos2::new(rect.right() - 8.0, rect.bottom() - 24.0),
    );
    let text_color = ui.visuals().text_color();
    let grid = Stroke::new(1.0, ui.visuals().weak_text_color());
    let y_of = |value: f64| plot.bottom() - (value / CHART_MAX) as f32 * plot.height();

    for tick in [0.0, 25.0, 50.0, 75.0, 100.0] {
        let y = y_of(tick);
        painter.line_segment([Pos2::new(plot.left(), y), Pos2::new(plot.right(), y)], grid);
        painter.text(
            Pos2::new(plot.left() - 4.0, y),
            Align2::RIGHT_CENTER,
            format!("{tick:.0}"),
            FontId::proportional(11.0),
            text_color,
        );
    }

    let bar_width = plot.width() / 3.0;
    let bar = Rect::from_min_max(
        Pos2::new(plot.center().x - bar_width / 2.0, y_of(score.clamp(0.0, CHART_MAX))),
        Pos2::new(plot.center().x + bar_width / 2.0, plot.bottom()),
    );
    painter.rect_filled(bar, 0.0, BAR_COLOR);
    painter.text(
        Pos2::new(plot.center().x, plot.bottom() + 4.0),
        Align2::CENTER_TOP,
        "Quiz Score",
        FontId::proportional(12.0),
        text_color,
    );
    let _ = response.on_hover_text(format!("score: {score:.0}"));
}

impl eframe::App for GuiState {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.store.poll();
        if self.started {
            self.store.load();
        }
        if self.store.state().status == FetchStatus::Loading {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        let mut intent = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.started {
                draw_welcome(ui, &mut intent);
                return;
            }
            egui::ScrollArea::vertical().show(ui, |ui| match Screen::of(self.store.state()) {
                Screen::Loading => draw_loading(ui),
                Screen::Failed(message) => draw_failed(ui, message, &mut intent),
                Screen::Empty => {
                    ui.label("The quiz came back without questions.");
                    if ui.button("Start a new quiz").clicked() {
                        intent = Some(Intent::NewQuiz);
                    }
                }
                Screen::Quiz(view) => draw_quiz(ui, &view, &mut intent),
            });
        });

        if let Some(intent) = intent {
            self.apply(intent);
        }
    }
}

pub fn init_gui(store: QuizStore) -> Result<(), Error> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 720.0])
            .with_min_inner_size([400.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "試験しよう!",
        native_options,
        Box::new(move |_cc| Ok(Box::new(GuiState::new(store)))),
    )?;

    Ok(())
}
