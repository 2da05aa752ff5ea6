use crate::libshiken::db::StateStorage;
use crate::libshiken::joutai::{Action, FetchStatus, QuizState};
use crate::libshiken::quizapi::QuestionSource;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(usize);

type Subscriber = Box<dyn FnMut(&QuizState)>;

/// A background fetch result, tagged with the session it was issued for.
type FetchEvent = (u64, Action);

/// Owns the quiz state. Every dispatched action goes through the reducer,
/// is mirrored to storage and then handed to subscribers.
pub struct QuizStore {
    state: QuizState,
    storage: Box<dyn StateStorage>,
    source: Arc<dyn QuestionSource>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: usize,
    // Bumped on reset so results of fetches from an earlier session are dropped.
    generation: u64,
    events_tx: Sender<FetchEvent>,
    events_rx: Receiver<FetchEvent>,
}

impl QuizStore {
    /// Resumes whatever the storage holds, or starts empty.
    pub fn new(storage: Box<dyn StateStorage>, source: Arc<dyn QuestionSource>) -> Self {
        let state = match storage.load() {
            Some(state) => {
                info!(
                    "[Store] Resuming session at question {} of {}",
                    state.current_question_index + 1,
                    state.questions.len()
                );
                state
            }
            None => QuizState::default(),
        };
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            state,
            storage,
            source,
            subscribers: Vec::new(),
            next_subscription: 0,
            generation: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&QuizState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    pub fn dispatch(&mut self, action: Action) {
        debug!("[Store] {:?}", ActionName(&action));
        let is_reset = matches!(action, Action::ResetQuiz);
        self.state = std::mem::take(&mut self.state).apply(action);

        let persisted = if is_reset {
            self.generation += 1;
            self.storage.clear()
        } else {
            self.storage.save(&self.state)
        };
        if let Err(err) = persisted {
            warn!("[Store] Could not mirror state to storage: {}", err);
        }

        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&self.state);
        }
    }

    /// Starts fetching questions unless a fetch already ran or is running.
    pub fn load(&mut self) {
        if self.state.status != FetchStatus::NotStarted {
            return;
        }
        self.dispatch(Action::FetchStarted);

        let source = Arc::clone(&self.source);
        let events = self.events_tx.clone();
        let generation = self.generation;
        thread::spawn(move || {
            let event = match source.fetch_questions() {
                Ok(questions) => Action::FetchSucceeded(questions),
                Err(err) => {
                    warn!("[Store] {}", err);
                    Action::FetchFailed(err.to_string())
                }
            };
            // The store may be gone by now.
            let _ = events.send((generation, event));
        });
    }

    pub fn retry(&mut self) {
        self.dispatch(Action::Retry);
        self.load();
    }

    pub fn set_current_question(&mut self, index: usize) {
        self.dispatch(Action::SetCurrentQuestion(index));
    }

    pub fn select_answer(&mut self, question_id: &str, answer_id: &str) {
        self.dispatch(Action::SelectAnswer {
            question_id: question_id.to_string(),
            answer_id: answer_id.to_string(),
        });
    }

    pub fn submit_quiz(&mut self) {
        self.dispatch(Action::SubmitQuiz);
    }

    pub fn reset_quiz(&mut self) {
        self.dispatch(Action::ResetQuiz);
    }

    /// Applies finished background events without blocking.
    /// Returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            changed |= self.accept(event);
        }
        changed
    }

    /// Blocks until one current background event arrives or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events_rx.recv_timeout(remaining) {
                Ok(event) => {
                    if self.accept(event) {
                        return true;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false
                }
            }
        }
    }

    fn accept(&mut self, (generation, event): FetchEvent) -> bool {
        if generation != self.generation {
            debug!(
                "[Store] Dropping {:?} from an earlier session",
                ActionName(&event)
            );
            return false;
        }
        self.dispatch(event);
        true
    }
}

// Keeps fetched question lists out of the logs.
struct ActionName<'a>(&'a Action);

impl std::fmt::Debug for ActionName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Action::FetchSucceeded(questions) => {
                write!(f, "FetchSucceeded({} questions)", questions.len())
            }
            other => write!(f, "{other:?}"),
        }
    }
}
