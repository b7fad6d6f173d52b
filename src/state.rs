use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    services::{AttemptService, ExamGenerator, GradingEngine, QuestionRepository, StatsAggregator},
    store::{ExamStore, QuestionStore, RecordStore, UserDirectory},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserDirectory>,
    pub questions: QuestionRepository,
    pub generator: ExamGenerator,
    pub attempts: AttemptService,
    pub stats: StatsAggregator,
}

impl AppState {
    /// Wires every service to one backing store.
    pub fn new<S>(store: Arc<S>, config: Config) -> Self
    where
        S: QuestionStore + ExamStore + RecordStore + UserDirectory + 'static,
    {
        let questions = QuestionRepository::new(store.clone());
        let generator = ExamGenerator::new(questions.clone(), store.clone());
        let grader = GradingEngine::new(store.clone());
        let attempts = AttemptService::new(store.clone(), store.clone(), grader);
        let stats = StatsAggregator::new(store.clone());

        Self {
            config,
            users: store,
            questions,
            generator,
            attempts,
            stats,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserDirectory> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for QuestionRepository {
    fn from_ref(state: &AppState) -> Self {
        state.questions.clone()
    }
}

impl FromRef<AppState> for ExamGenerator {
    fn from_ref(state: &AppState) -> Self {
        state.generator.clone()
    }
}

impl FromRef<AppState> for AttemptService {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}

impl FromRef<AppState> for StatsAggregator {
    fn from_ref(state: &AppState) -> Self {
        state.stats.clone()
    }
}
