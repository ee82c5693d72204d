// src/state.rs

use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    placement::{
        advisor::{DifficultyAdvisor, ScoreBands},
        classifier::LevelClassifier,
        completion::TextCompletion,
        composer::LearningPathComposer,
        question_bank::QuestionBank,
        recommender::CourseRecommender,
        session::QuizSessionStore,
    },
    repository::{CourseCatalog, PlacementRepository},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub bank: Arc<QuestionBank>,
    pub sessions: Arc<QuizSessionStore>,
    pub advisor: Arc<DifficultyAdvisor>,
    pub classifier: Arc<LevelClassifier>,
    pub recommender: Arc<CourseRecommender>,
    pub composer: Arc<LearningPathComposer>,
    pub placements: Arc<dyn PlacementRepository>,
}

impl AppState {
    /// Wires the engine around its collaborators. A missing or unreadable
    /// question bank leaves the bank empty, so every quiz is synthesized.
    pub fn new(
        config: Config,
        catalog: Arc<dyn CourseCatalog>,
        placements: Arc<dyn PlacementRepository>,
        completion: Option<Arc<dyn TextCompletion>>,
    ) -> Self {
        let bank = match QuestionBank::from_file(&config.question_bank_path) {
            Ok(bank) => {
                tracing::info!("Loaded {} curated questions", bank.len());
                bank
            }
            Err(e) => {
                tracing::warn!("{}; synthesizing all questions", e);
                QuestionBank::default()
            }
        };

        let bands = ScoreBands {
            advanced: config.advanced_band,
            intermediate: config.intermediate_band,
        };

        Self {
            bank: Arc::new(bank),
            sessions: Arc::new(QuizSessionStore::new(Duration::from_secs(config.session_ttl_secs))),
            advisor: Arc::new(DifficultyAdvisor::new(
                placements.clone(),
                config.history_window,
                bands,
            )),
            classifier: Arc::new(LevelClassifier::from_path(config.level_model_path.clone())),
            recommender: Arc::new(CourseRecommender::new(catalog)),
            composer: Arc::new(LearningPathComposer::new(
                completion,
                Duration::from_millis(config.completion_timeout_ms),
            )),
            placements,
            config,
        }
    }
}
