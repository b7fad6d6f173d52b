// src/services/mod.rs

pub mod attempts;
pub mod generator;
pub mod grading;
pub mod question_repository;
pub mod stats;

pub use attempts::AttemptService;
pub use generator::ExamGenerator;
pub use grading::GradingEngine;
pub use question_repository::QuestionRepository;
pub use stats::StatsAggregator;
