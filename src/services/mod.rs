pub mod analysis_pipeline;
pub mod audio_analyzer;
pub mod collaborators;
pub mod composite_scorer;
pub mod feature_extractor;
pub mod feedback_composer;
pub mod plan_service;
pub mod progress_service;
pub mod recording_fetcher;
pub mod reward_service;
pub mod session_service;
pub mod settings_service;
pub mod signal_aggregator;
pub mod visual_classifier;
