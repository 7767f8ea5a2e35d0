pub mod badge_repository;
pub mod practice_repository;
pub mod session_repository;
pub mod streak_repository;
