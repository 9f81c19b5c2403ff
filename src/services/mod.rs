pub mod catalog;
pub mod friends;
pub mod library;
pub mod quotes;
pub mod recommendations;
pub mod reviews;
pub mod scheduler;
pub mod stats;
pub mod users;

pub use recommendations::RecommendationEngine;
pub use scheduler::RecommendationScheduler;
