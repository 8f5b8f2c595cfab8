pub mod comment_stats;
pub mod comments;
pub mod descriptions;
pub mod extraction;
pub mod generator;
pub mod image_store;
pub mod images;
pub mod llm;
