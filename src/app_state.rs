use std::sync::Arc;

use crate::services::{generator::ImageGenerator, image_store::ImageStore, llm::ChatModel};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn ChatModel>,
    pub generator: Arc<ImageGenerator>,
    pub images: Arc<ImageStore>,
}

impl AppState {
    pub fn new(
        llm: impl ChatModel + 'static,
        generator: ImageGenerator,
        images: ImageStore,
    ) -> Self {
        Self {
            llm: Arc::new(llm),
            generator: Arc::new(generator),
            images: Arc::new(images),
        }
    }
}
