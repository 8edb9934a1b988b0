use std::sync::Arc;

use crate::{
    db::CatalogueStore,
    services::{RecommendationEngine, SummaryProvider},
};

/// Shared application state handed to every handler
pub struct AppState {
    pub catalogue: Arc<dyn CatalogueStore>,
    /// Generates summaries for newly created books, one provider call per book
    pub summaries: Arc<dyn SummaryProvider>,
    /// Serves `/generate-summary`; may reuse earlier generations
    pub generator: Arc<dyn SummaryProvider>,
    pub engine: Arc<RecommendationEngine>,
}

impl AppState {
    pub fn new(
        catalogue: Arc<dyn CatalogueStore>,
        summaries: Arc<dyn SummaryProvider>,
        engine: Arc<RecommendationEngine>,
    ) -> Self {
        Self {
            catalogue,
            generator: summaries.clone(),
            summaries,
            engine,
        }
    }

    /// Uses a separate provider for free-form generation
    pub fn with_generator(mut self, generator: Arc<dyn SummaryProvider>) -> Self {
        self.generator = generator;
        self
    }
}
