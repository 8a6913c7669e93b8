use std::sync::Arc;

use crate::observability::Metrics;
use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        let metrics = pipeline.metrics().clone();
        Self {
            pipeline: Arc::new(pipeline),
            metrics,
        }
    }
}
