//! Single delivery attempt to the incident backend.
//!
//! Retries belong to the workflow's dispatch step, which persists its attempt
//! count between tries.

use std::sync::Arc;

use tracing::debug;
use upstream::IncidentSink;

use crate::error::DispatchError;
use crate::models::AlertPayload;

pub struct AlertDispatcher {
    sink: Arc<dyn IncidentSink>,
}

impl AlertDispatcher {
    pub fn new(sink: Arc<dyn IncidentSink>) -> Self {
        Self { sink }
    }

    pub async fn send(&self, payload: &AlertPayload) -> Result<(), DispatchError> {
        self.sink.enqueue(payload).await?;
        debug!(
            dedup_key = %payload.dedup_key,
            action = %payload.event_action,
            severity = %payload.payload.severity,
            "alert delivered"
        );
        Ok(())
    }
}
