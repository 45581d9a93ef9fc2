//! Scripted reasoning service for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::reasoning::{ReasoningRequest, ReasoningService, NONE_TOKEN};
use crate::sources::SourceError;

/// Replies with a fixed script, one entry per call, then [`NONE_TOKEN`]
#[derive(Debug, Default)]
pub struct MockReasoning {
    replies: Mutex<VecDeque<String>>,
    failing: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl MockReasoning {
    pub fn replying(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
            ..Self::default()
        }
    }

    /// Every call fails with a server error
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ReasoningService for MockReasoning {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        if self.failing {
            return Err(SourceError::Api {
                status: 500,
                message: "mock reasoning failure".to_string(),
            });
        }

        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        Ok(replies.pop_front().unwrap_or_else(|| NONE_TOKEN.to_string()))
    }
}
