//! Recording HTTP verb.
//!
//! # Usage
//!
//! ```rust,ignore
//! let post = RecordingHttpVerb::new(HttpMethod::Post);
//! post.respond_with(HttpResponse::new(202, Vec::new()));
//! // ... exercise code that posts ...
//! assert_eq!(post.call_count(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use hermetic_domain::BindingKind;

use crate::infrastructure::ports::{
    HttpError, HttpMethod, HttpRequest, HttpResponse, HttpVerbPort,
};

/// Stand-in for one HTTP verb.
///
/// Returns queued responses in FIFO order, then the default response once
/// the queue is empty.
pub struct RecordingHttpVerb {
    method: HttpMethod,
    calls: Mutex<Vec<HttpRequest>>,
    queued: Mutex<VecDeque<Result<HttpResponse, String>>>,
    default_response: Mutex<HttpResponse>,
    call_count: AtomicUsize,
}

impl RecordingHttpVerb {
    /// A substitute answering `200` with an empty body.
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            calls: Mutex::new(Vec::new()),
            queued: Mutex::new(VecDeque::new()),
            default_response: Mutex::new(HttpResponse::ok(Vec::new())),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Queue a response for the next unanswered call.
    pub fn respond_with(&self, response: HttpResponse) {
        lock(&self.queued).push_back(Ok(response));
    }

    /// Queue a transport failure for the next unanswered call.
    pub fn fail_with(&self, message: impl Into<String>) {
        lock(&self.queued).push_back(Err(message.into()));
    }

    /// Replace the response used once the queue is drained.
    pub fn set_default_response(&self, response: HttpResponse) {
        *lock(&self.default_response) = response;
    }

    /// Get the number of send calls made.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        lock(&self.calls).clone()
    }

    pub fn last_call(&self) -> Option<HttpRequest> {
        lock(&self.calls).last().cloned()
    }

    /// Forget recorded calls and queued responses.
    pub fn reset(&self) {
        lock(&self.calls).clear();
        lock(&self.queued).clear();
        self.call_count.store(0, Ordering::Relaxed);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panicking test must not poison the double for the rest of the suite.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl HttpVerbPort for RecordingHttpVerb {
    fn method(&self) -> HttpMethod {
        self.method
    }

    fn kind(&self) -> BindingKind {
        BindingKind::Substitute
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        if request.method != self.method {
            return Err(HttpError::MethodMismatch {
                bound: self.method,
                requested: request.method,
            });
        }

        self.call_count.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(method = %self.method, url = %request.url, "Recorded substitute HTTP call");
        lock(&self.calls).push(request);

        match lock(&self.queued).pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(HttpError::RequestFailed(message)),
            None => Ok(lock(&self.default_response).clone()),
        }
    }
}
