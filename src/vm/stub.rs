//! In-process VM stand-in for tests and local development.
//!
//! Responses and failures are programmed up front and replayed in FIFO
//! order, which makes transport-failure scenarios exactly reproducible.
//! With an empty queue the stub answers every call with an empty `Keep`.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::vm::client::{VmClient, VmError};
use crate::vm::types::{VmRequest, VmResponse};

/// Programmable fake VM.
#[derive(Debug, Default)]
pub struct StubVm {
    queue: RefCell<VecDeque<Result<VmResponse, VmError>>>,
    requests: RefCell<Vec<VmRequest>>,
    always_fail: RefCell<bool>,
}

impl StubVm {
    /// A stub that answers every call with an empty `Keep`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next call.
    pub fn push_response(&self, response: VmResponse) {
        self.queue.borrow_mut().push_back(Ok(response));
    }

    /// Queue a transport failure for the next call.
    pub fn push_failure(&self, error: VmError) {
        self.queue.borrow_mut().push_back(Err(error));
    }

    /// A stub whose every call fails as if the VM were unreachable after
    /// the full retry budget.
    pub fn unreachable() -> Self {
        let stub = Self::new();
        // The queue drains; unreachable() keeps failing via the marker.
        *stub.always_fail.borrow_mut() = true;
        stub
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<VmRequest> {
        self.requests.borrow().clone()
    }

    /// Number of calls served.
    pub fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl VmClient for StubVm {
    fn execute(&self, request: &VmRequest) -> Result<VmResponse, VmError> {
        self.requests.borrow_mut().push(request.clone());

        if *self.always_fail.borrow() {
            return Err(VmError::Unavailable {
                attempts: 1,
                last: "stub configured unreachable".to_string(),
            });
        }

        match self.queue.borrow_mut().pop_front() {
            Some(result) => result,
            None => Ok(VmResponse::keep(0, Vec::new(), Vec::new())),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
