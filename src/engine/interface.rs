use std::sync::mpsc::Sender;

use crate::types::{CheckRun, GitHubRepository, Revision};

/// Handle to the backend engine held by the host application.
///
/// Cheaply cloneable. When the last handle is dropped the sender channel
/// closes, signalling the engine to shut down.
#[derive(Clone)]
pub struct EngineHandle {
    tx: tokio::sync::mpsc::UnboundedSender<Request>,
}

impl EngineHandle {
    pub(super) fn new(tx: tokio::sync::mpsc::UnboundedSender<Request>) -> Self {
        Self { tx }
    }

    /// Send a request to the engine. Non-blocking; returns immediately.
    pub fn send(&self, req: Request) {
        // Ignore errors: if the receiver is gone the engine has already shut down.
        let _ = self.tx.send(req);
    }
}

/// Trait implemented by both `GitHubEngine` and `StubEngine`.
pub trait Engine: Send + 'static {
    fn start(self) -> EngineHandle;
}

/// All operations the host can send to the engine.
pub enum Request {
    /// Load the pull request, its head commit and the commit's check runs.
    FetchRevision {
        repository: GitHubRepository,
        number: u64,
        reply_tx: Sender<Event>,
    },
    /// Re-run every check of the given check suites.
    RerequestCheckSuites {
        repository: GitHubRepository,
        check_suite_ids: Vec<u64>,
        reply_tx: Sender<Event>,
    },
    Shutdown,
}

/// All events the engine can push back to the host.
pub enum Event {
    RevisionFetched {
        revision: Revision,
        checks: Vec<CheckRun>,
    },
    /// Unified error event for all fetch failures.
    FetchError {
        context: String,
        message: String,
    },
    MutationOk {
        description: String,
    },
    MutationError {
        description: String,
        message: String,
    },
}
