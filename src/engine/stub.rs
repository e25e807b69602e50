use tokio::sync::mpsc::UnboundedReceiver;

use crate::types::{CheckRun, Revision};

use super::interface::{Engine, EngineHandle, Event, Request};

/// A stub engine that serves pre-loaded fixture data without any network calls.
///
/// Useful for integration tests and demos that must not require a `GITHUB_TOKEN`.
pub struct StubEngine {
    pub revision: Option<Revision>,
    pub checks: Vec<CheckRun>,
}

impl Engine for StubEngine {
    fn start(self) -> EngineHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Request>();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().expect("stub tokio runtime");
            rt.block_on(self.run_loop(rx));
        });
        EngineHandle::new(tx)
    }
}

impl StubEngine {
    async fn run_loop(self, mut rx: UnboundedReceiver<Request>) {
        while let Some(req) = rx.recv().await {
            match req {
                Request::FetchRevision {
                    number, reply_tx, ..
                } => {
                    let event = match &self.revision {
                        Some(revision) if revision.pull_request.number == number => {
                            Event::RevisionFetched {
                                revision: revision.clone(),
                                checks: self.checks.clone(),
                            }
                        }
                        _ => Event::FetchError {
                            context: "stub".into(),
                            message: format!("no pull request #{number} in stub"),
                        },
                    };
                    let _ = reply_tx.send(event);
                }

                // Re-runs succeed instantly
                Request::RerequestCheckSuites {
                    check_suite_ids,
                    reply_tx,
                    ..
                } => {
                    let _ = reply_tx.send(Event::MutationOk {
                        description: format!("stub re-run of {} suite(s)", check_suite_ids.len()),
                    });
                }

                Request::Shutdown => break,
            }
        }
    }
}
