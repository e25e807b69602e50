// checks module: failed-checks dialog state, loading pipeline and commands

mod cancel;
pub mod dialog;
mod host;
mod resolver;
pub mod state;
pub mod urls;

pub use cancel::CancellationGuard;
pub use dialog::{ChecksDialog, DEFAULT_RESOLVE_TIMEOUT, SwitchError};
pub use host::Host;
pub use resolver::{CheckResolver, ResolveError, ResolverFactory, align_to_ids};
pub use state::{ChecksSnapshot, LoadState, StepsView, initial_selection};
