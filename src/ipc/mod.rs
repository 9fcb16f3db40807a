mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use handlers::draft::{drain_autosave, flush_due_autosave};
pub use router::handle_request;
pub use types::{AppState, Request};
