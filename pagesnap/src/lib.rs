// The handler functions live in handlers.rs so integration tests can
// exercise them without going through the binary.
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{error_payload, parse_target_url, render_outcome, write_output};
