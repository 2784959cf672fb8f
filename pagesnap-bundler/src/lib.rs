pub mod css;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod resolver;
pub mod result;
pub mod snapshot;
pub mod variables;

pub use error::SnapshotError;
pub use result::PageSnapshot;
pub use snapshot::{ImportMode, Snapshotter};
pub use variables::VariableScope;
