// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod board;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod pattern;
pub mod runtime;
pub mod session;
pub mod store;

pub use error::{PatlockError, Result};
pub use pattern::{Classification, Dot, Pattern, PatternKey, TOTAL_PATTERNS};
pub use session::{Confirmation, Outcome, Phase, Session, SessionConfig, Stats};
pub use store::{FileStorage, MemoryStorage, PatternStorage, RejectedSet, RejectedStore};
