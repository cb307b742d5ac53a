/// Business logic services
pub mod session;

pub use session::{SessionConfig, SessionService};
