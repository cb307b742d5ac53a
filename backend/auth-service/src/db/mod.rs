pub mod users;

pub use users::{AccountRepository, InMemoryAccountRepository};
