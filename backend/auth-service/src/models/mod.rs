/// Data models for authentication
pub mod user;

pub use user::{Account, LoginRequest, LoginResponse, NewAccount, RegisterRequest, UserProfile};
