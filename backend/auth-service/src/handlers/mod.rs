/// HTTP request handlers (REST API)
pub mod auth;
pub mod health;
pub mod profile;

pub use auth::{login, logout, register, LogoutResponse, RegisterResponse};
pub use health::health_check;
pub use profile::get_profile;
