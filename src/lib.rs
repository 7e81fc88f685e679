pub mod config;
pub mod modules;
pub mod services;

pub use modules::auth::interface::{AuthError, RepoError};
pub use modules::auth::service::AuthService;
