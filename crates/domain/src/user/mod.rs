pub mod repository;
pub mod service;

pub use repository::{PostgresUserRepository, UserRepository};
pub use service::UserService;
