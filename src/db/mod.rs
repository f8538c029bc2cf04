pub mod connection;
pub mod filters;
pub mod models;
pub mod repositories;

pub use connection::*;
pub use models::*;
pub use repositories::*;
