pub mod crud;
pub mod health;

pub use crud::{PageLimits, crud_router};
pub use health::health_handler;
