mod generate;
mod health;

pub use generate::generate_uuid;
pub use health::{health_check, readiness_check};
