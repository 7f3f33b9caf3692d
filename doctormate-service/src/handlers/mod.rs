pub mod health;
pub mod skin;
pub mod symptoms;

pub use health::{health_check, metrics_handler, not_found, ENDPOINTS};
pub use skin::check_skin;
pub use symptoms::check_symptoms;
