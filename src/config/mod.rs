pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{load_config, load_config_from};
pub use models::*;
pub use validation::{ConfigValidator, ValidationError, ValidationResult};
