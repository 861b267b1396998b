pub mod body;
pub mod gateway;
pub mod health;
pub mod rewrite;

pub use body::{BodyError, ForwardBody};
pub use gateway::{GatewayService, RouteKind};
pub use health::HealthReport;
pub use rewrite::{Credentialing, RewriteError, rewrite_request};
