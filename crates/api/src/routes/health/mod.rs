pub mod health_routes;

pub use health_routes::*;
