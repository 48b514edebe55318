pub mod reference_routes;

pub use reference_routes::*;
