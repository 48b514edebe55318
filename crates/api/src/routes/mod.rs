pub mod forecasts;
pub mod health;
pub mod reference;

pub use forecasts::*;
pub use health::*;
pub use reference::*;
