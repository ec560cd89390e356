mod app;
mod config;
mod hub;
mod proxy;
mod registry;
mod relay;
mod signaling;

pub use app::*;
pub use config::*;
pub use hub::*;
pub use proxy::*;
pub use registry::*;
pub use relay::*;
pub use signaling::*;
