mod config;
mod coordinator;
mod detection;
mod error;
mod orchestrator;
mod signaling;
mod transport;

pub use config::*;
pub use coordinator::*;
pub use detection::*;
pub use error::*;
pub use orchestrator::*;
pub use signaling::*;
pub use transport::*;
