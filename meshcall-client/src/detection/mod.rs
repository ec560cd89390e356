mod detection_client;
mod detection_poller;

pub use detection_client::*;
pub use detection_poller::*;
