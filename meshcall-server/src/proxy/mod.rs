mod handlers;
mod proxy_client;
mod proxy_error;

pub use handlers::*;
pub use proxy_client::*;
pub use proxy_error::*;
