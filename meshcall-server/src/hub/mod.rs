mod hub;
mod hub_command;

pub use hub::*;
pub use hub_command::*;
