mod participant_registry;

pub use participant_registry::*;
