pub mod core {
    pub mod config;
    pub mod error;
    pub mod events;
    pub mod types;
}

pub mod engine {
    pub mod confirmer;
    pub mod executing_guard;
    pub mod wizard;
}

pub mod strategy {
    pub mod risk;
    pub mod sizing;
}

pub mod utils {
    pub mod helpers;
}

pub mod logger;
pub mod oracle;

pub use crate::core::{config, error, events, types};
pub use engine::{confirmer, executing_guard, wizard};
pub use strategy::{risk, sizing};
pub use utils::helpers;
