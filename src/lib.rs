//! Battle Core - deterministic hex-grid tactical combat simulation

pub mod battle;
pub mod core;
