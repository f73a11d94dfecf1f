//! Multi-step operations shared by route handlers.

pub mod ai;
pub mod assistant;
pub mod mention;
pub mod webhook;
