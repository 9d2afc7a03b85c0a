pub mod config;
pub mod consts;
pub mod error;
pub mod integration;
pub mod kernel;
pub mod services;

pub use integration::Integration;
pub use kernel::coordinator::{DecisionCoordinator, GreetingOutcome};
