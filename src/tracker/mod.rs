mod controller;
mod state;

pub use controller::{TrackerController, TrackerSnapshot};
pub use state::{DetectorStatus, TickEffect, TrackerState};
