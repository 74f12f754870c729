//! Manual test clients for the farm backend: a pump that prints the control
//! commands it receives and a one-shot sensor that publishes a single payload.

pub mod control;
pub mod sample;
