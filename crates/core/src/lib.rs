#![forbid(unsafe_code)]

pub mod completion;
pub mod model;
pub mod navigation;
pub mod program;
pub mod progress;
pub mod quiz_gate;
pub mod state;
pub mod time;

pub use time::Clock;
