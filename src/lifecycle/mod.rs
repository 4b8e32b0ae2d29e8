//! Generation lifecycle management

pub mod driver;
pub mod state;

pub use driver::LifecycleDriver;
pub use state::{Generation, GenerationState, Registry};
