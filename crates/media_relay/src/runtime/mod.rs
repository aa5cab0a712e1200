//! Runtime components for engine process management

pub mod process;
pub mod supervisor;

pub use process::*;
pub use supervisor::*;
