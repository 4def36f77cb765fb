#[macro_use]
extern crate lazy_static;

pub mod commands;
pub mod error;
#[macro_use]
pub mod logging;
pub mod flags;
pub mod matchengine;
pub mod region;
pub mod registers;
pub mod tracer;

pub use error::{EngineError, EngineResult};
