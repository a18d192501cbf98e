//! Bindings that expose the metronome timing functions to a scripting host
//!
//! Values arrive already decoded as [`HostValue`]; errors leave as [`HostError`],
//! ready to be raised as script exceptions.

pub mod args;
pub mod error;
pub mod module;
pub mod value;

pub use args::Args;
pub use error::{HostError, HostErrorKind};
pub use module::{Arity, FunctionSpec, HostFunction, MODULE_NAME, MetronomeModule};
pub use value::HostValue;
