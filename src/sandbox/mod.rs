mod cleanup;
mod create;
mod elevate;
mod get;
mod remove;
mod run;
mod sandbox_struct;

pub use cleanup::*;
pub use elevate::*;
pub use get::*;
pub use run::*;
pub use sandbox_struct::*;
