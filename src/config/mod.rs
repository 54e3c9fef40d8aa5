pub mod cli;
mod structs;

pub use structs::*;
