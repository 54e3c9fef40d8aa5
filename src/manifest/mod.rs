mod store;
mod structs;

pub use store::*;
pub use structs::*;
