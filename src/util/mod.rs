mod access;
mod chown;
mod id;
mod run_tool;
mod which;

pub use access::*;
pub use chown::*;
pub use id::*;
pub use run_tool::*;
pub use which::*;
