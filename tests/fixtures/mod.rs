mod fixture_cli;
mod fixture_store;

#[allow(unused_imports)]
pub use fixture_cli::*;
#[allow(unused_imports)]
pub use fixture_store::*;
