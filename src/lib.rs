#![allow(
    clippy::collapsible_else_if,
    clippy::collapsible_if,
    clippy::module_inception
)]
#![deny(
    clippy::get_unwrap,
    clippy::panic,
    clippy::print_stdout,
    clippy::unwrap_used,
    clippy::use_debug
)]

pub mod acl;
pub mod config;
pub mod lock;
pub mod logger;
pub mod manifest;
pub mod principal;
pub mod sandbox;
pub mod util;
