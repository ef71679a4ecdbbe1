//! teeencrypt library API
//!
//! Host side of a trusted-application text cipher: session handling, the
//! command parameter protocol, key files and output naming. The binary
//! interface is in main.rs.

pub mod cli;
pub mod commands;
pub mod dispatch;
pub mod emulated;
pub mod error;
pub mod fileio;
pub mod naming;
#[cfg(feature = "optee")]
pub mod optee;
pub mod session;
pub mod teec;

pub use dispatch::CommandService;
pub use error::Error;
pub use session::{BackendKind, Context, Session, TeeClient};
