//! Database models split into domain-specific modules.

pub mod common;
pub mod driver_log;
pub mod hos_summary;
pub mod stop;
pub mod trip;
pub mod user;

pub use common::*;
pub use driver_log::*;
pub use hos_summary::*;
pub use stop::*;
pub use trip::*;
pub use user::*;
