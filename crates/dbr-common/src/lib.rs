//! DbRoles shared runtime plumbing.

pub mod logging;

pub use logging::init_logging;
