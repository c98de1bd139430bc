//! Exit codes for the CLI.
//!
//! These follow common Unix conventions and provide meaningful
//! status information for scripting and supervisors.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Configuration file or command-line usage error
pub const CONFIG_ERROR: u8 = 2;

/// The listening socket could not be bound
pub const BIND_FAILED: u8 = 3;
