//! Support code for the `cursor-install` binary.

pub mod logging;
