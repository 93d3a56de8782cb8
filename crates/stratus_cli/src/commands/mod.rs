//! CLI command implementations.

pub mod domain_name;
pub mod tags_diff;
pub mod wait_simulate;
