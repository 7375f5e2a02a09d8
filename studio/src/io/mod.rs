//! I/O helpers for studio commands.

pub mod config;
pub mod fs;
pub mod index_store;
pub mod instructions;
pub mod listing;
pub mod paths;
pub mod reclaim;
pub mod registry;
pub mod roles;
pub mod scope_config;
