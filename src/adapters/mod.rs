//! Concrete adapter implementations of the port traits.

#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod file_config_adapter;
