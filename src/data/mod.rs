pub mod demo;
pub mod file_store;
pub mod memory;
pub mod store;
