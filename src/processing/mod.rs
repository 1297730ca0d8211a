pub mod append_policy;
pub mod statistics;
pub mod window;
