pub mod config;
pub mod logging;

pub mod catalog;
pub mod checksum;
pub mod control;
pub mod encoder;
pub mod error;
pub mod resume_store;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
