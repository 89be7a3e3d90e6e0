pub mod backend;
pub mod bench;
pub mod conf;
pub mod connection;
pub mod core;
pub mod dataset;
pub mod loader;
pub mod report;
pub mod service;

#[cfg(feature = "testutil")]
pub mod testutil;
