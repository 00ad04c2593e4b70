pub mod client;
pub mod figure;
pub mod server;
pub mod service;
