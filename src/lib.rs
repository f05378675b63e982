pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod external;
pub mod server;
pub mod service;
pub mod telemetry;
