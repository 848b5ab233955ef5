pub mod api;
pub mod bookings;
pub mod committer;
pub mod config;
pub mod db;
pub mod engine;
pub mod entities;
pub mod error;
pub mod external;
pub mod ledger;
pub mod pricing;
pub mod server;
pub mod sessions;
