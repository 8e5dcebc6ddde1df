pub mod catalog;
pub mod config;
pub mod db;
pub mod dhcp;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::LeaseError;
pub use services::{LeaseOutcome, LeaseProcessor};
