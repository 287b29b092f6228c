// mazenav_core/src/lib.rs

// This file defines the public modules of the library.
pub mod analysis;
pub mod config;
pub mod error;
pub mod estimation;
pub mod models;
pub mod prelude;
pub mod robot;
pub mod types;
pub mod utils;
pub mod world;
