// mazenav_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the mazenav_sim crate.
pub mod prelude;

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod prng;
pub mod runner;
