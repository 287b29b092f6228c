// mazenav_core/src/models/mod.rs

pub mod collision;
pub mod dynamics;
pub mod measurement;
pub mod perception;
