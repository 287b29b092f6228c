// mazenav_core/src/utils/mod.rs

pub mod noise;
