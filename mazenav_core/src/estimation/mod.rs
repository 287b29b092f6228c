// mazenav_core/src/estimation/mod.rs

pub mod filters;

pub use filters::ekf::ExtendedKalmanFilter;
