#![no_std]
//! esp-hal side of the ATOM firmwares. Every module wraps one piece of hardware into an
//! embassy task and hands the actual work to `atom-core`.

pub mod cli;
pub mod flash;
pub mod led_matrix;
pub mod network;
pub mod sensors;
pub mod tilt_game;
