#![no_std]
//! Hardware agnostic parts of the M5Stack ATOM web monitor and tilt game.

pub mod button;
pub mod cli;
pub mod connectivity;
pub mod env_monitor;
pub mod flash;
pub mod http;
pub mod i2c_scan;
pub mod matrix;
pub mod running_average;
pub mod status_led;
pub mod system_settings;
pub mod tilt_game;
