//! Hardware-independent core library for airq
//!
//! This crate contains all platform-agnostic logic for the airq air-quality
//! station: the CO2 estimator, the alert decision, the read cycle, interval
//! scheduling, connection retry, dashboard protocol formatting and the trait
//! definitions every hardware collaborator implements.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod alarm;
pub mod alert;
pub mod app_state;
pub mod config;
pub mod connection;
pub mod cycle;
pub mod dashboard;
pub mod estimator;
pub mod monitor;
pub mod reading;
pub mod sensors;
