//! ESP32-S3 firmware-specific modules for airq
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: ADC and GPIO drivers, the DHT22 bit-banging driver, the Wi-Fi
//! link and the TCP transport for the dashboard.

#![no_std]

extern crate alloc;

pub mod dht22;
pub mod gas;
pub mod http;
pub mod wifi;
pub mod wifi_secrets;
