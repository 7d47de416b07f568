//! Credentials baked in by `build.rs` from `.env`

pub const SSID: &str = env!("WIFI_SSID");
pub const PASSWORD: &str = env!("WIFI_PASSWORD");
pub const BLYNK_AUTH_TOKEN: &str = env!("BLYNK_AUTH_TOKEN");
pub const BLYNK_HOST: &str = env!("BLYNK_HOST");
