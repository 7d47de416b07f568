//! Injects network and dashboard secrets from `.env` at compile time.

use std::env;

/// Keys forwarded to the crate as `env!` values
const SECRET_KEYS: [&str; 4] = ["WIFI_SSID", "WIFI_PASSWORD", "BLYNK_AUTH_TOKEN", "BLYNK_HOST"];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in SECRET_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    let from_file: Vec<(String, String)> = match dotenvy::dotenv_iter() {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(_) => {
            println!("cargo:warning=No .env file found, see .env.example");
            Vec::new()
        }
    };

    for key in SECRET_KEYS {
        let value = env::var(key).ok().or_else(|| {
            from_file
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        });

        match value {
            Some(value) => println!("cargo:rustc-env={key}={value}"),
            None if key == "BLYNK_HOST" => println!("cargo:rustc-env={key}=blynk.cloud"),
            None => {
                println!("cargo:warning={key} is not set; the device will refuse to start");
                println!("cargo:rustc-env={key}=");
            }
        }
    }
}
