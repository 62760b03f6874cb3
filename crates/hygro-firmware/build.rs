//! Bakes the deployment secrets from `.env` into the firmware image.

const REQUIRED: [&str; 3] = ["WIFI_SSID", "WIFI_PASSWORD", "API_KEY"];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in REQUIRED.iter().chain(["UNIT_NUMBER"].iter()) {
        println!("cargo:rerun-if-env-changed={key}");
    }

    if let Err(e) = dotenvy::dotenv() {
        println!("cargo:warning=no .env loaded ({e}); reading secrets from the environment");
    }

    for key in REQUIRED {
        let value = std::env::var(key).unwrap_or_else(|_| {
            println!("cargo:warning={key} is not set; the firmware will carry an empty value");
            String::new()
        });
        println!("cargo:rustc-env={key}={value}");
    }

    let unit = std::env::var("UNIT_NUMBER").unwrap_or_else(|_| String::from("1"));
    if unit.parse::<u8>().map_or(true, |u| u == 0) {
        panic!("UNIT_NUMBER must be between 1 and 255, got {unit:?}");
    }
    println!("cargo:rustc-env=UNIT_NUMBER={unit}");
}
