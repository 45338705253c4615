use std::env;
use std::fmt::Display;
use std::str::FromStr;

use log::warn;

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub token_secret: String,
    pub client_url: String,
    pub production: bool,
}

impl Config {
    pub fn load() -> Self {
        let production = env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        let token_secret = match env::var("ACCESS_TOKEN_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("ACCESS_TOKEN_SECRET not set, using an insecure development secret");
                "insecure-dev-secret".to_string()
            }
        };

        Self {
            port: try_load("PORT", "8000"),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "reviews.db".into()),
            token_secret,
            client_url: env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            production,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value {raw:?} ({e}), using default {default}");
            default.parse().map_err(|e| format!("{e}")).expect("default value must parse")
        }
    }
}
