use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DB_PATH: &str = "data/mood.db";
pub const DEFAULT_ADMIN_USER: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub admin_username: String,
}

impl Config {
    /// Reads `PORT`, `MOOD_DB_PATH` and `MOOD_ADMIN_USER`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = lookup("MOOD_DB_PATH")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let admin_username = lookup("MOOD_ADMIN_USER")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_USER.to_string());

        Self {
            port,
            db_path,
            admin_username,
        }
    }
}
