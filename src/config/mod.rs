//! Configuration module for the Word Book backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "./data/wordbook.sqlite";
pub const DEFAULT_DICTIONARY_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Seed a starter book with sample words on first open
    pub seed_words: bool,
    /// Base URL of the dictionary service; the term is appended as a path segment
    pub dictionary_url: String,
    /// Invalid values that fell back to defaults, logged once tracing is up
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut warnings = Vec::new();

        let db_path = env::var("WORDBOOK_DB_PATH")
            .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
            .into();

        let bind_addr = parse_bind_addr(env::var("WORDBOOK_BIND_ADDR").ok(), &mut warnings);

        let log_level = env::var("WORDBOOK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = env_flag("WORDBOOK_LOG_JSON", false, &mut warnings);
        let seed_words = env_flag("WORDBOOK_SEED_WORDS", true, &mut warnings);

        let dictionary_url = env::var("WORDBOOK_DICTIONARY_URL")
            .unwrap_or_else(|_| DEFAULT_DICTIONARY_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            db_path,
            bind_addr,
            log_level,
            log_json,
            seed_words,
            dictionary_url,
            warnings,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn parse_bind_addr(raw: Option<String>, warnings: &mut Vec<String>) -> SocketAddr {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warnings.push(format!("Invalid WORDBOOK_BIND_ADDR '{}', using default", raw));
            default_bind_addr()
        }),
        None => default_bind_addr(),
    }
}

fn env_flag(name: &str, default: bool, warnings: &mut Vec<String>) -> bool {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warnings.push(format!("Invalid {} '{}', using default {}", name, raw, default));
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("WORDBOOK_DB_PATH");
        env::remove_var("WORDBOOK_BIND_ADDR");
        env::remove_var("WORDBOOK_LOG_LEVEL");
        env::remove_var("WORDBOOK_LOG_JSON");
        env::remove_var("WORDBOOK_SEED_WORDS");
        env::remove_var("WORDBOOK_DICTIONARY_URL");

        let config = Config::from_env();

        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert!(config.seed_words);
        assert_eq!(config.dictionary_url, DEFAULT_DICTIONARY_URL);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_env_flag_parsing() {
        env::set_var("WORDBOOK_TEST_FLAG_ON", "Yes");
        env::set_var("WORDBOOK_TEST_FLAG_OFF", "0");
        env::set_var("WORDBOOK_TEST_FLAG_BAD", "maybe");

        let mut warnings = Vec::new();
        assert!(env_flag("WORDBOOK_TEST_FLAG_ON", false, &mut warnings));
        assert!(!env_flag("WORDBOOK_TEST_FLAG_OFF", true, &mut warnings));
        assert!(!env_flag("WORDBOOK_TEST_FLAG_UNSET", false, &mut warnings));
        assert!(warnings.is_empty());

        assert!(env_flag("WORDBOOK_TEST_FLAG_BAD", true, &mut warnings));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("WORDBOOK_TEST_FLAG_BAD"));
    }

    #[test]
    fn test_invalid_bind_addr_is_reported() {
        let mut warnings = Vec::new();
        let addr = parse_bind_addr(Some("0.0.0.0:9000".to_string()), &mut warnings);
        assert_eq!(addr.to_string(), "0.0.0.0:9000");
        assert_eq!(parse_bind_addr(None, &mut warnings), default_bind_addr());
        assert!(warnings.is_empty());

        let addr = parse_bind_addr(Some("not-an-address".to_string()), &mut warnings);
        assert_eq!(addr, default_bind_addr());
        assert_eq!(
            warnings,
            vec!["Invalid WORDBOOK_BIND_ADDR 'not-an-address', using default".to_string()]
        );
    }
}
