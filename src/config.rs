//! Runtime configuration comes from the environment (and `.env`, via
//! `dotenvy`), and is read exactly once at startup. Nothing else in the
//! crate touches `std::env`.
//!
//! We can still have a little hard-coded config, [as a
//! snack](https://knowyourmeme.com/memes/cats-can-have-a-little-salami).

use anyhow::{Context, Result};
use std::{env, net::SocketAddr, str::FromStr};

/// Longest note title we'll accept.
pub const TITLE_MAX_CHARS: usize = 200;

/// Longest note body we'll accept. Notes are supposed to be short, and the
/// whole body ends up inside a completion prompt.
pub const CONTENT_MAX_CHARS: usize = 10_000;

/// Name of the cookie carrying the signed session.
pub const SESSION_COOKIE: &str = "session";

/// Holds the PKCE code verifier between sign-up and the confirmation link.
pub const PKCE_COOKIE: &str = "pkce_verifier";

/// How long a confirmation link stays usable, as far as we're concerned.
pub const PKCE_MAX_AGE_SECS: u64 = 60 * 60 * 24;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    /// Public base URL, without a trailing slash. Sign-up confirmation emails
    /// link back here.
    pub site_url: String,
    pub session: SessionConfig,
    pub identity: IdentityConfig,
    pub completion: CompletionConfig,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub secret: Vec<u8>,
    pub max_age_secs: u64,
}

#[derive(Clone, Debug)]
pub struct IdentityConfig {
    /// Base URL of the auth service, e.g. `https://xyz.supabase.co`
    pub url: String,
    pub anon_key: String,
}

#[derive(Clone, Debug)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: parse_or("BIND_ADDR", "127.0.0.1:8000")?,
            database_url: required("DATABASE_URL")?,
            // Postgres default max connections is 100, and we'll take 'em
            // https://www.postgresql.org/docs/current/runtime-config-connection.html
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", "80")?,
            site_url: trim_slash(&or_default("SITE_URL", "http://localhost:8000")),
            session: SessionConfig {
                secret: required("SESSION_SECRET")?.into_bytes(),
                max_age_secs: parse_or("SESSION_MAX_AGE_SECS", "3600")?,
            },
            identity: IdentityConfig {
                url: trim_slash(&required("AUTH_URL")?),
                anon_key: required("AUTH_ANON_KEY")?,
            },
            completion: CompletionConfig {
                api_key: required("OPENAI_API_KEY")?,
                base_url: trim_slash(&or_default(
                    "OPENAI_BASE_URL",
                    "https://api.openai.com/v1",
                )),
                model: or_default("OPENAI_MODEL", "gpt-4o-mini"),
                temperature: parse_or("OPENAI_TEMPERATURE", "0.7")?,
                timeout_secs: parse_or("OPENAI_TIMEOUT_SECS", "30")?,
            },
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    or_default(key, default)
        .parse()
        .with_context(|| format!("{key} is not valid"))
}

fn trim_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
