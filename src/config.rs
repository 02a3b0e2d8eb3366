use std::env;
use std::str::FromStr;

use crate::error::AppError;

pub struct Config {
    /// Postgres connection string; without it the server keeps data in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_port: u16,
    pub server_host: String,
    pub bcrypt_cost: u32,
    pub avatar_max_bytes: usize,
    pub avatar_dimension: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| AppError::InternalServerError("JWT_SECRET must be set".into()))?,
            server_port: parse_var("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            avatar_max_bytes: parse_var("AVATAR_MAX_BYTES", 1_000_000)?,
            avatar_dimension: parse_var("AVATAR_DIMENSION", 250)?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::InternalServerError(format!("{} must be a number", name))),
        Err(_) => Ok(default),
    }
}
