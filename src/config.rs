use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::service::UpdateMode;
use crate::store::MAX_BATCH_WRITES;

pub struct Config {
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub reminder_interval: Duration,
    pub reminder_batch_size: usize,
    pub reminder_single_flight: bool,
    pub task_update_mode: UpdateMode,
}

/// Reads `name`, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Internal(format!("{} is invalid: {}", name, e))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal("JWT_SECRET must be set".into()))?;

        let reminder_batch_size = parse_var("REMINDER_BATCH_SIZE", MAX_BATCH_WRITES)?;
        if reminder_batch_size == 0 || reminder_batch_size > MAX_BATCH_WRITES {
            return Err(AppError::Internal(format!(
                "REMINDER_BATCH_SIZE must be between 1 and {}",
                MAX_BATCH_WRITES
            )));
        }

        Ok(Self {
            server_port: parse_var("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret,
            reminder_interval: Duration::from_secs(parse_var("REMINDER_INTERVAL_SECS", 30)?),
            reminder_batch_size,
            reminder_single_flight: parse_var("REMINDER_SINGLE_FLIGHT", false)?,
            task_update_mode: parse_var("TASK_UPDATE_MODE", UpdateMode::Upsert)?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
