use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    NotANumber { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// 覆盖场景自带的字幕节拍；None 表示用夹具里的 captionPeriodMs
    pub caption_period: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT")?.unwrap_or(3000),
            caption_period: parse_var::<u64>("CAPTION_PERIOD_MS")?
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::NotANumber { key, value }),
        Err(_) => Ok(None),
    }
}
