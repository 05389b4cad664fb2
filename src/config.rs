use crate::non_zero_duration::NonZeroDuration;

use hyper::header::HeaderMap;
use hyper::Uri;
use serde::Deserialize;
use std::net::SocketAddr;
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::Path;
use thiserror::Error;

const IP_LOCATION_URI: &str = "https://apimobile.meituan.com/locate/v2/ip/loc";
const DETAIL_URI: &str = "https://apimobile.meituan.com/group/v1/city/latlng";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error(r#"threads must be a positive integer or "cores", not {0:?}"#)]
    ThreadsUnknown(String),
}

#[derive(Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_host")]
    pub host: SocketAddr,
    #[serde(default)]
    pub threads: ConfigThreads,
    #[serde(default = "Config::default_log_level")]
    pub log_level: log::Level,
    #[serde(default = "Config::default_path")]
    pub path: String,
    #[serde(default = "Config::default_max_body_size")]
    pub max_body_size: NonZeroUsize,
    #[serde(default = "Config::default_ip_headers")]
    pub ip_headers: Vec<String>,
    #[serde(default = "Config::default_ip_headers_recursive")]
    pub ip_headers_recursive: bool,
    #[serde(default, with = "http_serde::header_map")]
    pub response_headers: HeaderMap,
    #[serde(default = "Config::default_upstream_timeout")]
    pub upstream_timeout: NonZeroDuration,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Config {
    fn default_host() -> SocketAddr {
        ([127, 0, 0, 1], 8080).into()
    }

    fn default_log_level() -> log::Level {
        log::Level::Info
    }

    fn default_path() -> String {
        "/api/query".into()
    }

    fn default_max_body_size() -> NonZeroUsize {
        4096.try_into().unwrap()
    }

    fn default_ip_headers() -> Vec<String> {
        vec!["X-FORWARDED-FOR".into()]
    }

    fn default_ip_headers_recursive() -> bool {
        true
    }

    fn default_upstream_timeout() -> NonZeroDuration {
        let secs: NonZeroU64 = 10.try_into().unwrap();
        secs.into()
    }
}

#[derive(Deserialize)]
pub struct UpstreamConfig {
    #[serde(
        default = "UpstreamConfig::default_ip_location",
        alias = "ip-location",
        with = "http_serde::uri"
    )]
    pub ip_location: Uri,
    #[serde(default = "UpstreamConfig::default_detail", with = "http_serde::uri")]
    pub detail: Uri,
}

impl UpstreamConfig {
    fn default_ip_location() -> Uri {
        Uri::from_static(IP_LOCATION_URI)
    }

    fn default_detail() -> Uri {
        Uri::from_static(DETAIL_URI)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            ip_location: Self::default_ip_location(),
            detail: Self::default_detail(),
        }
    }
}

/// Number of runtime worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "ConfigThreadsDe")]
pub enum ConfigThreads {
    Custom(NonZeroUsize),
    #[default]
    Cores,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigThreadsDe {
    Number(NonZeroUsize),
    Keyword(String),
}

impl TryFrom<ConfigThreadsDe> for ConfigThreads {
    type Error = ConfigError;

    fn try_from(value: ConfigThreadsDe) -> Result<Self, Self::Error> {
        match value {
            ConfigThreadsDe::Number(threads) => Ok(Self::Custom(threads)),
            ConfigThreadsDe::Keyword(keyword) if keyword.trim().eq_ignore_ascii_case("cores") => {
                Ok(Self::Cores)
            }
            ConfigThreadsDe::Keyword(keyword) => Err(ConfigError::ThreadsUnknown(keyword)),
        }
    }
}

pub fn parse_config_str(toml_string: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(toml_string)?;
    Ok(config)
}

pub fn parse_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let toml_string = std::fs::read_to_string(path)?;
    parse_config_str(&toml_string)
}
