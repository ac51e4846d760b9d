//! Command line and environment configuration

use crate::error::ConfigError;
use crate::router::Router;
use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "diary-search", version, about = "Search your diaries from the terminal")]
pub struct Cli {
    /// Base URL of the diary service
    #[arg(long, env = "DIARY_API_URL", default_value = "http://localhost:3000")]
    pub api_url: String,

    /// Session token sent as a bearer credential
    #[arg(long, env = "DIARY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Origin used when building share links (defaults to the API origin)
    #[arg(long, env = "DIARY_SITE_ORIGIN")]
    pub site_origin: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Route to open, e.g. "/search?q=travel"
    #[arg(long, default_value = "/search", conflicts_with = "query")]
    pub route: String,

    /// Keyword to search for on startup
    #[arg(short, long)]
    pub query: Option<String>,

    /// Where to write logs; the terminal is taken by the UI
    #[arg(long, default_value = "diary_search.log")]
    pub log_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub token: Option<String>,
    pub site_origin: String,
    pub timeout: Duration,
    pub router: Router,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let api_url = parse_url(&cli.api_url)?;
        let site_origin = match &cli.site_origin {
            Some(origin) => origin_of(&parse_url(origin)?),
            None => origin_of(&api_url),
        };
        let router = match &cli.query {
            Some(query) => Router::search(Some(query))?,
            None => Router::parse(&cli.route)?,
        };

        Ok(Config {
            api_url,
            token: cli.token,
            site_origin,
            timeout: Duration::from_secs(cli.timeout_secs),
            router,
            log_file: cli.log_file,
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "not a base url".to_string(),
        });
    }
    Ok(url)
}

fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}
