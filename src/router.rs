use crate::capabilities::Navigator;
use crate::error::ConfigError;
use reqwest::Url;
use tracing::info;

pub const SEARCH_PATH: &str = "/search";
pub const LOGIN_PATH: &str = "/login";

/// In-process location of the client, parsed from a route such as
/// `/search?q=travel`.
#[derive(Debug, Clone)]
pub struct Router {
    location: Url,
}

impl Router {
    pub fn parse(route: &str) -> Result<Self, ConfigError> {
        let base =
            Url::parse("app://diary/").map_err(|_| ConfigError::InvalidRoute(route.into()))?;
        let location = base
            .join(route)
            .map_err(|_| ConfigError::InvalidRoute(route.to_string()))?;
        Ok(Router { location })
    }

    /// Route for the search page, optionally seeded with a keyword.
    pub fn search(query: Option<&str>) -> Result<Self, ConfigError> {
        let mut router = Router::parse(SEARCH_PATH)?;
        if let Some(query) = query {
            router.location.query_pairs_mut().append_pair("q", query);
        }
        Ok(router)
    }

    pub fn path(&self) -> &str {
        self.location.path()
    }

    pub fn is_at(&self, path: &str) -> bool {
        self.path() == path
    }
}

impl Navigator for Router {
    fn redirect(&mut self, path: &str) {
        if let Ok(next) = self.location.join(path) {
            info!(from = self.location.path(), to = next.path(), "redirect");
            self.location = next;
        }
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.location
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}
