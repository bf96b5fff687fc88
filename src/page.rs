use anyhow::{Context, Result};
use url::Url;

pub const AREAS_KEY_PREFIX: &str = "areas_";
const SYSTEM_SCHEMES: &[&str] = &["chrome", "edge", "about"];

/// Identity of a loaded page: host plus path, query and fragment dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageContext {
    host: String,
    path: String,
}

impl PageContext {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }

    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("parse page url {raw}"))?;
        Ok(Self::new(url.host_str().unwrap_or_default(), url.path()))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn key(&self) -> String {
        format!("{}{}", self.host, self.path)
    }

    pub fn storage_key(&self) -> String {
        format!("{AREAS_KEY_PREFIX}{}", self.key())
    }

    /// Hosts on the list (or their subdomains) get no computed overlay.
    pub fn is_native_bypass(&self, hosts: &[String]) -> bool {
        let host = self.host.to_ascii_lowercase();
        hosts.iter().any(|entry| {
            let entry = entry.trim().trim_start_matches('.').to_ascii_lowercase();
            !entry.is_empty()
                && (host == entry
                    || host
                        .strip_suffix(entry.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.')))
        })
    }
}

/// Browser-internal pages cannot host the engine.
pub fn is_system_page(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| SYSTEM_SCHEMES.contains(&url.scheme()))
        .unwrap_or(false)
}
