// [libs/infra/proxy-source/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PROXY POOL UPLINK (SOURCE ADAPTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: MATERIALIZAR LA LISTA DE PROXIES VIGENTE
 *
 * Recupera la lista cruda de proxies SOCKS desde la fuente configurada
 * (`proxy.method`: `url` o `file`) y la traduce al modelo de dominio,
 * descartando cualquier entrada marcada como no viva (`is_alive`).
 * =================================================================
 */

use mtracker_domain_models::Proxy;
use mtracker_shared_config::{ProxyMethod, ProxySection};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxySourceError {
    #[error("proxy.method is 'url' but proxy.url is not set")]
    MissingUrl,
    #[error("proxy.method is 'file' but proxy.path is not set")]
    MissingPath,
    #[error("failed to fetch proxy list from '{0}': {1}")]
    FetchFailed(String, reqwest::Error),
    #[error("failed to read proxy list file '{0}': {1}")]
    ReadFailed(String, std::io::Error),
    #[error("failed to parse proxy list payload: {0}")]
    ParseFailed(#[from] serde_json::Error),
}

/// Raw wire shape of one entry in the fetched proxy list, mirroring the
/// real tracker's proxy list payload fields.
#[derive(Debug, Clone, Deserialize)]
struct RawProxyEntry {
    country: String,
    host: String,
    port: u16,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default = "default_alive")]
    is_alive: bool,
}

fn default_alive() -> bool {
    true
}

impl From<RawProxyEntry> for Proxy {
    fn from(raw: RawProxyEntry) -> Self {
        Proxy { id: 0, country: raw.country, host: raw.host, port: raw.port, username: raw.username, password: raw.password }
    }
}

/// Fetches the current proxy pool from whichever source `proxy.method`
/// names, filtering out anything reported as not alive. Row ids on the
/// returned proxies are placeholders (`0`) — the caller persists them
/// through `proxy_repository::synchronize`, which keys on natural
/// identity rather than id.
pub async fn fetch_proxy_pool(config: &ProxySection) -> Result<Vec<Proxy>, ProxySourceError> {
    let raw = match config.method {
        ProxyMethod::Url => fetch_from_url(config).await?,
        ProxyMethod::File => fetch_from_file(config).await?,
    };
    Ok(raw.into_iter().filter(|entry| entry.is_alive).map(Proxy::from).collect())
}

async fn fetch_from_url(config: &ProxySection) -> Result<Vec<RawProxyEntry>, ProxySourceError> {
    let url = config.url.as_deref().ok_or(ProxySourceError::MissingUrl)?;
    let response = reqwest::get(url).await.map_err(|e| ProxySourceError::FetchFailed(url.to_string(), e))?;
    let body = response.text().await.map_err(|e| ProxySourceError::FetchFailed(url.to_string(), e))?;
    Ok(serde_json::from_str(&body)?)
}

async fn fetch_from_file(config: &ProxySection) -> Result<Vec<RawProxyEntry>, ProxySourceError> {
    let path = config.path.as_deref().ok_or(ProxySourceError::MissingPath)?;
    let body = tokio::fs::read_to_string(path).await.map_err(|e| ProxySourceError::ReadFailed(path.to_string(), e))?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn section_for_file(path: &str) -> ProxySection {
        ProxySection { default_country: "pl".to_string(), method: ProxyMethod::File, url: None, path: Some(path.to_string()) }
    }

    #[tokio::test]
    async fn reads_and_filters_dead_proxies_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"country": "pl", "host": "1.1.1.1", "port": 1080, "is_alive": true}},
                {{"country": "de", "host": "2.2.2.2", "port": 1080, "is_alive": false}},
                {{"country": "us", "host": "3.3.3.3", "port": 1080, "username": "u", "password": "p"}}
            ]"#
        )
        .unwrap();

        let config = section_for_file(file.path().to_str().unwrap());
        let proxies = fetch_proxy_pool(&config).await.unwrap();

        assert_eq!(proxies.len(), 2);
        assert!(proxies.iter().any(|p| p.country == "pl"));
        assert!(!proxies.iter().any(|p| p.country == "de"));
        let us = proxies.iter().find(|p| p.country == "us").unwrap();
        assert_eq!(us.username.as_deref(), Some("u"));
    }

    #[tokio::test]
    async fn missing_path_is_reported() {
        let config = ProxySection { default_country: "pl".to_string(), method: ProxyMethod::File, url: None, path: None };
        let err = fetch_proxy_pool(&config).await.unwrap_err();
        assert!(matches!(err, ProxySourceError::MissingPath));
    }

    #[tokio::test]
    async fn missing_url_is_reported() {
        let config = ProxySection { default_country: "pl".to_string(), method: ProxyMethod::Url, url: None, path: None };
        let err = fetch_proxy_pool(&config).await.unwrap_err();
        assert!(matches!(err, ProxySourceError::MissingUrl));
    }
}
