use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::REFRESH_COOKIE_NAME;
use crate::client::{ApiClient, FileCredentialStore, SessionFile, WebLarekApi};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("LAREK_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("larek").join("cli")
    };

    Ok(config_dir)
}

pub fn session_path() -> anyhow::Result<PathBuf> {
    Ok(get_config_dir()?.join("session.json"))
}

/// Base URL from the flag, then the saved session, then the default.
pub fn resolve_base_url(flag: Option<&str>, session: &SessionFile) -> String {
    flag.map(str::to_string)
        .or_else(|| session.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

/// Builds the API client over the session file. A base URL given on the
/// command line is saved for later runs; `LAREK_REFRESH_TOKEN` seeds the
/// refresh cookie.
pub async fn build_api(base_url_flag: Option<&str>) -> anyhow::Result<WebLarekApi> {
    let path = session_path()?;
    let mut session = SessionFile::load(&path).await?;
    let base_url = resolve_base_url(base_url_flag, &session);

    if base_url_flag.is_some() && session.base_url.as_deref() != Some(base_url.as_str()) {
        session.base_url = Some(base_url.clone());
        session.save(&path).await?;
    }

    let store = Arc::new(FileCredentialStore::new(path));
    let client = ApiClient::new(&base_url, store)?;
    if let Ok(refresh) = std::env::var("LAREK_REFRESH_TOKEN") {
        client.add_cookie(REFRESH_COOKIE_NAME, refresh.trim());
    }

    let cdn = std::env::var("LAREK_CDN_URL").unwrap_or_else(|_| format!("{}/images", base_url.trim_end_matches('/')));
    Ok(WebLarekApi::new(Arc::new(client), cdn))
}
