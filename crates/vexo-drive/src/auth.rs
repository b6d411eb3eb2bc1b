//! OAuth2 credential lifecycle.
//!
//! One manager owns the single credential slot and resolves every request
//! for an authorized client through the same ladder: use the stored token if
//! it is still valid, refresh it if it carries a refresh token, otherwise run
//! the interactive consent flow. Concurrent callers are serialized on the
//! slot so the refresh and consent steps run at most once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::Url;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::error::DriveError;
use crate::token::{StoredCredential, TokenStore};

/// Read-only access to file content and metadata.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const REDIRECT_PATH: &str = "/";

/// Client secrets in the installed-app shape the provider console exports.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub installed: InstalledClientSecrets,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstalledClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl ClientSecrets {
    pub async fn load(path: &Path) -> Result<Self, DriveError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DriveError::ConfigurationMissing(format!(
                    "Client secrets file not found: {}",
                    path.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_credential(self, previous_refresh_token: Option<String>) -> StoredCredential {
        let scopes = self
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| vec![DRIVE_SCOPE.to_string()]);
        StoredCredential {
            access_token: self.access_token,
            // Refresh responses usually omit the refresh token; keep the one
            // we already had so the credential stays refreshable.
            refresh_token: self.refresh_token.or(previous_refresh_token),
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            scopes,
        }
    }
}

/// A client holding a currently-valid access token.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    access_token: String,
}

impl AuthorizedClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn bearer_token(&self) -> &str {
        &self.access_token
    }
}

/// Interactive consent, behind a trait so tests can count invocations
/// without opening a browser.
#[async_trait::async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn authorize(&self, secrets: &ClientSecrets) -> Result<StoredCredential, DriveError>;
}

/// Loopback-redirect consent: print the authorization URL, wait for the
/// provider to redirect the browser to a local listener, exchange the code.
pub struct LocalServerConsent {
    port: u16,
    http: reqwest::Client,
}

impl LocalServerConsent {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            http: reqwest::Client::new(),
        }
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.port, REDIRECT_PATH)
    }

    fn authorization_url(&self, secrets: &ClientSecrets) -> Result<Url, DriveError> {
        let redirect_uri = self.redirect_uri();
        Url::parse_with_params(
            &secrets.installed.auth_uri,
            &[
                ("client_id", secrets.installed.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", DRIVE_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|err| DriveError::AuthenticationFailed(format!("Invalid auth URI: {}", err)))
    }

    /// Accept one connection on the loopback listener and pull the `code`
    /// (or `error`) parameter out of the request line.
    async fn wait_for_code(&self) -> Result<String, DriveError> {
        let listener = TcpListener::bind(("127.0.0.1", self.port)).await?;
        let (mut stream, _) = listener.accept().await?;

        let mut buf = vec![0u8; 4096];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]);

        let target = request
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .ok_or_else(|| {
                DriveError::AuthenticationFailed("Malformed redirect request".to_string())
            })?;

        let url = Url::parse(&format!("http://localhost{}", target)).map_err(|err| {
            DriveError::AuthenticationFailed(format!("Malformed redirect target: {}", err))
        })?;

        let mut code = None;
        let mut denial = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => denial = Some(value.into_owned()),
                _ => {}
            }
        }

        let (status, body) = if code.is_some() {
            ("200 OK", "<html><body>Authorization complete. You can close this window.</body></html>")
        } else {
            ("400 Bad Request", "<html><body>Authorization failed.</body></html>")
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        let _ = stream.shutdown().await;

        match (code, denial) {
            (Some(code), _) => Ok(code),
            (None, Some(denial)) => Err(DriveError::AuthenticationFailed(format!(
                "Consent was denied: {}",
                denial
            ))),
            (None, None) => Err(DriveError::AuthenticationFailed(
                "Redirect carried no authorization code".to_string(),
            )),
        }
    }

    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
    ) -> Result<StoredCredential, DriveError> {
        let redirect_uri = self.redirect_uri();
        let response = self
            .http
            .post(&secrets.installed.token_uri)
            .form(&[
                ("client_id", secrets.installed.client_id.as_str()),
                ("client_secret", secrets.installed.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthenticationFailed(format!(
                "Code exchange failed with status {}: {}",
                status, message
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.into_credential(None))
    }
}

#[async_trait::async_trait]
impl ConsentFlow for LocalServerConsent {
    async fn authorize(&self, secrets: &ClientSecrets) -> Result<StoredCredential, DriveError> {
        let auth_url = self.authorization_url(secrets)?;
        tracing::info!(url = %auth_url, "Open this URL in a browser to authorize access");

        let code = self.wait_for_code().await?;
        self.exchange_code(secrets, &code).await
    }
}

#[derive(Debug, Default)]
struct CredentialSlot {
    loaded: bool,
    credential: Option<StoredCredential>,
}

/// Owner of the credential lifecycle.
///
/// `get_authorized_client` is the only entry point; it always leaves the
/// slot and the on-disk store holding the credential it handed out.
pub struct DriveAuthManager {
    credentials_path: PathBuf,
    store: TokenStore,
    consent: Arc<dyn ConsentFlow>,
    http: reqwest::Client,
    slot: Mutex<CredentialSlot>,
}

impl DriveAuthManager {
    pub fn new(
        credentials_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
        consent: Arc<dyn ConsentFlow>,
    ) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            store: TokenStore::new(token_path),
            consent,
            http: reqwest::Client::new(),
            slot: Mutex::new(CredentialSlot::default()),
        }
    }

    /// Resolve a usable access token.
    ///
    /// Ladder: stored-and-valid → refresh (if a refresh token exists) →
    /// interactive consent. A failed refresh logs and falls through to
    /// consent rather than surfacing, matching the behavior users expect
    /// from a desktop authorization flow. Missing client secrets surface as
    /// `ConfigurationMissing` since neither refresh nor consent can proceed
    /// without them.
    pub async fn get_authorized_client(&self) -> Result<AuthorizedClient, DriveError> {
        let mut slot = self.slot.lock().await;

        if !slot.loaded {
            slot.credential = self.store.load().await?;
            slot.loaded = true;
        }

        if let Some(credential) = &slot.credential {
            if !credential.is_expired() {
                return Ok(AuthorizedClient::new(credential.access_token.clone()));
            }

            if let Some(refresh_token) = credential.refresh_token.clone() {
                let secrets = ClientSecrets::load(&self.credentials_path).await?;
                match self.refresh(&secrets, &refresh_token).await {
                    Ok(refreshed) => {
                        self.store.save(&refreshed).await?;
                        let client = AuthorizedClient::new(refreshed.access_token.clone());
                        slot.credential = Some(refreshed);
                        return Ok(client);
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "Token refresh failed, falling back to interactive consent"
                        );
                    }
                }
            }
        }

        let secrets = ClientSecrets::load(&self.credentials_path).await?;
        let credential = self.consent.authorize(&secrets).await?;
        self.store.save(&credential).await?;
        let client = AuthorizedClient::new(credential.access_token.clone());
        slot.credential = Some(credential);
        Ok(client)
    }

    async fn refresh(
        &self,
        secrets: &ClientSecrets,
        refresh_token: &str,
    ) -> Result<StoredCredential, DriveError> {
        let response = self
            .http
            .post(&secrets.installed.token_uri)
            .form(&[
                ("client_id", secrets.installed.client_id.as_str()),
                ("client_secret", secrets.installed.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(DriveError::AuthenticationFailed(format!(
                "Token refresh failed with status {}: {}",
                status, message
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.into_credential(Some(refresh_token.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeConsent {
        calls: AtomicUsize,
        credential: StoredCredential,
    }

    impl FakeConsent {
        fn new(credential: StoredCredential) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                credential,
            }
        }
    }

    #[async_trait::async_trait]
    impl ConsentFlow for FakeConsent {
        async fn authorize(
            &self,
            _secrets: &ClientSecrets,
        ) -> Result<StoredCredential, DriveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.credential.clone())
        }
    }

    fn valid_credential() -> StoredCredential {
        StoredCredential {
            access_token: "ya29.valid".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }

    fn expired_credential(refresh_token: Option<&str>) -> StoredCredential {
        StoredCredential {
            access_token: "ya29.stale".to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: Utc::now() - Duration::hours(1),
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }

    async fn write_secrets(dir: &Path, token_uri: &str) -> PathBuf {
        let path = dir.join("credentials.json");
        let body = serde_json::json!({
            "installed": {
                "client_id": "client-id.apps.test",
                "client_secret": "client-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": token_uri,
                "redirect_uris": ["http://localhost"]
            }
        });
        tokio::fs::write(&path, serde_json::to_vec(&body).unwrap())
            .await
            .unwrap();
        path
    }

    /// One-shot HTTP server answering every request with the given JSON and
    /// counting how many requests it served.
    async fn spawn_token_server(body: serde_json::Value) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_inner = hits.clone();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                hits_inner.fetch_add(1, Ordering::SeqCst);
                let payload = serde_json::to_string(&body).unwrap();
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{}/token", addr), hits)
    }

    #[tokio::test]
    async fn test_valid_stored_credential_skips_consent() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStore::new(&token_path)
            .save(&valid_credential())
            .await
            .unwrap();

        let consent = Arc::new(FakeConsent::new(valid_credential()));
        let manager = DriveAuthManager::new(
            dir.path().join("credentials.json"),
            &token_path,
            consent.clone(),
        );

        let client = manager.get_authorized_client().await.unwrap();
        assert_eq!(client.bearer_token(), "ya29.valid");
        assert_eq!(consent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_refreshable_credential_refreshes_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStore::new(&token_path)
            .save(&expired_credential(Some("1//refresh")))
            .await
            .unwrap();

        let (token_uri, hits) = spawn_token_server(serde_json::json!({
            "access_token": "ya29.fresh",
            "expires_in": 3600,
            "scope": DRIVE_SCOPE
        }))
        .await;
        let credentials_path = write_secrets(dir.path(), &token_uri).await;

        let consent = Arc::new(FakeConsent::new(valid_credential()));
        let manager = DriveAuthManager::new(credentials_path, &token_path, consent.clone());

        let first = manager.get_authorized_client().await.unwrap();
        let second = manager.get_authorized_client().await.unwrap();

        assert_eq!(first.bearer_token(), "ya29.fresh");
        assert_eq!(second.bearer_token(), "ya29.fresh");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(consent.calls.load(Ordering::SeqCst), 0);

        // The refresh token from before the refresh survives the rewrite
        let persisted = TokenStore::new(&token_path).load().await.unwrap().unwrap();
        assert_eq!(persisted.refresh_token.as_deref(), Some("1//refresh"));
    }

    #[tokio::test]
    async fn test_expired_unrefreshable_credential_runs_consent_once() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStore::new(&token_path)
            .save(&expired_credential(None))
            .await
            .unwrap();
        let credentials_path = write_secrets(dir.path(), "https://unused.test/token").await;

        let consent = Arc::new(FakeConsent::new(valid_credential()));
        let manager = DriveAuthManager::new(credentials_path, &token_path, consent.clone());

        let first = manager.get_authorized_client().await.unwrap();
        let second = manager.get_authorized_client().await.unwrap();

        assert_eq!(first.bearer_token(), "ya29.valid");
        assert_eq!(second.bearer_token(), "ya29.valid");
        assert_eq!(consent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_secrets_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let consent = Arc::new(FakeConsent::new(valid_credential()));
        let manager = DriveAuthManager::new(
            dir.path().join("missing-credentials.json"),
            dir.path().join("token.json"),
            consent.clone(),
        );

        let err = manager.get_authorized_client().await.unwrap_err();
        assert!(matches!(err, DriveError::ConfigurationMissing(_)));
        assert_eq!(consent.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_consent_result_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let credentials_path = write_secrets(dir.path(), "https://unused.test/token").await;

        let consent = Arc::new(FakeConsent::new(valid_credential()));
        let manager = DriveAuthManager::new(credentials_path, &token_path, consent);

        manager.get_authorized_client().await.unwrap();

        let persisted = TokenStore::new(&token_path).load().await.unwrap().unwrap();
        assert_eq!(persisted.access_token, "ya29.valid");
    }
}
