//! Authentication and credential caching helpers
//!
//! The token exchange itself belongs to the identity provider; this module
//! owns the conventions around it: resolving credential parameters,
//! persisting authentication records between sessions, chaining credential
//! sources and reusing tokens until shortly before they expire.
//!
//! The authentication record contains no secrets and is stored in
//! plaintext. Secret material never passes through this module.

use crate::errors::{DasError, Result};
use crate::params::{resolve, CallArgs, DefaultRegistry, ParamSpec, ResolvedParams};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Seconds before expiry at which a cached token stops being reused
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 300;

/// An opaque bearer token with its expiry as UNIX seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: i64,
}

impl AccessToken {
    /// Whether the token is still usable at `now`, honoring the skew
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_on - TOKEN_EXPIRY_SKEW_SECS
    }
}

/// A source of access tokens for a set of scopes
///
/// The actual exchange with the identity provider lives behind this trait;
/// implementations in this crate only combine and cache other credentials.
pub trait TokenCredential {
    fn get_token(&mut self, scopes: &[String]) -> Result<AccessToken>;
}

/// Adapts a closure into a [`TokenCredential`]
///
/// The usual way to hand an identity provider's exchange function to the
/// chaining and caching combinators.
pub struct CallbackCredential<F>(pub F);

impl<F> TokenCredential for CallbackCredential<F>
where
    F: FnMut(&[String]) -> Result<AccessToken>,
{
    fn get_token(&mut self, scopes: &[String]) -> Result<AccessToken> {
        (self.0)(scopes)
    }
}

/// Session information persisted between processes
///
/// The record identifies a previously authenticated session so the provider
/// can resume it silently; it carries no secret material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationRecord {
    pub authority: String,
    pub tenant_id: String,
    pub client_id: String,
    pub username: String,
    pub home_account_id: String,
}

/// Named on-disk store for authentication records
///
/// Records live under `~/.authentication-records/<name>`; the name isolates
/// credentials for different clients.
#[derive(Debug, Clone)]
pub struct CredentialCache {
    record_path: PathBuf,
}

impl CredentialCache {
    pub fn new(name: &str) -> Self {
        let home = shellexpand::tilde("~/.authentication-records");
        Self {
            record_path: PathBuf::from(home.as_ref()).join(name),
        }
    }

    /// Cache rooted at an explicit directory instead of the home directory
    pub fn with_root(root: &std::path::Path, name: &str) -> Self {
        Self {
            record_path: root.join(name),
        }
    }

    pub fn record_path(&self) -> &std::path::Path {
        &self.record_path
    }

    /// Reads the stored authentication record, if there is one.
    pub fn read_authentication_record(&self) -> Result<Option<AuthenticationRecord>> {
        match fs::read_to_string(&self.record_path) {
            Ok(raw) => {
                let record = serde_json::from_str(&raw)?;
                info!(
                    "Reusing cached authentication record from {}",
                    self.record_path.display()
                );
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes an authentication record, creating parent directories.
    pub fn write_authentication_record(&self, record: &AuthenticationRecord) -> Result<()> {
        if let Some(parent) = self.record_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.record_path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }

    /// Removes the stored record; missing records are not an error.
    pub fn remove_authentication_record(&self) -> Result<()> {
        match fs::remove_file(&self.record_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cached record at {}", self.record_path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Tries a sequence of credentials in order until one produces a token
pub struct ChainedCredential {
    credentials: Vec<Box<dyn TokenCredential>>,
}

impl ChainedCredential {
    pub fn new(credentials: Vec<Box<dyn TokenCredential>>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(DasError::AuthError(
                "No credentials could be instantiated".to_string(),
            ));
        }
        Ok(Self { credentials })
    }
}

impl TokenCredential for ChainedCredential {
    fn get_token(&mut self, scopes: &[String]) -> Result<AccessToken> {
        for (position, credential) in self.credentials.iter_mut().enumerate() {
            match credential.get_token(scopes) {
                Ok(token) => return Ok(token),
                Err(e) => debug!("Credential {} failed: {}", position, e),
            }
        }
        Err(DasError::AuthError(
            "Every credential in the chain failed to produce a token".to_string(),
        ))
    }
}

/// Reuses tokens per scope set until shortly before they expire
pub struct CachedCredential<C: TokenCredential> {
    inner: C,
    tokens: HashMap<Vec<String>, AccessToken>,
}

impl<C: TokenCredential> CachedCredential<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            tokens: HashMap::new(),
        }
    }
}

impl<C: TokenCredential> TokenCredential for CachedCredential<C> {
    fn get_token(&mut self, scopes: &[String]) -> Result<AccessToken> {
        let now = Utc::now().timestamp();
        if let Some(token) = self.tokens.get(scopes) {
            if token.is_fresh(now) {
                debug!("Reusing cached token for {} scope(s)", scopes.len());
                return Ok(token.clone());
            }
        }

        let token = self.inner.get_token(scopes)?;
        self.tokens.insert(scopes.to_vec(), token.clone());
        Ok(token)
    }
}

/// Resolves the credential parameter set handed to the identity provider.
///
/// `tenant_id` and `client_id` must come from the caller or the registry;
/// the boolean switches fall back to off and `cache` falls back to the
/// empty string, which disables record caching.
pub fn resolve_credential_params(
    args: &CallArgs,
    registry: &DefaultRegistry,
) -> Result<ResolvedParams> {
    let specs = [
        ParamSpec::str("tenant_id"),
        ParamSpec::str("client_id"),
        ParamSpec::str("cache").fallback(""),
        ParamSpec::bool("use_browser").fallback(false),
        ParamSpec::bool("allow_unencrypted_storage").fallback(false),
    ];
    resolve(args, &specs, registry)
}
