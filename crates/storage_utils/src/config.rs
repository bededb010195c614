use std::fmt;

use serde::Deserialize;
use storage_base::{ResultExt, StorageError, StorageResult};
use tracing::{debug, instrument};

use crate::ops::PathOperations;
use crate::path::{Path, Scheme};

pub const OS_USERNAME: &str = "OS_USERNAME";
pub const OS_PASSWORD: &str = "OS_PASSWORD";
pub const OS_AUTH_URL: &str = "OS_AUTH_URL";
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_ENDPOINT_URL: &str = "AWS_ENDPOINT_URL";

/// Object store credentials handed to the SDK clients.
///
/// Values are passed through as given; only their presence is checked.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default)]
    pub swift: Option<SwiftCredentials>,
    #[serde(default)]
    pub s3: Option<S3Credentials>,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct SwiftCredentials {
    pub username: String,
    pub password: String,
    pub auth_url: String,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Collects a group of variables: all present, all absent, or an error naming
/// the missing ones.
fn read_group<const N: usize>(
    names: [&str; N],
    lookup: &impl Fn(&str) -> Option<String>,
) -> StorageResult<Option<[String; N]>> {
    let values = names.map(lookup);
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    let missing: Vec<&str> = names
        .iter()
        .zip(&values)
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(Box::new(StorageError::configuration(format!(
            "incomplete credentials, missing {}",
            missing.join(", ")
        ))));
    }
    Ok(Some(values.map(Option::unwrap_or_default)))
}

impl StorageConfig {
    /// Reads credentials from the process environment.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads credentials through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StorageResult<Self> {
        let swift = read_group([OS_USERNAME, OS_PASSWORD, OS_AUTH_URL], &lookup)?.map(
            |[username, password, auth_url]| SwiftCredentials {
                username,
                password,
                auth_url,
            },
        );
        let s3 = read_group([AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY], &lookup)?.map(
            |[access_key_id, secret_access_key]| S3Credentials {
                access_key_id,
                secret_access_key,
                endpoint: lookup(AWS_ENDPOINT_URL),
            },
        );
        debug!(swift = swift.is_some(), s3 = s3.is_some(), "loaded credentials");
        Ok(Self { swift, s3 })
    }

    pub fn has_credentials(&self, scheme: Scheme) -> bool {
        match scheme {
            Scheme::Swift => self.swift.is_some(),
            Scheme::S3 => self.s3.is_some(),
        }
    }
}

/// Loads a TOML configuration file through any backend.
#[instrument(skip(ops), fields(path = %path))]
pub fn load_config(ops: &dyn PathOperations, path: &Path) -> StorageResult<StorageConfig> {
    let text = ops
        .read_to_string(path)
        .with_context(|| format!("reading configuration {}", path))?;
    toml::from_str(&text).map_err(|e| {
        Box::new(StorageError::configuration(format!(
            "invalid configuration in {}: {}",
            path, e
        )))
    })
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("swift", &self.swift)
            .field("s3", &self.s3)
            .finish()
    }
}

impl fmt::Debug for SwiftCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwiftCredentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("auth_url", &self.auth_url)
            .finish()
    }
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
