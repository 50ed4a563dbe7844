//! URL parsing for storage backends.

use object_store::path::Path;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::error::{InvalidUrlSnafu, StorageError};

use super::{GcsConfig, LocalConfig, S3Config};

const S3_PATH: &str =
    r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";
const S3_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.*))?$";
const S3_URL: &str = r"^[sS]3[aAnN]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";

const GCS_PATH: &str =
    r"^https://storage\.googleapis\.com/(?P<bucket>[a-z0-9\-_\.]+)(/(?P<key>.*))?$";
const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)(/(?P<key>.*))?$";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_PATH: &str = r"^(?P<path>/.*)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    S3,
    Gcs,
    Local,
}

static MATCHERS: LazyLock<Vec<(Backend, Regex)>> = LazyLock::new(|| {
    [
        (Backend::S3, S3_PATH),
        (Backend::S3, S3_VIRTUAL),
        (Backend::S3, S3_URL),
        (Backend::Gcs, GCS_PATH),
        (Backend::Gcs, GCS_URL),
        (Backend::Local, FILE_URI),
        (Backend::Local, FILE_PATH),
    ]
    .into_iter()
    .map(|(backend, pattern)| (backend, Regex::new(pattern).expect("Invalid URL pattern")))
    .collect()
});

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    ///
    /// Relative local paths are resolved against the current directory.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        for (backend, regex) in MATCHERS.iter() {
            if let Some(caps) = regex.captures(url) {
                return Ok(match backend {
                    Backend::S3 => Self::parse_s3(&caps),
                    Backend::Gcs => Self::parse_gcs(&caps),
                    Backend::Local => Self::parse_local(&caps["path"]),
                });
            }
        }

        if !url.is_empty() && !url.contains("://") {
            let absolute = std::env::current_dir()
                .map(|cwd| cwd.join(url))
                .map_err(|_| InvalidUrlSnafu { url }.build())?;
            return Ok(Self::parse_local(&absolute.to_string_lossy()));
        }

        InvalidUrlSnafu { url }.fail()
    }

    fn parse_s3(caps: &Captures) -> Self {
        let region = std::env::var("AWS_DEFAULT_REGION")
            .ok()
            .or_else(|| caps.name("region").map(|m| m.as_str().to_string()));
        let endpoint = std::env::var("AWS_ENDPOINT").ok();

        BackendConfig::S3(S3Config {
            endpoint,
            region,
            bucket: caps["bucket"].to_string(),
            key: parse_key(caps),
        })
    }

    fn parse_gcs(caps: &Captures) -> Self {
        BackendConfig::Gcs(GcsConfig {
            bucket: caps["bucket"].to_string(),
            key: parse_key(caps),
        })
    }

    fn parse_local(path: &str) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let trimmed = match path.trim_end_matches('/') {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        BackendConfig::Local(LocalConfig { path: trimmed })
    }

    /// Key prefix inside the bucket, if any. Local roots carry none.
    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Gcs(gcs) => gcs.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }

    /// Short backend name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::S3(_) => "s3",
            BackendConfig::Gcs(_) => "gcs",
            BackendConfig::Local(_) => "local",
        }
    }
}

fn parse_key(caps: &Captures) -> Option<Path> {
    caps.name("key")
        .map(|m| m.as_str().trim_end_matches('/'))
        .filter(|k| !k.is_empty())
        .map(Path::from)
}
