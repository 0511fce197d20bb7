//! File-backed CIDR/address list.
//!
//! One entry per line; blank lines and `#` comments are skipped. Bare
//! addresses are stored as host networks (/32 or /128).

use std::fs;
use std::net::IpAddr;
use std::path::Path;

use async_trait::async_trait;
use ipnet::IpNet;

use crate::store::{BackingStore, StoreError};

/// An immutable set of networks, read once at construction.
#[derive(Debug, Clone)]
pub struct FileStore {
    source: String,
    networks: Vec<IpNet>,
}

impl FileStore {
    /// Read and parse a list file. Fails if unreadable, empty, or any line is malformed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let source = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: source.clone(),
            source: e,
        })?;
        let store = Self::parse(&source, content.lines())?;
        tracing::info!(path = %source, entries = store.len(), "Loaded address list");
        Ok(store)
    }

    /// Build from in-memory entries (e.g. an inline `cidrs` setting).
    pub fn from_entries<I, S>(source: &str, entries: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<S> = entries.into_iter().collect();
        Self::parse(source, lines.iter().map(|s| s.as_ref()))
    }

    fn parse<'a>(source: &str, lines: impl Iterator<Item = &'a str>) -> Result<Self, StoreError> {
        let mut networks = Vec::new();
        for (idx, raw) in lines.enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let network = parse_network(line).ok_or_else(|| StoreError::Parse {
                path: source.to_string(),
                line: idx + 1,
                value: line.to_string(),
            })?;
            networks.push(network);
        }

        if networks.is_empty() {
            return Err(StoreError::Empty(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            networks,
        })
    }

    /// Check whether an address falls inside any configured network.
    pub fn contains_ip(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|net| net.contains(&ip))
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

fn parse_network(value: &str) -> Option<IpNet> {
    if let Ok(net) = value.parse::<IpNet>() {
        return Some(net.trunc());
    }
    value.parse::<IpAddr>().ok().map(IpNet::from)
}

#[async_trait]
impl BackingStore for FileStore {
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(key
            .trim()
            .parse::<IpAddr>()
            .map(|ip| self.contains_ip(ip))
            .unwrap_or(false))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.source)
    }
}
