//! Process configuration for the example managers

use crate::{Error, Result};

/// Default metrics port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default webhook port
pub const DEFAULT_WEBHOOK_PORT: u16 = 9443;

/// Namespace the namespaced examples watch
pub const DEFAULT_NAMESPACE: &str = "default";

/// Manager configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Namespace to watch; `None` watches cluster-wide
    pub namespace: Option<String>,
    pub metrics_port: u16,
    pub webhook_port: u16,
}

impl ManagerConfig {
    /// Configuration scoped to a single namespace
    pub fn namespaced(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            metrics_port: DEFAULT_METRICS_PORT,
            webhook_port: DEFAULT_WEBHOOK_PORT,
        }
    }

    /// Cluster-wide configuration
    pub fn cluster_wide() -> Self {
        Self {
            namespace: None,
            metrics_port: DEFAULT_METRICS_PORT,
            webhook_port: DEFAULT_WEBHOOK_PORT,
        }
    }

    /// Apply `WATCH_NAMESPACE`, `METRICS_PORT` and `WEBHOOK_PORT` overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ns) = lookup("WATCH_NAMESPACE") {
            let ns = ns.trim();
            self.namespace = if ns.is_empty() || ns == "*" {
                None
            } else {
                Some(ns.to_string())
            };
        }
        if let Some(port) = lookup("METRICS_PORT") {
            self.metrics_port = parse_port("METRICS_PORT", &port)?;
        }
        if let Some(port) = lookup("WEBHOOK_PORT") {
            self.webhook_port = parse_port("WEBHOOK_PORT", &port)?;
        }
        Ok(self)
    }

    /// Human readable watch scope
    pub fn scope(&self) -> &str {
        self.namespace.as_deref().unwrap_or("cluster-wide")
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| Error::Config(format!("{} must be a port number, got '{}': {}", key, value, e)))
}
