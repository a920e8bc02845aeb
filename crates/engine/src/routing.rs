//! Service → routing key mapping.
//!
//! Built once at process start and shared read-only afterwards.

use std::collections::HashMap;
use std::fmt;

/// Environment variable prefix: `KEY_scandal=<routing key>`.
pub const ENV_PREFIX: &str = "KEY_";

/// Incident routing credential for one service.
#[derive(Clone, PartialEq, Eq)]
pub struct RoutingKey(String);

impl RoutingKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RoutingKey(<redacted>)")
    }
}

/// Immutable lookup from service name to [`RoutingKey`].
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    keys: HashMap<String, RoutingKey>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `KEY_<service>` variable with a non-empty value.
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = Self::new();
        for (name, value) in vars {
            if let Some(service) = name.strip_prefix(ENV_PREFIX) {
                if !service.is_empty() && !value.is_empty() {
                    table.insert(service, RoutingKey::new(value));
                }
            }
        }
        table
    }

    /// Parse a `service=key` assignment and add it, replacing any earlier key.
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<(), String> {
        match assignment.split_once('=') {
            Some((service, key)) if !service.is_empty() && !key.is_empty() => {
                self.insert(service, RoutingKey::new(key));
                Ok(())
            }
            _ => Err(format!("expected service=key, got '{assignment}'")),
        }
    }

    pub fn insert(&mut self, service: impl Into<String>, key: RoutingKey) {
        self.keys.insert(service.into(), key);
    }

    pub fn lookup(&self, service: &str) -> Option<&RoutingKey> {
        self.keys.get(service)
    }

    /// Configured service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
