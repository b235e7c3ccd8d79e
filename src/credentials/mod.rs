//! Credential Store collaborator.
//!
//! Maps a service identifier (e.g. `"OpenWeatherMap"`) to its secret. The
//! engine only reads the store to check whether a synthesized capability's
//! credentials are satisfiable and to substitute placeholders; writes come
//! from the caller when it answers a credential request. Durable storage is
//! the caller's concern: implement [`CredentialStore`] over it.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;

/// Read/write access to service secrets.
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Secret for `service`, if present. Lookup is case-sensitive.
    fn get(&self, service: &str) -> Option<String>;

    /// Store or replace the secret for `service`.
    fn put(&self, service: &str, secret: &str);

    /// Whether a secret exists for `service`.
    fn contains(&self, service: &str) -> bool {
        self.get(service).is_some()
    }
}

/// Process-local credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Service names only; secrets stay out of debug output.
        let mut services: Vec<String> = self.secrets.read().keys().cloned().collect();
        services.sort();
        f.debug_struct("InMemoryCredentialStore")
            .field("services", &services)
            .finish()
    }
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from `(service, secret)` pairs.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let secrets = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            secrets: RwLock::new(secrets),
        }
    }

    /// Seed a store from environment variables named `<prefix><SERVICE>`.
    ///
    /// `TOOLSMITH_KEY_OpenWeatherMap=abc` with prefix `TOOLSMITH_KEY_` yields
    /// service `OpenWeatherMap`. Empty values are skipped.
    pub fn from_env_prefix(prefix: &str) -> Self {
        Self::with_entries(std::env::vars().filter_map(|(key, value)| {
            let service = key.strip_prefix(prefix)?;
            if service.is_empty() || value.is_empty() {
                return None;
            }
            Some((service.to_string(), value))
        }))
    }

    /// Registered service identifiers, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut services: Vec<String> = self.secrets.read().keys().cloned().collect();
        services.sort();
        services
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, service: &str) -> Option<String> {
        self.secrets.read().get(service).cloned()
    }

    fn put(&self, service: &str, secret: &str) {
        log::info!("Stored credential for service: {}", service);
        self.secrets
            .write()
            .insert(service.to_string(), secret.to_string());
    }
}
