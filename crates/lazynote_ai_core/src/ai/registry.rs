//! In-process AI backend registry and active-provider selection.

use crate::ai::config::{AiBackendConfig, AiProvider};
use crate::ai::error::{AiError, AiResult};
use crate::ai::transport::PromptTransport;
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Backend registration/selection errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRegistryError {
    InvalidConfig(AiError),
    DuplicateProvider(AiProvider),
    ProviderNotFound(String),
}

impl Display for BackendRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(err) => write!(f, "backend config is invalid: {err}"),
            Self::DuplicateProvider(provider) => {
                write!(f, "backend already registered: {}", provider.as_str())
            }
            Self::ProviderNotFound(value) => write!(f, "backend not found: {value}"),
        }
    }
}

impl Error for BackendRegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

struct RegisteredBackend {
    config: AiBackendConfig,
    transport: Arc<dyn PromptTransport>,
}

/// Registry of validated backends, at most one of which is active.
#[derive(Default)]
pub struct BackendRegistry {
    backends: BTreeMap<AiProvider, RegisteredBackend>,
    active: Option<AiProvider>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one backend after validating its config.
    pub fn register(
        &mut self,
        config: AiBackendConfig,
        transport: Arc<dyn PromptTransport>,
    ) -> Result<(), BackendRegistryError> {
        config
            .validate()
            .map_err(BackendRegistryError::InvalidConfig)?;
        let provider = config.provider;
        if self.backends.contains_key(&provider) {
            return Err(BackendRegistryError::DuplicateProvider(provider));
        }

        self.backends
            .insert(provider, RegisteredBackend { config, transport });
        info!(
            "event=ai_backend_register module=ai status=ok provider={}",
            provider.as_str()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Selects the active backend by provider id.
    pub fn select_active(&mut self, provider_id: &str) -> Result<(), BackendRegistryError> {
        let normalized = provider_id.trim();
        let provider = AiProvider::parse(normalized)
            .filter(|provider| self.backends.contains_key(provider))
            .ok_or_else(|| BackendRegistryError::ProviderNotFound(normalized.to_string()))?;
        self.active = Some(provider);
        Ok(())
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Returns whether an active backend is ready for calls.
    pub fn is_configured(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_provider(&self) -> Option<AiProvider> {
        self.active
    }

    /// Returns the active backend's config.
    pub fn active_config(&self) -> Option<&AiBackendConfig> {
        self.active
            .and_then(|provider| self.backends.get(&provider))
            .map(|backend| &backend.config)
    }

    /// Returns the active transport, or `MissingCredential` when none is set.
    pub fn active_transport(&self) -> AiResult<Arc<dyn PromptTransport>> {
        self.active
            .and_then(|provider| self.backends.get(&provider))
            .map(|backend| Arc::clone(&backend.transport))
            .ok_or(AiError::MissingCredential)
    }
}
