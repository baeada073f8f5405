use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;

use super::adapter::Command;
use super::integration::HomecenterIntegration;
use crate::controller::Controller;
use crate::controller::Credentials;
use crate::controller::DeviceKind;
use crate::engine::Host;
use crate::engine::StateStore;
use crate::error::CommandError;
use crate::error::SetupError;

/// Every loaded config entry, keyed by entry id, plus the host they share.
///
/// Setup and unload are explicit; nothing here is global.
pub struct ConfigEntries {
    host: Arc<StateStore>,
    entries: Mutex<BTreeMap<String, HomecenterIntegration>>,
}

impl ConfigEntries {
    pub fn new(host: Arc<StateStore>) -> Self {
        Self {
            host,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn host(&self) -> &Arc<StateStore> {
        &self.host
    }

    pub async fn setup_entry(
        &self,
        entry_id: &str,
        credentials: &Credentials,
        controller: Box<dyn Controller>,
    ) -> Result<(), SetupError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(entry_id) {
            return Err(SetupError::AlreadyLoaded(entry_id.to_string()));
        }

        let host: Arc<dyn Host> = self.host.clone();
        let integration =
            HomecenterIntegration::setup(entry_id, credentials, controller, host).await?;
        entries.insert(entry_id.to_string(), integration);
        Ok(())
    }

    /// Unload one entry. Returns false if it was not loaded.
    pub async fn unload_entry(&self, entry_id: &str) -> bool {
        let integration = self.entries.lock().await.remove(entry_id);
        match integration {
            Some(integration) => {
                integration.unload().await;
                true
            }
            None => false,
        }
    }

    pub async fn unload_all(&self) {
        let entries = std::mem::take(&mut *self.entries.lock().await);
        for (_, integration) in entries {
            integration.unload().await;
        }
        info!("All entries unloaded");
    }

    pub async fn entry_ids(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }

    /// Forward a command to whichever entry owns `entity_id`.
    pub async fn apply_command(&self, entity_id: &str, command: Command) -> Result<(), CommandError> {
        let entries = self.entries.lock().await;
        let entry = entries
            .values()
            .find(|entry| entry.owns(entity_id))
            .ok_or_else(|| CommandError::UnknownEntity(entity_id.to_string()))?;
        entry.apply_command(entity_id, command).await
    }

    /// Handle a host service call such as `light.turn_on`.
    ///
    /// `data` must carry the target `entity_id`; the rest is service data.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: &Value,
    ) -> Result<(), CommandError> {
        let kind = DeviceKind::from_platform(domain)
            .ok_or_else(|| CommandError::InvalidArgument(format!("unknown domain '{}'", domain)))?;

        let entity_id = data
            .get("entity_id")
            .and_then(Value::as_str)
            .ok_or_else(|| CommandError::InvalidArgument("missing entity_id".to_string()))?;

        if entity_id.split_once('.').map(|(d, _)| d) != Some(domain) {
            return Err(CommandError::InvalidArgument(format!(
                "entity '{}' is not in domain '{}'",
                entity_id, domain
            )));
        }

        match Command::from_service(kind, service, data)? {
            Some(command) => self.apply_command(entity_id, command).await,
            None => {
                debug!("{}.{} on {} has nothing to do", domain, service, entity_id);
                Ok(())
            }
        }
    }
}
