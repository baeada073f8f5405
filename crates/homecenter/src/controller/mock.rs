//! Mock controller and channel for tests.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use super::Channel;
use super::ChannelCommand;
use super::ChannelReading;
use super::Component;
use super::ComponentId;
use super::Controller;
use super::Credentials;
use super::DeviceKind;
use super::EventHandler;
use super::EventHandlers;
use super::EventKind;
use super::StatusUpdate;
use crate::error::CommandError;
use crate::error::ConnectError;
use crate::error::DiscoveryError;

/// Channel that records every command it is sent.
#[derive(Debug)]
pub struct MockChannel {
    pub id: ComponentId,
    pub name: String,
    pub reading: Mutex<ChannelReading>,
    pub sent: Mutex<Vec<ChannelCommand>>,
    pub fail_with: Mutex<Option<CommandError>>,
}

impl MockChannel {
    pub fn new(id: u32, name: &str, reading: ChannelReading) -> Arc<Self> {
        Arc::new(Self {
            id: ComponentId(id),
            name: name.to_string(),
            reading: Mutex::new(reading),
            sent: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
        })
    }

    pub fn sent(&self) -> Vec<ChannelCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_next(&self, error: CommandError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn reading(&self) -> ChannelReading {
        self.reading.lock().unwrap().clone()
    }

    async fn send(&self, command: ChannelCommand) -> Result<(), CommandError> {
        if let Some(error) = self.fail_with.lock().unwrap().take() {
            return Err(error);
        }
        self.sent.lock().unwrap().push(command);
        Ok(())
    }
}

/// Controller whose components and events are scripted by the test.
///
/// Clones share state, so a test can hand one clone to the bridge and keep
/// another to fire events and inspect calls.
#[derive(Clone, Default)]
pub struct MockController {
    components: Arc<Mutex<Vec<Component>>>,
    pub handlers: EventHandlers,
    calls: Arc<Mutex<Vec<String>>>,
    connect_error: Arc<Mutex<Option<ConnectError>>>,
    discovery_error: Arc<Mutex<Option<DiscoveryError>>>,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component backed by a fresh [`MockChannel`].
    pub fn add(&self, id: u32, description: &str, reading: ChannelReading) -> Arc<MockChannel> {
        let channel = MockChannel::new(id, description, reading.clone());
        self.add_with_kind(id, reading.kind(), description, channel.clone());
        channel
    }

    pub fn add_with_kind(
        &self,
        id: u32,
        kind: DeviceKind,
        description: &str,
        channel: Arc<MockChannel>,
    ) {
        self.components.lock().unwrap().push(Component {
            id: ComponentId(id),
            kind,
            description: description.to_string(),
            channel,
        });
    }

    pub fn component(&self, id: u32) -> Option<Component> {
        self.components
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == ComponentId(id))
            .cloned()
    }

    /// Deliver an event for a known component, as the hub would.
    pub fn fire(&self, id: u32, update: StatusUpdate) -> bool {
        let component = self
            .component(id)
            .unwrap_or_else(|| panic!("no mock component {}", id));
        self.handlers.dispatch(&component, &update)
    }

    pub fn fail_connect(&self, error: ConnectError) {
        *self.connect_error.lock().unwrap() = Some(error);
    }

    pub fn fail_discovery(&self, error: DiscoveryError) {
        *self.discovery_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl Controller for MockController {
    async fn connect(&mut self, credentials: &Credentials) -> Result<(), ConnectError> {
        self.record(format!("connect {}", credentials.address));
        match self.connect_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn request_components(&mut self) -> Result<(), DiscoveryError> {
        self.record("request_components");
        match self.discovery_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn await_components(&mut self) -> Result<(), DiscoveryError> {
        self.record("await_components");
        Ok(())
    }

    fn get_all(&self, kind: DeviceKind) -> Vec<Component> {
        self.components
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    fn on(&mut self, event: EventKind, handler: Arc<dyn EventHandler>) {
        self.record(format!("on {}", event));
        self.handlers.register(event, handler);
    }

    async fn close(&mut self) {
        self.record("close");
        self.handlers.clear();
    }
}
