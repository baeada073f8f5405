//! In-process simulated hub.
//!
//! Components come from configuration. Commands change the simulated device
//! and the hub answers with the status-update event a real hub would send,
//! delivered in order from a single dispatch task.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;

use super::Channel;
use super::ChannelCommand;
use super::ChannelReading;
use super::Component;
use super::ComponentId;
use super::Controller;
use super::Credentials;
use super::DEVICE_MAX_BRIGHTNESS;
use super::DeviceKind;
use super::EventHandler;
use super::EventHandlers;
use super::EventKind;
use super::InputState;
use super::ShadeState;
use super::StatusUpdate;
use super::ThermostatMode;
use super::ThermostatReading;
use crate::error::CommandError;
use crate::error::ConnectError;
use crate::error::DiscoveryError;

/// One component of the simulated hub's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentSpec {
    pub id: u32,
    pub kind: DeviceKind,
    pub name: String,
}

type Dispatch = (ComponentId, StatusUpdate);

/// Path from channels back to the dispatch task. Empty once closed.
#[derive(Default)]
struct HubLink {
    tx: Mutex<Option<mpsc::UnboundedSender<Dispatch>>>,
}

impl HubLink {
    fn attach(&self, tx: mpsc::UnboundedSender<Dispatch>) {
        *self.tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }

    fn detach(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn is_attached(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn emit(&self, id: ComponentId, update: StatusUpdate) -> Result<(), CommandError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx
                .send((id, update))
                .map_err(|_| CommandError::ChannelGone(id)),
            None => Err(CommandError::ChannelGone(id)),
        }
    }
}

#[derive(Debug, Clone)]
enum VirtualDevice {
    Dimmer { brightness: u8, last_on: u8 },
    Toggle { on: bool },
    Input { state: InputState },
    Shade { state: ShadeState },
    Thermostat(ThermostatReading),
}

impl VirtualDevice {
    fn for_kind(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Light => Self::Dimmer {
                brightness: 0,
                last_on: DEVICE_MAX_BRIGHTNESS,
            },
            DeviceKind::Switch => Self::Toggle { on: false },
            DeviceKind::BinarySensor => Self::Input {
                state: InputState::Off,
            },
            DeviceKind::Cover => Self::Shade {
                state: ShadeState::Closed,
            },
            DeviceKind::Thermostat => Self::Thermostat(ThermostatReading {
                current_temperature: Some(20.0),
                target_temperature: 20.0,
                current_preset: Some("Comfort".to_string()),
                presets: vec![
                    "Comfort".to_string(),
                    "Eco".to_string(),
                    "Night".to_string(),
                ],
                modes: vec![
                    ThermostatMode::Off,
                    ThermostatMode::Auto,
                    ThermostatMode::Heat,
                ],
                current_mode: ThermostatMode::Heat,
            }),
        }
    }

    fn reading(&self) -> ChannelReading {
        match self {
            Self::Dimmer { brightness, .. } => ChannelReading::Dimmer {
                brightness: *brightness,
            },
            Self::Toggle { on } => ChannelReading::Toggle { on: *on },
            Self::Input { state } => ChannelReading::Input { state: *state },
            Self::Shade { state } => ChannelReading::Shade { state: *state },
            Self::Thermostat(reading) => ChannelReading::Thermostat(reading.clone()),
        }
    }

    /// Apply a command and return the events the hub reports for it.
    fn apply(&mut self, command: ChannelCommand) -> Result<Vec<StatusUpdate>, CommandError> {
        match (self, command) {
            (Self::Dimmer { brightness, last_on }, ChannelCommand::SetBrightness(value)) => {
                if value > DEVICE_MAX_BRIGHTNESS {
                    return Err(CommandError::Rejected(format!(
                        "brightness {} exceeds {}",
                        value, DEVICE_MAX_BRIGHTNESS
                    )));
                }
                *brightness = value;
                if value > 0 {
                    *last_on = value;
                }
                Ok(vec![StatusUpdate::Light { brightness: value }])
            }
            (Self::Dimmer { brightness, last_on }, ChannelCommand::RestoreBrightness) => {
                *brightness = *last_on;
                Ok(vec![StatusUpdate::Light {
                    brightness: *last_on,
                }])
            }
            (Self::Toggle { on }, ChannelCommand::TurnOn) => {
                *on = true;
                Ok(vec![StatusUpdate::Switch { value: 1 }])
            }
            (Self::Toggle { on }, ChannelCommand::TurnOff) => {
                *on = false;
                Ok(vec![StatusUpdate::Switch { value: 0 }])
            }
            (Self::Shade { state }, ChannelCommand::Open) => {
                Ok(Self::travel(state, ShadeState::Opening, ShadeState::Open))
            }
            (Self::Shade { state }, ChannelCommand::Close) => {
                Ok(Self::travel(state, ShadeState::Closing, ShadeState::Closed))
            }
            (Self::Shade { state }, ChannelCommand::Stop) => {
                let previous = std::mem::replace(state, ShadeState::Stopped);
                Ok(vec![StatusUpdate::Shade {
                    previous,
                    current: ShadeState::Stopped,
                }])
            }
            (Self::Thermostat(reading), command) => Self::apply_thermostat(reading, command),
            (device, command) => Err(CommandError::Rejected(format!(
                "{:?} cannot handle {:?}",
                device.reading().kind(),
                command
            ))),
        }
    }

    /// Shades in the simulation reach their end position immediately, but
    /// still report the intermediate motion.
    fn travel(state: &mut ShadeState, moving: ShadeState, end: ShadeState) -> Vec<StatusUpdate> {
        let previous = std::mem::replace(state, end);
        vec![
            StatusUpdate::Shade {
                previous,
                current: moving,
            },
            StatusUpdate::Shade {
                previous: moving,
                current: end,
            },
        ]
    }

    fn apply_thermostat(
        reading: &mut ThermostatReading,
        command: ChannelCommand,
    ) -> Result<Vec<StatusUpdate>, CommandError> {
        match command {
            ChannelCommand::SetTargetTemperature(value) if value.is_finite() => {
                reading.target_temperature = value;
            }
            ChannelCommand::SetTargetTemperature(value) => {
                return Err(CommandError::Rejected(format!(
                    "target temperature {} is not a number",
                    value
                )));
            }
            ChannelCommand::SetPreset(preset) => {
                if !reading.presets.contains(&preset) {
                    return Err(CommandError::Rejected(format!("unknown preset '{}'", preset)));
                }
                reading.current_preset = Some(preset);
            }
            ChannelCommand::SetMode(mode) => {
                if !reading.modes.contains(&mode) {
                    return Err(CommandError::Rejected(format!("unsupported mode {}", mode)));
                }
                reading.current_mode = mode;
            }
            other => {
                return Err(CommandError::Rejected(format!(
                    "thermostat cannot handle {:?}",
                    other
                )));
            }
        }

        Ok(vec![StatusUpdate::Thermostat {
            current_temperature: reading.current_temperature.unwrap_or(reading.target_temperature),
            preset: reading.current_preset.clone().unwrap_or_default(),
            target_temperature: reading.target_temperature,
            mode: reading.current_mode,
        }])
    }
}

struct VirtualChannel {
    id: ComponentId,
    name: String,
    device: Mutex<VirtualDevice>,
    link: Arc<HubLink>,
}

#[async_trait]
impl Channel for VirtualChannel {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn reading(&self) -> ChannelReading {
        self.device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reading()
    }

    async fn send(&self, command: ChannelCommand) -> Result<(), CommandError> {
        if !self.link.is_attached() {
            return Err(CommandError::ChannelGone(self.id));
        }

        debug!("Virtual hub: component {} <- {:?}", self.id, command);
        let updates = self
            .device
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(command)?;

        for update in updates {
            self.link.emit(self.id, update)?;
        }
        Ok(())
    }
}

/// A [`Controller`] backed by simulated devices.
pub struct VirtualHomecenter {
    inventory: Vec<ComponentSpec>,
    link: Arc<HubLink>,
    components: Arc<Mutex<Vec<Component>>>,
    handlers: EventHandlers,
    connected: bool,
    requested: bool,
    discovered: bool,
    dispatch_task: Option<JoinHandle<()>>,
}

impl VirtualHomecenter {
    pub fn new(inventory: Vec<ComponentSpec>) -> Self {
        Self {
            inventory,
            link: Arc::new(HubLink::default()),
            components: Arc::new(Mutex::new(Vec::new())),
            handlers: EventHandlers::new(),
            connected: false,
            requested: false,
            discovered: false,
            dispatch_task: None,
        }
    }

    /// Report a change that originated on the hub side (a wall switch, a
    /// sensor tripping). Returns false when the hub is not connected.
    pub fn simulate(&self, id: u32, update: StatusUpdate) -> bool {
        self.link.emit(ComponentId(id), update).is_ok()
    }

    async fn dispatch_loop(
        mut rx: mpsc::UnboundedReceiver<Dispatch>,
        components: Arc<Mutex<Vec<Component>>>,
        handlers: EventHandlers,
    ) {
        while let Some((id, update)) = rx.recv().await {
            let component = components
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|c| c.id == id)
                .cloned();

            match component {
                Some(component) => {
                    handlers.dispatch(&component, &update);
                }
                None => debug!("Virtual hub: event for unknown component {}", id),
            }
        }
        debug!("Virtual hub dispatch loop exiting");
    }
}

#[async_trait]
impl Controller for VirtualHomecenter {
    async fn connect(&mut self, credentials: &Credentials) -> Result<(), ConnectError> {
        if credentials.username.is_empty() {
            return Err(ConnectError::Authentication {
                username: credentials.username.clone(),
            });
        }
        if credentials.address.rsplit_once(':').is_none() {
            return Err(ConnectError::Unreachable {
                address: credentials.address.clone(),
                reason: "address must be host:port".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.link.attach(tx);
        let task = tokio::spawn(Self::dispatch_loop(
            rx,
            self.components.clone(),
            self.handlers.clone(),
        ));
        self.dispatch_task = Some(task);
        self.connected = true;

        info!(
            "Virtual hub connected at {} as {}",
            credentials.address, credentials.username
        );
        Ok(())
    }

    async fn request_components(&mut self) -> Result<(), DiscoveryError> {
        if !self.connected {
            return Err(DiscoveryError::NotConnected);
        }

        let components = self
            .inventory
            .iter()
            .map(|spec| {
                let id = ComponentId(spec.id);
                let channel = Arc::new(VirtualChannel {
                    id,
                    name: spec.name.clone(),
                    device: Mutex::new(VirtualDevice::for_kind(spec.kind)),
                    link: self.link.clone(),
                });
                Component {
                    id,
                    kind: spec.kind,
                    description: spec.name.clone(),
                    channel,
                }
            })
            .collect();

        *self
            .components
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = components;
        self.requested = true;
        Ok(())
    }

    async fn await_components(&mut self) -> Result<(), DiscoveryError> {
        if !self.requested {
            return Err(DiscoveryError::NotRequested);
        }
        self.discovered = true;
        debug!(
            "Virtual hub reported {} components",
            self.inventory.len()
        );
        Ok(())
    }

    fn get_all(&self, kind: DeviceKind) -> Vec<Component> {
        if !self.discovered {
            return Vec::new();
        }
        let mut components: Vec<Component> = self
            .components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect();
        components.sort_by_key(|c| c.id);
        components
    }

    fn on(&mut self, event: EventKind, handler: Arc<dyn EventHandler>) {
        self.handlers.register(event, handler);
    }

    async fn close(&mut self) {
        self.link.detach();
        self.handlers.clear();
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
        self.connected = false;
        info!("Virtual hub connection closed");
    }
}

impl Drop for VirtualHomecenter {
    fn drop(&mut self) {
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn spec(id: u32, kind: DeviceKind, name: &str) -> ComponentSpec {
        ComponentSpec {
            id,
            kind,
            name: name.to_string(),
        }
    }

    fn credentials() -> Credentials {
        Credentials::new("admin", "secret", "127.0.0.1:4000")
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(ComponentId, StatusUpdate)>>,
    }

    impl EventHandler for Recorder {
        fn handle(&self, component: &Component, update: &StatusUpdate) {
            self.seen
                .lock()
                .unwrap()
                .push((component.id, update.clone()));
        }
    }

    impl Recorder {
        async fn wait_for(&self, count: usize) -> Vec<(ComponentId, StatusUpdate)> {
            for _ in 0..200 {
                {
                    let seen = self.seen.lock().unwrap();
                    if seen.len() >= count {
                        return seen.clone();
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("expected {} events", count);
        }
    }

    async fn connected(inventory: Vec<ComponentSpec>) -> VirtualHomecenter {
        let mut hub = VirtualHomecenter::new(inventory);
        hub.connect(&credentials()).await.unwrap();
        hub.request_components().await.unwrap();
        hub.await_components().await.unwrap();
        hub
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_username() {
        let mut hub = VirtualHomecenter::new(Vec::new());
        let result = hub
            .connect(&Credentials::new("", "secret", "127.0.0.1:4000"))
            .await;
        assert!(matches!(result, Err(ConnectError::Authentication { .. })));
    }

    #[tokio::test]
    async fn test_connect_rejects_address_without_port() {
        let mut hub = VirtualHomecenter::new(Vec::new());
        let result = hub
            .connect(&Credentials::new("admin", "secret", "hub.local"))
            .await;
        assert!(matches!(result, Err(ConnectError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_discovery_is_two_phase() {
        let mut hub = VirtualHomecenter::new(vec![spec(1, DeviceKind::Light, "Hall")]);
        assert_eq!(
            hub.request_components().await,
            Err(DiscoveryError::NotConnected)
        );

        hub.connect(&credentials()).await.unwrap();
        assert_eq!(
            hub.await_components().await,
            Err(DiscoveryError::NotRequested)
        );

        hub.request_components().await.unwrap();
        assert!(hub.get_all(DeviceKind::Light).is_empty());
        hub.await_components().await.unwrap();
        assert_eq!(hub.get_all(DeviceKind::Light).len(), 1);
    }

    #[tokio::test]
    async fn test_get_all_filters_by_kind_and_sorts() {
        let hub = connected(vec![
            spec(9, DeviceKind::Light, "B"),
            spec(2, DeviceKind::Switch, "S"),
            spec(4, DeviceKind::Light, "A"),
        ])
        .await;

        let ids: Vec<_> = hub
            .get_all(DeviceKind::Light)
            .iter()
            .map(|c| c.id.0)
            .collect();
        assert_eq!(ids, vec![4, 9]);
        assert_eq!(hub.get_all(DeviceKind::Cover).len(), 0);
    }

    #[tokio::test]
    async fn test_dimmer_command_emits_status_update() {
        let mut hub = connected(vec![spec(7, DeviceKind::Light, "Kitchen")]).await;
        let recorder = Arc::new(Recorder::default());
        hub.on(EventKind::StatusUpdateLight, recorder.clone());

        let light = hub.get_all(DeviceKind::Light).remove(0);
        light
            .channel
            .send(ChannelCommand::SetBrightness(120))
            .await
            .unwrap();
        light.channel.send(ChannelCommand::SetBrightness(0)).await.unwrap();
        light
            .channel
            .send(ChannelCommand::RestoreBrightness)
            .await
            .unwrap();

        let seen = recorder.wait_for(3).await;
        assert_eq!(
            seen.into_iter().map(|(_, u)| u).collect::<Vec<_>>(),
            vec![
                StatusUpdate::Light { brightness: 120 },
                StatusUpdate::Light { brightness: 0 },
                StatusUpdate::Light { brightness: 120 },
            ]
        );
        assert_eq!(
            light.channel.reading(),
            ChannelReading::Dimmer { brightness: 120 }
        );
    }

    #[tokio::test]
    async fn test_dimmer_rejects_out_of_range_brightness() {
        let hub = connected(vec![spec(7, DeviceKind::Light, "Kitchen")]).await;
        let light = hub.get_all(DeviceKind::Light).remove(0);
        let result = light.channel.send(ChannelCommand::SetBrightness(201)).await;
        assert!(matches!(result, Err(CommandError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_shade_reports_motion_then_end_position() {
        let mut hub = connected(vec![spec(5, DeviceKind::Cover, "Blind")]).await;
        let recorder = Arc::new(Recorder::default());
        hub.on(EventKind::StatusUpdateShade, recorder.clone());

        let shade = hub.get_all(DeviceKind::Cover).remove(0);
        shade.channel.send(ChannelCommand::Open).await.unwrap();

        let seen = recorder.wait_for(2).await;
        assert_eq!(
            seen[0].1,
            StatusUpdate::Shade {
                previous: ShadeState::Closed,
                current: ShadeState::Opening
            }
        );
        assert_eq!(
            seen[1].1,
            StatusUpdate::Shade {
                previous: ShadeState::Opening,
                current: ShadeState::Open
            }
        );
    }

    #[tokio::test]
    async fn test_thermostat_rejects_unknown_preset_and_mode() {
        let hub = connected(vec![spec(9, DeviceKind::Thermostat, "Living")]).await;
        let thermostat = hub.get_all(DeviceKind::Thermostat).remove(0);

        let preset = thermostat
            .channel
            .send(ChannelCommand::SetPreset("Party".to_string()))
            .await;
        assert!(matches!(preset, Err(CommandError::Rejected(_))));

        let mode = thermostat
            .channel
            .send(ChannelCommand::SetMode(ThermostatMode::Cool))
            .await;
        assert!(matches!(mode, Err(CommandError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_input_accepts_no_commands() {
        let hub = connected(vec![spec(3, DeviceKind::BinarySensor, "Door")]).await;
        let input = hub.get_all(DeviceKind::BinarySensor).remove(0);
        let result = input.channel.send(ChannelCommand::TurnOn).await;
        assert!(matches!(result, Err(CommandError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_commands_fail_after_close() {
        let mut hub = connected(vec![spec(3, DeviceKind::Switch, "Pump")]).await;
        let switch = hub.get_all(DeviceKind::Switch).remove(0);
        hub.close().await;

        let result = switch.channel.send(ChannelCommand::TurnOn).await;
        assert_eq!(result, Err(CommandError::ChannelGone(ComponentId(3))));
        assert!(!hub.simulate(3, StatusUpdate::Switch { value: 1 }));
    }

    #[tokio::test]
    async fn test_simulated_hub_change_reaches_handler() {
        let mut hub = connected(vec![spec(11, DeviceKind::BinarySensor, "Motion")]).await;
        let recorder = Arc::new(Recorder::default());
        hub.on(EventKind::StatusUpdateInput, recorder.clone());

        assert!(hub.simulate(
            11,
            StatusUpdate::Input {
                state: InputState::On
            }
        ));

        let seen = recorder.wait_for(1).await;
        assert_eq!(seen[0].0, ComponentId(11));
    }
}
