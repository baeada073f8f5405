//! The device bridge: adapters for each device kind, the component registry,
//! and the event mirror that keeps host state in step with the hub.

mod adapter;
mod climate;
mod cover;
mod entity_id;
mod entries;
mod integration;
mod light;
mod mirror;
mod registry;
mod switch;

pub use adapter::Command;
pub use adapter::EntityAdapter;
pub use adapter::MANUFACTURER;
pub use adapter::Status;
pub use climate::ClimateStatus;
pub use climate::HvacMode;
pub use cover::CoverState;
pub use cover::CoverStatus;
pub use entity_id::EntityIdAllocator;
pub use entity_id::slugify;
pub use entries::ConfigEntries;
pub use integration::HomecenterIntegration;
pub use light::LightStatus;
pub use light::brightness_to_device;
pub use light::brightness_to_host;
pub use mirror::EventMirror;
pub use registry::Registry;
pub use switch::OnOffStatus;
