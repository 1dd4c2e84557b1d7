//! Device control on top of the portal session and the registry.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use twocold_core::LegacySessionNavigator;
use twocold_store::DeviceRegistry;
use twocold_types::{DeviceEdit, DeviceRecord, DeviceView, Direction, Floor, ParseError};

/// What to do when a device is asked for the state it is already in.
///
/// The portal only accepts "step forward" and "step back", so there is no
/// command that sets a state outright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetStatePolicy {
    /// Post nothing and report the freshly read state.
    #[default]
    SkipIfSatisfied,
    /// Post one command in the requested direction anyway.
    AlwaysPost,
}

/// Errors returned by [`Controller`].
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Remote(#[from] twocold_core::Error),

    #[error(transparent)]
    Registry(#[from] twocold_store::Error),

    #[error("Device {id} not found on floor {floor}")]
    DeviceNotFound { floor: Floor, id: u32 },

    #[error(transparent)]
    InvalidEdit(#[from] ParseError),
}

/// Lists, switches and edits devices.
///
/// The navigator and the registry sit behind separate locks. Remote
/// operations hold the navigator lock for their whole sequence and take the
/// registry lock inside it; edits take only the registry lock.
pub struct Controller {
    navigator: Mutex<LegacySessionNavigator>,
    registry: Mutex<DeviceRegistry>,
    policy: SetStatePolicy,
}

impl Controller {
    pub fn new(
        navigator: LegacySessionNavigator,
        registry: DeviceRegistry,
        policy: SetStatePolicy,
    ) -> Self {
        Self {
            navigator: Mutex::new(navigator),
            registry: Mutex::new(registry),
            policy,
        }
    }

    pub fn policy(&self) -> SetStatePolicy {
        self.policy
    }

    /// Every device on `floor` with its current state.
    pub async fn list(&self, floor: Floor) -> Result<Vec<DeviceView>, ControlError> {
        let mut navigator = self.navigator.lock().await;
        let markup = navigator.reach(floor).await?;
        let records = self.registry.lock().await.list(floor)?;
        Ok(navigator
            .classifier()
            .extract_device_views(&markup, floor, &records))
    }

    /// Switch a device on.
    pub async fn enable(&self, floor: Floor, id: u32) -> Result<Vec<DeviceView>, ControlError> {
        self.set_state(floor, id, true).await
    }

    /// Switch a device off.
    pub async fn disable(&self, floor: Floor, id: u32) -> Result<Vec<DeviceView>, ControlError> {
        self.set_state(floor, id, false).await
    }

    /// Bring a device to `enabled` and return the floor as read afterwards.
    pub async fn set_state(
        &self,
        floor: Floor,
        id: u32,
        enabled: bool,
    ) -> Result<Vec<DeviceView>, ControlError> {
        self.change(floor, id, Some(enabled)).await
    }

    /// Flip a device. Always posts exactly one command.
    pub async fn toggle(&self, floor: Floor, id: u32) -> Result<Vec<DeviceView>, ControlError> {
        self.change(floor, id, None).await
    }

    /// Rename or move a device. The portal is not contacted.
    pub async fn edit(
        &self,
        floor: Floor,
        id: u32,
        edit: &DeviceEdit,
    ) -> Result<DeviceRecord, ControlError> {
        edit.validate()?;
        let mut registry = self.registry.lock().await;
        registry.edit(floor, id, edit).map_err(|e| match e {
            twocold_store::Error::DeviceNotFound { floor, id } => {
                ControlError::DeviceNotFound { floor, id }
            }
            other => ControlError::Registry(other),
        })
    }

    /// `desired` of `None` means the opposite of the current state.
    async fn change(
        &self,
        floor: Floor,
        id: u32,
        desired: Option<bool>,
    ) -> Result<Vec<DeviceView>, ControlError> {
        let mut navigator = self.navigator.lock().await;
        let markup = navigator.reach(floor).await?;
        let records = self.registry.lock().await.list(floor)?;
        let views = navigator
            .classifier()
            .extract_device_views(&markup, floor, &records);

        let current = views
            .iter()
            .find(|view| view.id() == id)
            .ok_or(ControlError::DeviceNotFound { floor, id })?;

        let enabled = desired.unwrap_or(!current.enabled);
        if desired.is_some()
            && enabled == current.enabled
            && self.policy == SetStatePolicy::SkipIfSatisfied
        {
            info!(
                "Device {} on floor {} is already {}",
                id,
                floor,
                if enabled { "on" } else { "off" }
            );
            return Ok(views);
        }

        let record = current.record.clone();
        navigator
            .send_directional(&record, Direction::towards(enabled))
            .await?;

        let markup = navigator.reach(floor).await?;
        Ok(navigator
            .classifier()
            .extract_device_views(&markup, floor, &records))
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
