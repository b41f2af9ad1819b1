//! Controller Registry
//!
//! Games declare controllers through [`ControllerRegistry::build`]. Remote
//! bridges address them by [`ControllerId`] and push [`ControllerEvent`]s
//! through an [`InputHandle`]; the engine drains the queue once per tick.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::hooks::GameResult;
use crate::input::gamepad::{Button, ButtonAction, Gamepad, BUTTON_COUNT};

/// Input errors.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// No controller with this id.
    #[error("Unknown controller: {0}")]
    UnknownController(ControllerId),

    /// Controller already has a connected client.
    #[error("Controller {0} is already connected")]
    AlreadyConnected(String),

    /// State text is not a button mask.
    #[error("Invalid state data: {0:?}")]
    InvalidState(String),

    /// The engine stopped accepting input.
    #[error("Input channel closed")]
    Closed,
}

/// Controller identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControllerId(pub Uuid);

impl ControllerId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public description of a controller, as listed to remote clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInfo {
    /// Player-facing label
    pub label: String,
    /// Buttons the game uses
    pub buttons: Vec<Button>,
    /// Whether a client is attached
    pub is_connected: bool,
}

/// Event from a remote client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerEvent {
    /// Client attached
    Connected(ControllerId),
    /// New button mask
    State {
        /// Target controller
        id: ControllerId,
        /// Mask, bit `N-1-i` is button `i`
        bits: u16,
    },
    /// Client detached
    Disconnected(ControllerId),
}

/// Parse a textual state update (a decimal button mask).
pub fn parse_state(text: &str) -> Result<u16, InputError> {
    let bits: u16 = text
        .trim()
        .parse()
        .map_err(|_| InputError::InvalidState(text.to_string()))?;
    if bits >> BUTTON_COUNT != 0 {
        return Err(InputError::InvalidState(text.to_string()));
    }
    Ok(bits)
}

// =============================================================================
// INPUT HANDLE
// =============================================================================

/// Sending half of the engine's input queue.
#[derive(Clone, Debug)]
pub struct InputHandle {
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl InputHandle {
    /// Create a handle and its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event.
    pub fn send(&self, event: ControllerEvent) -> Result<(), InputError> {
        self.tx.send(event).map_err(|_| InputError::Closed)
    }

    /// Queue a connect.
    pub fn connect(&self, id: ControllerId) -> Result<(), InputError> {
        self.send(ControllerEvent::Connected(id))
    }

    /// Queue a state update.
    pub fn state(&self, id: ControllerId, bits: u16) -> Result<(), InputError> {
        self.send(ControllerEvent::State { id, bits })
    }

    /// Queue a state update from its textual form.
    pub fn state_text(&self, id: ControllerId, text: &str) -> Result<(), InputError> {
        self.state(id, parse_state(text)?)
    }

    /// Queue a disconnect.
    pub fn disconnect(&self, id: ControllerId) -> Result<(), InputError> {
        self.send(ControllerEvent::Disconnected(id))
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

struct Controller<C> {
    info: ControllerInfo,
    pad: Gamepad<C>,
}

/// All controllers of a game.
pub struct ControllerRegistry<C> {
    controllers: BTreeMap<ControllerId, Controller<C>>,
}

impl<C> std::fmt::Debug for ControllerRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.controllers.iter().map(|(id, c)| (id, &c.info)))
            .finish()
    }
}

impl<C> Default for ControllerRegistry<C> {
    fn default() -> Self {
        Self { controllers: BTreeMap::new() }
    }
}

impl<C> ControllerRegistry<C> {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring a controller.
    pub fn build(&mut self, label: impl Into<String>, buttons: &[Button]) -> ControllerBuilder<'_, C> {
        ControllerBuilder {
            registry: self,
            id: ControllerId::new(),
            info: ControllerInfo {
                label: label.into(),
                buttons: buttons.to_vec(),
                is_connected: false,
            },
            pad: Gamepad::new(),
        }
    }

    /// Number of controllers.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// True if no controllers are declared.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Controller ids, in id order.
    pub fn ids(&self) -> impl Iterator<Item = ControllerId> + '_ {
        self.controllers.keys().copied()
    }

    /// Info for one controller.
    pub fn info(&self, id: ControllerId) -> Option<&ControllerInfo> {
        self.controllers.get(&id).map(|c| &c.info)
    }

    /// Info for every controller.
    pub fn infos(&self) -> BTreeMap<ControllerId, ControllerInfo> {
        self.controllers.iter().map(|(id, c)| (*id, c.info.clone())).collect()
    }

    /// True if `button` is held on controller `id`.
    pub fn is_pressed(&self, id: ControllerId, button: Button) -> bool {
        self.controllers.get(&id).is_some_and(|c| c.pad.is_pressed(button))
    }

    /// Apply one event.
    pub fn handle(&mut self, event: ControllerEvent, ctx: &mut C) -> GameResult {
        match event {
            ControllerEvent::Connected(id) => {
                let controller = self.get_mut(id)?;
                if controller.info.is_connected {
                    return Err(InputError::AlreadyConnected(controller.info.label.clone()).into());
                }
                controller.info.is_connected = true;
                info!(controller = %id, label = %controller.info.label, "Controller connected");
                Ok(())
            }
            ControllerEvent::State { id, bits } => self.get_mut(id)?.pad.update(bits, ctx),
            ControllerEvent::Disconnected(id) => {
                let controller = self.get_mut(id)?;
                controller.info.is_connected = false;
                info!(controller = %id, label = %controller.info.label, "Controller disconnected");
                controller.pad.release_all(ctx)
            }
        }
    }

    /// Run held periodic actions on every controller. All controllers run
    /// even if one fails; the first failure is returned.
    pub fn run_periodic(&mut self, ctx: &mut C) -> GameResult {
        let mut result = Ok(());
        for controller in self.controllers.values_mut() {
            let ran = controller.pad.run_periodic(ctx);
            if result.is_ok() {
                result = ran;
            }
        }
        result
    }

    /// Move every controller of `other` into this registry.
    pub fn merge(&mut self, other: Self) {
        self.controllers.extend(other.controllers);
    }

    fn get_mut(&mut self, id: ControllerId) -> Result<&mut Controller<C>, InputError> {
        self.controllers.get_mut(&id).ok_or(InputError::UnknownController(id))
    }
}

/// Declares one controller's bindings.
pub struct ControllerBuilder<'a, C> {
    registry: &'a mut ControllerRegistry<C>,
    id: ControllerId,
    info: ControllerInfo,
    pad: Gamepad<C>,
}

impl<'a, C> ControllerBuilder<'a, C> {
    /// Fire once when `button` goes down.
    pub fn on_press<A: ButtonAction<C> + 'static>(mut self, button: Button, action: A) -> Self {
        self.pad.bind_press(button, Box::new(action));
        self
    }

    /// Fire every `every` ticks while `button` is held.
    pub fn on_press_every<A: ButtonAction<C> + 'static>(mut self, button: Button, every: u32, action: A) -> Self {
        self.pad.bind_press_every(button, every, Box::new(action));
        self
    }

    /// Fire once when `button` goes up.
    pub fn on_release<A: ButtonAction<C> + 'static>(mut self, button: Button, action: A) -> Self {
        self.pad.bind_release(button, Box::new(action));
        self
    }

    /// Register the controller.
    pub fn finish(self) -> ControllerId {
        debug!(controller = %self.id, label = %self.info.label, "Controller declared");
        self.registry.controllers.insert(self.id, Controller { info: self.info, pad: self.pad });
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::gamepad::ButtonState;

    #[derive(Default)]
    struct Counter {
        presses: u32,
        releases: u32,
    }

    fn registry() -> (ControllerRegistry<Counter>, ControllerId) {
        let mut registry = ControllerRegistry::new();
        let id = registry
            .build("Player 1", &[Button::A])
            .on_press(Button::A, |c: &mut Counter, _: ButtonState| {
                c.presses += 1;
                Ok(())
            })
            .on_release(Button::A, |c: &mut Counter, _: ButtonState| {
                c.releases += 1;
                Ok(())
            })
            .finish();
        (registry, id)
    }

    #[test]
    fn test_parse_state() {
        assert_eq!(parse_state("512").unwrap(), Button::ArrowUp.mask());
        assert_eq!(parse_state(" 3\n").unwrap(), 3);
        assert!(matches!(parse_state("abc"), Err(InputError::InvalidState(_))));
        assert!(matches!(parse_state("1024"), Err(InputError::InvalidState(_))));
        assert!(parse_state("-1").is_err());
    }

    #[test]
    fn test_info_serializes_camel_case() {
        let (registry, id) = registry();
        let json = serde_json::to_value(registry.info(id).unwrap()).unwrap();
        assert_eq!(json["label"], "Player 1");
        assert_eq!(json["isConnected"], false);
    }

    #[test]
    fn test_connect_state_disconnect() {
        let (mut registry, id) = registry();
        let mut counter = Counter::default();

        registry.handle(ControllerEvent::Connected(id), &mut counter).unwrap();
        assert!(registry.info(id).unwrap().is_connected);
        assert!(registry.handle(ControllerEvent::Connected(id), &mut counter).is_err());

        registry
            .handle(ControllerEvent::State { id, bits: Button::A.mask() }, &mut counter)
            .unwrap();
        assert_eq!(counter.presses, 1);
        assert!(registry.is_pressed(id, Button::A));

        // Disconnect releases held buttons
        registry.handle(ControllerEvent::Disconnected(id), &mut counter).unwrap();
        assert_eq!(counter.releases, 1);
        assert!(!registry.is_pressed(id, Button::A));
        assert!(!registry.info(id).unwrap().is_connected);
    }

    #[test]
    fn test_unknown_controller() {
        let (mut registry, _) = registry();
        let mut counter = Counter::default();
        let err = registry
            .handle(ControllerEvent::Connected(ControllerId::new()), &mut counter)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<InputError>(), Some(InputError::UnknownController(_))));
    }

    #[test]
    fn test_merge_keeps_both() {
        let (mut registry, first) = registry();
        let mut late = ControllerRegistry::<Counter>::new();
        let second = late.build("Player 2", &[]).finish();

        registry.merge(late);
        assert_eq!(registry.len(), 2);
        assert!(registry.info(first).is_some());
        assert!(registry.info(second).is_some());
    }

    #[tokio::test]
    async fn test_handle_queues_in_order() {
        let (handle, mut rx) = InputHandle::channel();
        let id = ControllerId::new();
        handle.connect(id).unwrap();
        handle.state_text(id, "1").unwrap();
        handle.disconnect(id).unwrap();

        assert_eq!(rx.recv().await, Some(ControllerEvent::Connected(id)));
        assert_eq!(rx.recv().await, Some(ControllerEvent::State { id, bits: 1 }));
        assert_eq!(rx.recv().await, Some(ControllerEvent::Disconnected(id)));

        drop(rx);
        assert!(matches!(handle.connect(id), Err(InputError::Closed)));
    }
}
