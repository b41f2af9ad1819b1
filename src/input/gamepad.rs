//! Gamepad State and Button Bindings
//!
//! A controller reports its ten buttons as a bitmask where bit `N-1-i`
//! holds button `i`. The gamepad turns state updates into press and release
//! edges and fires the actions bound to them.

use serde::{Serialize, Deserialize};

use crate::engine::hooks::GameResult;

/// Number of buttons on a gamepad.
pub const BUTTON_COUNT: usize = 10;

/// Gamepad buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Button {
    /// Up arrow
    ArrowUp = 0,
    /// Down arrow
    ArrowDown = 1,
    /// Right arrow
    ArrowRight = 2,
    /// Left arrow
    ArrowLeft = 3,
    /// Up-left diagonal
    ArrowUpLeft = 4,
    /// Up-right diagonal
    ArrowUpRight = 5,
    /// Down-left diagonal
    ArrowDownLeft = 6,
    /// Down-right diagonal
    ArrowDownRight = 7,
    /// A
    A = 8,
    /// B
    B = 9,
}

impl Button {
    /// All buttons, by index.
    pub const ALL: [Button; BUTTON_COUNT] = [
        Button::ArrowUp,
        Button::ArrowDown,
        Button::ArrowRight,
        Button::ArrowLeft,
        Button::ArrowUpLeft,
        Button::ArrowUpRight,
        Button::ArrowDownLeft,
        Button::ArrowDownRight,
        Button::A,
        Button::B,
    ];

    /// Button index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Mask bit of this button in a state update.
    #[inline]
    pub fn mask(self) -> u16 {
        1 << (BUTTON_COUNT - 1 - self.index())
    }
}

/// Snapshot of pressed buttons, in wire bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ButtonState(u16);

impl ButtonState {
    /// Nothing pressed.
    pub const NONE: Self = Self(0);

    /// From a raw state mask. Bits above the button range are ignored.
    pub fn from_bits(bits: u16) -> Self {
        Self(bits & ((1 << BUTTON_COUNT) - 1))
    }

    /// From a set of pressed buttons.
    pub fn from_buttons(buttons: &[Button]) -> Self {
        Self(buttons.iter().fold(0, |bits, b| bits | b.mask()))
    }

    /// Raw mask.
    pub fn bits(self) -> u16 {
        self.0
    }

    /// True if `button` is held.
    #[inline]
    pub fn is_pressed(self, button: Button) -> bool {
        self.0 & button.mask() != 0
    }

    fn set(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.0 |= button.mask();
        } else {
            self.0 &= !button.mask();
        }
    }
}

/// Action fired on a button edge.
///
/// `ctx` is whatever owns the gamepad (the engine); `buttons` is the state
/// after the update that triggered the action.
pub trait ButtonAction<C>: Send {
    /// Run the action.
    fn fire(&mut self, ctx: &mut C, buttons: ButtonState) -> GameResult;
}

impl<C, F> ButtonAction<C> for F
where
    F: FnMut(&mut C, ButtonState) -> GameResult + Send,
{
    fn fire(&mut self, ctx: &mut C, buttons: ButtonState) -> GameResult {
        self(ctx, buttons)
    }
}

enum PressBinding<C> {
    Once(Box<dyn ButtonAction<C>>),
    Every {
        every: u32,
        counter: u32,
        action: Box<dyn ButtonAction<C>>,
    },
}

/// One controller's button state and bindings.
pub struct Gamepad<C> {
    state: ButtonState,
    on_press: Vec<Option<PressBinding<C>>>,
    on_release: Vec<Option<Box<dyn ButtonAction<C>>>>,
    periodic: Vec<Button>,
}

impl<C> std::fmt::Debug for Gamepad<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("state", &self.state)
            .field("periodic", &self.periodic)
            .finish_non_exhaustive()
    }
}

impl<C> Default for Gamepad<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Gamepad<C> {
    /// Gamepad with no bindings.
    pub fn new() -> Self {
        Self {
            state: ButtonState::NONE,
            on_press: (0..BUTTON_COUNT).map(|_| None).collect(),
            on_release: (0..BUTTON_COUNT).map(|_| None).collect(),
            periodic: Vec::new(),
        }
    }

    /// Fire `action` once when `button` goes down.
    pub fn bind_press(&mut self, button: Button, action: Box<dyn ButtonAction<C>>) {
        self.on_press[button.index()] = Some(PressBinding::Once(action));
    }

    /// Fire `action` every `every` ticks while `button` is held, starting on
    /// the tick it goes down.
    pub fn bind_press_every(&mut self, button: Button, every: u32, action: Box<dyn ButtonAction<C>>) {
        self.on_press[button.index()] = Some(PressBinding::Every {
            every: every.max(1),
            counter: 0,
            action,
        });
    }

    /// Fire `action` once when `button` goes up.
    pub fn bind_release(&mut self, button: Button, action: Box<dyn ButtonAction<C>>) {
        self.on_release[button.index()] = Some(action);
    }

    /// Current state.
    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// True if `button` is held.
    pub fn is_pressed(&self, button: Button) -> bool {
        self.state.is_pressed(button)
    }

    /// Apply a state update and fire edge actions.
    ///
    /// Buttons are processed from the lowest mask bit up. Every button is
    /// updated even if an action fails; the first failure is returned.
    pub fn update(&mut self, bits: u16, ctx: &mut C) -> GameResult {
        let next = ButtonState::from_bits(bits);
        let mut result = Ok(());

        for button in Button::ALL.into_iter().rev() {
            let was = self.state.is_pressed(button);
            let now = next.is_pressed(button);
            self.state.set(button, now);

            let fired = if !was && now {
                self.press(button, ctx)
            } else if was && !now {
                self.release(button, ctx)
            } else {
                Ok(())
            };
            if result.is_ok() {
                result = fired;
            }
        }
        result
    }

    /// Release every held button.
    pub fn release_all(&mut self, ctx: &mut C) -> GameResult {
        self.update(0, ctx)
    }

    fn press(&mut self, button: Button, ctx: &mut C) -> GameResult {
        let state = self.state;
        match &mut self.on_press[button.index()] {
            Some(PressBinding::Once(action)) => action.fire(ctx, state),
            Some(PressBinding::Every { counter, .. }) => {
                *counter = 0;
                self.periodic.push(button);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn release(&mut self, button: Button, ctx: &mut C) -> GameResult {
        self.periodic.retain(|b| *b != button);
        let state = self.state;
        match &mut self.on_release[button.index()] {
            Some(action) => action.fire(ctx, state),
            None => Ok(()),
        }
    }

    /// Run held periodic actions. Each fires when its counter is a multiple
    /// of its period, then counts up.
    pub fn run_periodic(&mut self, ctx: &mut C) -> GameResult {
        let state = self.state;
        for button in &self.periodic {
            if let Some(PressBinding::Every { every, counter, action }) = &mut self.on_press[button.index()] {
                let due = *counter % *every == 0;
                *counter = counter.wrapping_add(1);
                if due {
                    action.fire(ctx, state)?;
                }
            }
        }
        Ok(())
    }
}
