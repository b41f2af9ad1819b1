//! Input Module
//!
//! Gamepad edge detection and the controller registry remote clients talk to.

pub mod gamepad;
pub mod registry;

pub use gamepad::{Button, ButtonAction, ButtonState, Gamepad, BUTTON_COUNT};
pub use registry::{
    parse_state, ControllerBuilder, ControllerEvent, ControllerId, ControllerInfo,
    ControllerRegistry, InputError, InputHandle,
};
