//! Last-known device state.
//!
//! The remote characteristics are the source of truth; this mirror is
//! best-effort and may run ahead of an unconfirmed LED write (the panel
//! flips optimistically before the write completes).

use crate::domain::models::SwitchId;
use crate::protocol::{SwitchPair, SwitchState};
use crate::view::View;

#[derive(Debug)]
pub struct DeviceStateMirror {
    led: bool,
    sw1: SwitchState,
    sw2: SwitchState,
}

impl DeviceStateMirror {
    pub fn new() -> Self {
        Self {
            led: false,
            sw1: SwitchState::Off,
            sw2: SwitchState::Off,
        }
    }

    pub fn led(&self) -> bool {
        self.led
    }

    pub fn switches(&self) -> (SwitchState, SwitchState) {
        (self.sw1, self.sw2)
    }

    /// Flip the mirrored LED and render it; returns the new desired state.
    pub fn toggle_led(&mut self, view: &impl View) -> bool {
        self.set_led(!self.led, view);
        self.led
    }

    pub fn set_led(&mut self, on: bool, view: &impl View) {
        self.led = on;
        view.render_led_button(on);
    }

    pub fn update_switches(&mut self, pair: SwitchPair, view: &impl View) {
        self.sw1 = pair.sw1;
        self.sw2 = pair.sw2;
        view.render_switch_value(SwitchId::Sw1, pair.sw1);
        view.render_switch_value(SwitchId::Sw2, pair.sw2);
    }

    /// Disconnect reset: LED back to off, both switches rendered released.
    pub fn reset(&mut self, view: &impl View) {
        self.set_led(false, view);
        self.update_switches(
            SwitchPair {
                sw1: SwitchState::Off,
                sw2: SwitchState::Off,
            },
            view,
        );
    }
}

impl Default for DeviceStateMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{RecordingView, ViewCall};

    #[test]
    fn toggle_is_optimistic() {
        let view = RecordingView::default();
        let mut mirror = DeviceStateMirror::new();

        assert!(mirror.toggle_led(&view));
        assert!(!mirror.toggle_led(&view));
        assert_eq!(
            view.calls(),
            vec![ViewCall::LedButton(true), ViewCall::LedButton(false)]
        );
    }

    #[test]
    fn reset_clears_led_and_switches() {
        let view = RecordingView::default();
        let mut mirror = DeviceStateMirror::new();
        mirror.set_led(true, &view);
        mirror.update_switches(
            SwitchPair {
                sw1: SwitchState::On,
                sw2: SwitchState::On,
            },
            &view,
        );

        mirror.reset(&view);

        assert!(!mirror.led());
        assert_eq!(mirror.switches(), (SwitchState::Off, SwitchState::Off));
    }
}
