//! Key event dispatch.
//!
//! Turns one [`SensorEvent`] into the key actions to synthesize. Uses the
//! action pattern: [`Dispatcher::dispatch`] returns [`KeyAction`]s for the
//! caller to execute and performs no I/O itself.
//!
//! No per-pin state is kept. Both directions are re-resolved when the event
//! arrives, so a reconnect or a missed notification never leaves a pin stuck.
//!
//! # Policy
//!
//! | event    | press binding          | release binding | actions            |
//! |----------|------------------------|-----------------|--------------------|
//! | pressed  | none                   | -               | (dropped, logged)  |
//! | pressed  | auto_release           | -               | press, release     |
//! | pressed  | manual                 | -               | press              |
//! | released | manual                 | resolves        | error              |
//! | released | manual                 | none            | release(press key) |
//! | released | auto_release or none   | resolves        | tap(release key)   |
//! | released | auto_release or none   | none            | (nothing)          |

use aiokey_proto::SensorEvent;
use thiserror::Error;

use crate::{
    binding::{Direction, Resolution, ResolveError, resolve},
    config::{Config, KeyIdentifier},
};

/// Key side effect to hand to the [`crate::Keyboard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Key down
    Press(KeyIdentifier),
    /// Key up
    Release(KeyIdentifier),
    /// Key down immediately followed by key up
    Tap(KeyIdentifier),
}

/// Errors raised while dispatching an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Binding lookup failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Manual release configured together with a release key
    #[error(
        "pin {pin}: cannot specify press.auto_release=false and a release binding for the same \
         pin simultaneously"
    )]
    ConflictingRelease {
        /// Pin whose release triggered the check
        pin: usize,
    },
}

/// Stateless press/release/tap decision logic over an immutable [`Config`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Config,
}

impl Dispatcher {
    /// Create a dispatcher for `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decide the key actions for one decoded event.
    ///
    /// # Errors
    ///
    /// - `DispatchError::Resolve` if the pin is out of range and has no
    ///   explicit binding
    /// - `DispatchError::ConflictingRelease` on a release event for a pin
    ///   whose press binding disables auto-release while a release key is also
    ///   bound. Fatal: no action is produced for this event.
    pub fn dispatch(&self, event: SensorEvent) -> Result<Vec<KeyAction>, DispatchError> {
        if event.pressed { self.on_pressed(event.pin) } else { self.on_released(event.pin) }
    }

    fn on_pressed(&self, pin: usize) -> Result<Vec<KeyAction>, DispatchError> {
        let Some(binding) = resolve(&self.config, pin, Direction::Pressed)?.resolved() else {
            tracing::info!(pin, "no binding for pin");
            return Ok(Vec::new());
        };

        if binding.auto_release {
            let key = binding.key;
            Ok(vec![KeyAction::Press(key.clone()), KeyAction::Release(key)])
        } else {
            Ok(vec![KeyAction::Press(binding.key)])
        }
    }

    fn on_released(&self, pin: usize) -> Result<Vec<KeyAction>, DispatchError> {
        let pressed = resolve(&self.config, pin, Direction::Pressed)?;
        let released = resolve(&self.config, pin, Direction::Released)?;

        if let Resolution::Resolved(binding_pressed) = pressed
            && !binding_pressed.auto_release
        {
            if matches!(released, Resolution::Resolved(_)) {
                return Err(DispatchError::ConflictingRelease { pin });
            }
            return Ok(vec![KeyAction::Release(binding_pressed.key)]);
        }

        match released {
            Resolution::Resolved(binding) => Ok(vec![KeyAction::Tap(binding.key)]),
            Resolution::NoEntry | Resolution::NoFieldForDirection => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindingSpec;

    fn dispatcher(builder: crate::ConfigBuilder) -> Dispatcher {
        Dispatcher::new(builder.name("AIO").build().unwrap())
    }

    fn key(name: &str) -> KeyIdentifier {
        name.into()
    }

    #[test]
    fn auto_release_press_then_tap_on_release() {
        let d = dispatcher(Config::builder().binding(BindingSpec::SymmetricStructured {
            sensor: Some(3),
            key: key("x"),
            auto_release: None,
        }));

        assert_eq!(d.dispatch(SensorEvent::pressed(3)).unwrap(), vec![
            KeyAction::Press(key("x")),
            KeyAction::Release(key("x")),
        ]);
        assert_eq!(d.dispatch(SensorEvent::released(3)).unwrap(), vec![KeyAction::Tap(key("x"))]);
    }

    #[test]
    fn manual_release_press_only_then_release() {
        let d = dispatcher(Config::builder().binding(BindingSpec::AsymmetricStructured {
            sensor: Some(2),
            press: Some(key("a")),
            release: None,
            auto_release: Some(false),
        }));

        assert_eq!(d.dispatch(SensorEvent::pressed(2)).unwrap(), vec![KeyAction::Press(key("a"))]);
        assert_eq!(d.dispatch(SensorEvent::released(2)).unwrap(), vec![KeyAction::Release(
            key("a")
        )]);
    }

    #[test]
    fn manual_release_with_release_key_conflicts_on_release() {
        let d = dispatcher(Config::builder().binding(BindingSpec::AsymmetricStructured {
            sensor: Some(2),
            press: Some(key("a")),
            release: Some(key("b")),
            auto_release: Some(false),
        }));

        assert_eq!(d.dispatch(SensorEvent::pressed(2)).unwrap(), vec![KeyAction::Press(key("a"))]);
        assert_eq!(
            d.dispatch(SensorEvent::released(2)),
            Err(DispatchError::ConflictingRelease { pin: 2 })
        );
    }

    #[test]
    fn release_only_binding_taps_on_release() {
        let d = dispatcher(Config::builder().binding(BindingSpec::AsymmetricStructured {
            sensor: None,
            press: None,
            release: Some(key("r")),
            auto_release: Some(false),
        }));

        assert!(d.dispatch(SensorEvent::pressed(0)).unwrap().is_empty());
        assert_eq!(d.dispatch(SensorEvent::released(0)).unwrap(), vec![KeyAction::Tap(key("r"))]);
    }

    #[test]
    fn asymmetric_auto_release_taps_release_key() {
        let d = dispatcher(Config::builder().binding(BindingSpec::AsymmetricStructured {
            sensor: None,
            press: Some(key("a")),
            release: Some(key("b")),
            auto_release: None,
        }));

        assert_eq!(d.dispatch(SensorEvent::pressed(0)).unwrap(), vec![
            KeyAction::Press(key("a")),
            KeyAction::Release(key("a")),
        ]);
        assert_eq!(d.dispatch(SensorEvent::released(0)).unwrap(), vec![KeyAction::Tap(key("b"))]);
    }

    #[test]
    fn missing_release_key_is_silent() {
        let d = dispatcher(Config::builder().binding(BindingSpec::AsymmetricStructured {
            sensor: None,
            press: Some(key("a")),
            release: None,
            auto_release: None,
        }));

        assert!(d.dispatch(SensorEvent::released(0)).unwrap().is_empty());
    }

    #[test]
    fn empty_slot_drops_both_directions() {
        let d = dispatcher(Config::builder().empty_slot());

        assert!(d.dispatch(SensorEvent::pressed(0)).unwrap().is_empty());
        assert!(d.dispatch(SensorEvent::released(0)).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_pin_propagates() {
        let d = dispatcher(
            Config::builder().binding(BindingSpec::ScalarKey { key: KeyIdentifier::Code(65) }),
        );

        assert_eq!(
            d.dispatch(SensorEvent::pressed(4)),
            Err(DispatchError::Resolve(ResolveError::IndexOutOfRange { pin: 4, len: 1 }))
        );
        assert!(matches!(d.dispatch(SensorEvent::released(4)), Err(DispatchError::Resolve(_))));
    }

    #[test]
    fn scalar_with_manual_release_conflicts() {
        let d = dispatcher(
            Config::builder()
                .auto_release(false)
                .binding(BindingSpec::ScalarKey { key: KeyIdentifier::Code(65) }),
        );

        assert_eq!(d.dispatch(SensorEvent::pressed(0)).unwrap(), vec![KeyAction::Press(
            KeyIdentifier::Code(65)
        )]);
        assert_eq!(
            d.dispatch(SensorEvent::released(0)),
            Err(DispatchError::ConflictingRelease { pin: 0 })
        );
    }
}
