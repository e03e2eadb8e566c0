//! Binding resolution.
//!
//! Maps a pin and an event direction to the key to synthesize. A pin is
//! matched first against entries carrying an explicit `sensor` index; only
//! when none claims it is the pin used as a position into the binding list.
//! An explicit match always wins over positional fallback, even when another
//! entry sits at that position.
//!
//! Resolution is recomputed on every event. Nothing here is cached.

use thiserror::Error;

use crate::config::{BindingSpec, Config, KeyIdentifier};

/// Event direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Pin went down
    Pressed,
    /// Pin went up
    Released,
}

impl Direction {
    /// Direction of a decoded pin state.
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed { Self::Pressed } else { Self::Released }
    }
}

/// Key and release policy for one (pin, direction) lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    /// Key to synthesize
    pub key: KeyIdentifier,
    /// Entry override, else the global default
    pub auto_release: bool,
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A key is bound for this direction.
    Resolved(ResolvedBinding),
    /// The matching slot is empty.
    NoEntry,
    /// The entry has no key for the requested direction.
    NoFieldForDirection,
}

impl Resolution {
    /// The binding, if one resolved.
    pub fn resolved(self) -> Option<ResolvedBinding> {
        match self {
            Self::Resolved(binding) => Some(binding),
            Self::NoEntry | Self::NoFieldForDirection => None,
        }
    }
}

/// Lookup failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No explicit `sensor` match and the pin is past the end of the list.
    #[error("pin {pin} has no sensor binding and is out of range for {len} positional bindings")]
    IndexOutOfRange {
        /// Requested pin
        pin: usize,
        /// Number of binding slots
        len: usize,
    },
}

/// Find the slot bound to `pin`. `Ok(None)` is an empty slot.
pub fn find_spec(config: &Config, pin: usize) -> Result<Option<&BindingSpec>, ResolveError> {
    let bindings = config.bindings();

    if let Some(spec) = bindings.iter().flatten().find(|spec| spec.sensor() == Some(pin)) {
        return Ok(Some(spec));
    }

    bindings
        .get(pin)
        .map(Option::as_ref)
        .ok_or(ResolveError::IndexOutOfRange { pin, len: bindings.len() })
}

/// Resolve the binding for `pin` in `direction`.
pub fn resolve(
    config: &Config,
    pin: usize,
    direction: Direction,
) -> Result<Resolution, ResolveError> {
    let Some(spec) = find_spec(config, pin)? else {
        return Ok(Resolution::NoEntry);
    };

    let Some(key) = spec.key_for(direction) else {
        return Ok(Resolution::NoFieldForDirection);
    };

    let auto_release = spec.auto_release_override().unwrap_or(config.auto_release());

    Ok(Resolution::Resolved(ResolvedBinding { key: key.clone(), auto_release }))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn positional(keys: &[u32]) -> Config {
        keys.iter()
            .fold(Config::builder().name("AIO"), |builder, &code| {
                builder.binding(BindingSpec::ScalarKey { key: KeyIdentifier::Code(code) })
            })
            .build()
            .unwrap()
    }

    fn resolved(key: impl Into<KeyIdentifier>, auto_release: bool) -> Resolution {
        Resolution::Resolved(ResolvedBinding { key: key.into(), auto_release })
    }

    #[test]
    fn positional_scalar_resolves_both_directions() {
        let config = positional(&[65, 66, 67]);

        let expected = resolved(KeyIdentifier::Code(66), true);
        assert_eq!(resolve(&config, 1, Direction::Pressed), Ok(expected.clone()));
        assert_eq!(resolve(&config, 1, Direction::Released), Ok(expected));
    }

    #[test]
    fn scalar_uses_global_default() {
        let config = Config::builder()
            .name("AIO")
            .auto_release(false)
            .binding(BindingSpec::ScalarKey { key: "a".into() })
            .build()
            .unwrap();

        assert_eq!(resolve(&config, 0, Direction::Pressed), Ok(resolved("a", false)));
    }

    #[test]
    fn out_of_range_is_an_error() {
        let config = positional(&[65, 66]);

        assert_eq!(
            resolve(&config, 5, Direction::Pressed),
            Err(ResolveError::IndexOutOfRange { pin: 5, len: 2 })
        );
    }

    #[test]
    fn explicit_sensor_wins_over_position() {
        let config = Config::builder()
            .name("AIO")
            .binding(BindingSpec::ScalarKey { key: "positional".into() })
            .binding(BindingSpec::SymmetricStructured {
                sensor: Some(0),
                key: "explicit".into(),
                auto_release: None,
            })
            .build()
            .unwrap();

        assert_eq!(resolve(&config, 0, Direction::Pressed), Ok(resolved("explicit", true)));
    }

    #[test]
    fn explicit_sensor_beyond_list_length() {
        let config = Config::builder()
            .name("AIO")
            .binding(BindingSpec::SymmetricStructured {
                sensor: Some(12),
                key: "x".into(),
                auto_release: Some(false),
            })
            .build()
            .unwrap();

        assert_eq!(resolve(&config, 12, Direction::Released), Ok(resolved("x", false)));
    }

    #[test]
    fn empty_slot_is_no_entry() {
        let config = Config::builder()
            .name("AIO")
            .empty_slot()
            .binding(BindingSpec::ScalarKey { key: "b".into() })
            .build()
            .unwrap();

        assert_eq!(resolve(&config, 0, Direction::Pressed), Ok(Resolution::NoEntry));
        assert_eq!(resolve(&config, 1, Direction::Pressed), Ok(resolved("b", true)));
    }

    #[test]
    fn asymmetric_missing_direction() {
        let config = Config::builder()
            .name("AIO")
            .binding(BindingSpec::AsymmetricStructured {
                sensor: Some(2),
                press: Some("a".into()),
                release: None,
                auto_release: Some(false),
            })
            .build()
            .unwrap();

        assert_eq!(resolve(&config, 2, Direction::Pressed), Ok(resolved("a", false)));
        assert_eq!(resolve(&config, 2, Direction::Released), Ok(Resolution::NoFieldForDirection));
    }

    #[test]
    fn asymmetric_override_applies_to_both_directions() {
        let config = Config::builder()
            .name("AIO")
            .auto_release(false)
            .binding(BindingSpec::AsymmetricStructured {
                sensor: None,
                press: Some("a".into()),
                release: Some("b".into()),
                auto_release: Some(true),
            })
            .build()
            .unwrap();

        assert_eq!(resolve(&config, 0, Direction::Pressed), Ok(resolved("a", true)));
        assert_eq!(resolve(&config, 0, Direction::Released), Ok(resolved("b", true)));
    }

    #[test]
    fn first_explicit_match_wins() {
        let config = Config::builder()
            .name("AIO")
            .binding(BindingSpec::SymmetricStructured {
                sensor: Some(4),
                key: "first".into(),
                auto_release: None,
            })
            .binding(BindingSpec::SymmetricStructured {
                sensor: Some(4),
                key: "second".into(),
                auto_release: None,
            })
            .build()
            .unwrap();

        assert_eq!(resolve(&config, 4, Direction::Pressed), Ok(resolved("first", true)));
    }

    proptest! {
        #[test]
        fn prop_explicit_match_shadows_any_position(
            codes in prop::collection::vec(0u32..200, 1..16),
            sensor in 0usize..16,
        ) {
            let config = codes
                .iter()
                .fold(Config::builder().name("AIO"), |builder, &code| {
                    builder.binding(BindingSpec::ScalarKey { key: KeyIdentifier::Code(code) })
                })
                .binding(BindingSpec::SymmetricStructured {
                    sensor: Some(sensor),
                    key: "explicit".into(),
                    auto_release: None,
                })
                .build()
                .unwrap();

            prop_assert_eq!(resolve(&config, sensor, Direction::Pressed), Ok(resolved("explicit", true)));
        }

        #[test]
        fn prop_positional_matches_index(codes in prop::collection::vec(0u32..200, 0..16), pin in 0usize..32) {
            let config = positional(&codes);
            let result = resolve(&config, pin, Direction::Pressed);

            match codes.get(pin) {
                Some(&code) => prop_assert_eq!(result, Ok(resolved(code, true))),
                None => prop_assert_eq!(
                    result,
                    Err(ResolveError::IndexOutOfRange { pin, len: codes.len() })
                ),
            }
        }
    }
}
