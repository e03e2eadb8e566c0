//! Adapter configuration.
//!
//! [`Config`] is loaded once and never mutated. Bindings arrive in three
//! loosely typed shapes (integer key code, key name, or table) and are
//! parsed here, once, into the closed [`BindingSpec`] variant so resolution
//! never has to inspect runtime types.
//!
//! Deserializing a [`Config`] with serde runs the same validation as
//! [`ConfigBuilder::build`].

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::binding::Direction;

/// Key to synthesize: a raw platform key code or a key name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum KeyIdentifier {
    /// Raw platform key code
    Code(u32),
    /// Character (`"a"`) or named key (`"space"`)
    Named(String),
}

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "code:{code}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<u32> for KeyIdentifier {
    fn from(code: u32) -> Self {
        Self::Code(code)
    }
}

impl From<&str> for KeyIdentifier {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for KeyIdentifier {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// One configured binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSpec {
    /// Bare key: used for press and release, global auto-release.
    ScalarKey {
        /// Key for both directions
        key: KeyIdentifier,
    },
    /// Table with a single `key`.
    SymmetricStructured {
        /// Explicit pin index
        sensor: Option<usize>,
        /// Key for both directions
        key: KeyIdentifier,
        /// Overrides the global default
        auto_release: Option<bool>,
    },
    /// Table with independent `press` / `release` keys.
    AsymmetricStructured {
        /// Explicit pin index
        sensor: Option<usize>,
        /// Key used for pressed events
        press: Option<KeyIdentifier>,
        /// Key used for released events
        release: Option<KeyIdentifier>,
        /// Overrides the global default
        auto_release: Option<bool>,
    },
}

impl BindingSpec {
    /// Explicit pin index, if the entry names one.
    pub fn sensor(&self) -> Option<usize> {
        match self {
            Self::ScalarKey { .. } => None,
            Self::SymmetricStructured { sensor, .. }
            | Self::AsymmetricStructured { sensor, .. } => *sensor,
        }
    }

    /// Entry-level auto-release override.
    pub fn auto_release_override(&self) -> Option<bool> {
        match self {
            Self::ScalarKey { .. } => None,
            Self::SymmetricStructured { auto_release, .. }
            | Self::AsymmetricStructured { auto_release, .. } => *auto_release,
        }
    }

    /// Key configured for `direction`, if any.
    pub fn key_for(&self, direction: Direction) -> Option<&KeyIdentifier> {
        match (self, direction) {
            (Self::ScalarKey { key } | Self::SymmetricStructured { key, .. }, _) => Some(key),
            (Self::AsymmetricStructured { press, .. }, Direction::Pressed) => press.as_ref(),
            (Self::AsymmetricStructured { release, .. }, Direction::Released) => release.as_ref(),
        }
    }
}

/// Errors raised while validating a configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither `name` nor `address` given
    #[error("config must specify a device `name` or `address`")]
    MissingIdentity,

    /// Identity field present but empty
    #[error("config field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// Table mixes `key` with `press`/`release`
    #[error("binding #{position}: `key` cannot be combined with `press` or `release`")]
    KeyWithDirectionalKeys {
        /// Position in the `bindings` list
        position: usize,
    },
}

/// Suspicious but accepted configuration, reported at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Two entries claim the same explicit pin; the first one wins.
    DuplicateSensor {
        /// Pin index
        sensor: usize,
        /// Position of the entry that wins
        first: usize,
        /// Position of the shadowed entry
        duplicate: usize,
    },
    /// Manual release combined with a release key. The first release event
    /// on this pin aborts the adapter.
    ManualReleaseWithReleaseKey {
        /// Position in the `bindings` list
        position: usize,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSensor { sensor, first, duplicate } => write!(
                f,
                "binding #{duplicate} is shadowed by binding #{first}: both use sensor {sensor}"
            ),
            Self::ManualReleaseWithReleaseKey { position } => write!(
                f,
                "binding #{position} has auto_release=false and a release key; \
                 its first release event will abort"
            ),
        }
    }
}

/// Validated adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct Config {
    name: Option<String>,
    address: Option<String>,
    auto_release: bool,
    bindings: Vec<Option<BindingSpec>>,
}

impl Config {
    /// Start building a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Advertised device name used for scanning.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Platform-specific device address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Global auto-release default.
    pub fn auto_release(&self) -> bool {
        self.auto_release
    }

    /// Binding slots in configuration order. `None` is an empty slot.
    pub fn bindings(&self) -> &[Option<BindingSpec>] {
        &self.bindings
    }

    /// Non-fatal problems worth reporting at startup.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (position, spec) in self.entries() {
            if let Some(sensor) = spec.sensor()
                && let Some((first, _)) =
                    self.entries().find(|(_, other)| other.sensor() == Some(sensor))
                && first != position
            {
                warnings.push(ConfigWarning::DuplicateSensor {
                    sensor,
                    first,
                    duplicate: position,
                });
            }

            let auto_release = spec.auto_release_override().unwrap_or(self.auto_release);
            if !auto_release && spec.key_for(Direction::Released).is_some() {
                warnings.push(ConfigWarning::ManualReleaseWithReleaseKey { position });
            }
        }

        warnings
    }

    fn entries(&self) -> impl Iterator<Item = (usize, &BindingSpec)> {
        self.bindings.iter().enumerate().filter_map(|(i, slot)| slot.as_ref().map(|s| (i, s)))
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    name: Option<String>,
    address: Option<String>,
    auto_release: bool,
    bindings: Vec<Option<BindingSpec>>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self { name: None, address: None, auto_release: true, bindings: Vec::new() }
    }
}

impl ConfigBuilder {
    /// Set the advertised device name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the device address.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the global auto-release default.
    #[must_use]
    pub fn auto_release(mut self, auto_release: bool) -> Self {
        self.auto_release = auto_release;
        self
    }

    /// Append a binding.
    #[must_use]
    pub fn binding(mut self, spec: BindingSpec) -> Self {
        self.bindings.push(Some(spec));
        self
    }

    /// Append an empty positional slot.
    #[must_use]
    pub fn empty_slot(mut self) -> Self {
        self.bindings.push(None);
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyField("name"));
        }
        if self.address.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyField("address"));
        }
        if self.name.is_none() && self.address.is_none() {
            return Err(ConfigError::MissingIdentity);
        }

        Ok(Config {
            name: self.name,
            address: self.address,
            auto_release: self.auto_release,
            bindings: self.bindings,
        })
    }
}

/// On-disk shape of the configuration.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default = "default_auto_release")]
    auto_release: bool,
    #[serde(default)]
    bindings: Vec<RawBinding>,
}

fn default_auto_release() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBinding {
    Key(KeyIdentifier),
    Entry(RawEntry),
    // `null`, for formats that have one
    Empty,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    #[serde(default)]
    sensor: Option<usize>,
    #[serde(default)]
    key: Option<KeyIdentifier>,
    #[serde(default)]
    press: Option<KeyIdentifier>,
    #[serde(default)]
    release: Option<KeyIdentifier>,
    #[serde(default)]
    auto_release: Option<bool>,
}

impl RawBinding {
    fn into_slot(self, position: usize) -> Result<Option<BindingSpec>, ConfigError> {
        let entry = match self {
            Self::Key(key) => return Ok(Some(BindingSpec::ScalarKey { key })),
            Self::Entry(entry) => entry,
            Self::Empty => return Ok(None),
        };

        let RawEntry { sensor, key, press, release, auto_release } = entry;
        let spec = match (key, press, release) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(ConfigError::KeyWithDirectionalKeys { position });
            },
            (Some(key), None, None) => {
                BindingSpec::SymmetricStructured { sensor, key, auto_release }
            },
            (None, None, None) if sensor.is_none() && auto_release.is_none() => return Ok(None),
            (None, press, release) => {
                BindingSpec::AsymmetricStructured { sensor, press, release, auto_release }
            },
        };

        Ok(Some(spec))
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let mut builder = Config::builder().auto_release(raw.auto_release);
        if let Some(name) = raw.name {
            builder = builder.name(name);
        }
        if let Some(address) = raw.address {
            builder = builder.address(address);
        }

        for (position, binding) in raw.bindings.into_iter().enumerate() {
            builder = match binding.into_slot(position)? {
                Some(spec) => builder.binding(spec),
                None => builder.empty_slot(),
            };
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    #[test]
    fn parses_every_binding_shape() {
        let config = parse(
            r#"
            name = "AIO"
            bindings = [
                65,
                "b",
                {},
                { sensor = 3, key = "x" },
                { sensor = 4, press = "a", release = "b", auto_release = false },
                { press = "c" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(config.name(), Some("AIO"));
        assert_eq!(config.address(), None);
        assert!(config.auto_release());
        assert_eq!(config.bindings(), &[
            Some(BindingSpec::ScalarKey { key: KeyIdentifier::Code(65) }),
            Some(BindingSpec::ScalarKey { key: "b".into() }),
            None,
            Some(BindingSpec::SymmetricStructured {
                sensor: Some(3),
                key: "x".into(),
                auto_release: None,
            }),
            Some(BindingSpec::AsymmetricStructured {
                sensor: Some(4),
                press: Some("a".into()),
                release: Some("b".into()),
                auto_release: Some(false),
            }),
            Some(BindingSpec::AsymmetricStructured {
                sensor: None,
                press: Some("c".into()),
                release: None,
                auto_release: None,
            }),
        ]);
    }

    #[test]
    fn auto_release_defaults_to_true() {
        let config = parse(r#"address = "AA:BB:CC:DD:EE:FF""#).unwrap();
        assert!(config.auto_release());
        assert!(config.bindings().is_empty());
    }

    #[test]
    fn global_auto_release_can_be_disabled() {
        let config = parse("name = \"AIO\"\nauto_release = false").unwrap();
        assert!(!config.auto_release());
    }

    #[test]
    fn rejects_missing_identity() {
        let err = Config::builder().build().unwrap_err();
        assert_eq!(err, ConfigError::MissingIdentity);

        assert!(parse("bindings = [65]").is_err());
    }

    #[test]
    fn rejects_empty_name() {
        let err = Config::builder().name("").build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyField("name"));
    }

    #[test]
    fn rejects_key_mixed_with_press() {
        let raw = RawBinding::Entry(RawEntry {
            sensor: None,
            key: Some("a".into()),
            press: Some("b".into()),
            release: None,
            auto_release: None,
        });
        assert_eq!(raw.into_slot(7), Err(ConfigError::KeyWithDirectionalKeys { position: 7 }));

        assert!(parse("name = \"AIO\"\nbindings = [{ key = \"a\", release = \"b\" }]").is_err());
    }

    #[test]
    fn rejects_unknown_entry_fields() {
        assert!(parse("name = \"AIO\"\nbindings = [{ keys = \"a\" }]").is_err());
    }

    #[test]
    fn sensor_only_entry_is_not_an_empty_slot() {
        let config = parse("name = \"AIO\"\nbindings = [{ sensor = 2 }]").unwrap();
        assert_eq!(config.bindings(), &[Some(BindingSpec::AsymmetricStructured {
            sensor: Some(2),
            press: None,
            release: None,
            auto_release: None,
        })]);
    }

    #[test]
    fn key_for_direction() {
        let symmetric =
            BindingSpec::SymmetricStructured { sensor: None, key: "x".into(), auto_release: None };
        assert_eq!(symmetric.key_for(Direction::Pressed), Some(&"x".into()));
        assert_eq!(symmetric.key_for(Direction::Released), Some(&"x".into()));

        let press_only = BindingSpec::AsymmetricStructured {
            sensor: Some(1),
            press: Some("a".into()),
            release: None,
            auto_release: None,
        };
        assert_eq!(press_only.key_for(Direction::Pressed), Some(&"a".into()));
        assert_eq!(press_only.key_for(Direction::Released), None);
    }

    #[test]
    fn warns_on_duplicate_sensor() {
        let config = Config::builder()
            .name("AIO")
            .binding(BindingSpec::SymmetricStructured {
                sensor: Some(2),
                key: "a".into(),
                auto_release: None,
            })
            .binding(BindingSpec::SymmetricStructured {
                sensor: Some(2),
                key: "b".into(),
                auto_release: None,
            })
            .build()
            .unwrap();

        assert_eq!(config.warnings(), vec![ConfigWarning::DuplicateSensor {
            sensor: 2,
            first: 0,
            duplicate: 1,
        }]);
    }

    #[test]
    fn warns_on_manual_release_with_release_key() {
        let config = Config::builder()
            .name("AIO")
            .binding(BindingSpec::AsymmetricStructured {
                sensor: Some(2),
                press: Some("a".into()),
                release: Some("b".into()),
                auto_release: Some(false),
            })
            .binding(BindingSpec::AsymmetricStructured {
                sensor: Some(3),
                press: Some("a".into()),
                release: None,
                auto_release: Some(false),
            })
            .build()
            .unwrap();

        assert_eq!(config.warnings(), vec![ConfigWarning::ManualReleaseWithReleaseKey {
            position: 0
        }]);
    }

    #[test]
    fn key_identifier_display() {
        assert_eq!(KeyIdentifier::Code(65).to_string(), "code:65");
        assert_eq!(KeyIdentifier::from("space").to_string(), "space");
    }
}
