use serde::{Deserialize, Serialize};
use std::fmt;

/// Line settings for one serial port.
///
/// The same value travels with an open request and comes back in `Opened`
/// (as applied by the native layer) or `OpenFailed` (as requested).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    /// System path of the device, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_character_size")]
    pub character_size: u8,
    #[serde(default)]
    pub two_stop_bits: bool,
    #[serde(default)]
    pub parity: Parity,
}

// Default configuration constants
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_CHARACTER_SIZE: u8 = 8;

/// Smallest and largest character size accepted before touching the native layer.
pub const MIN_CHARACTER_SIZE: u8 = 5;
pub const MAX_CHARACTER_SIZE: u8 = 8;

/// Default baud rate for serial port configuration (9600 bps).
pub fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Default character size (8 bits).
pub fn default_character_size() -> u8 {
    DEFAULT_CHARACTER_SIZE
}

impl PortConfig {
    /// 8N1 settings for `port` at `baud`.
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
            character_size: DEFAULT_CHARACTER_SIZE,
            two_stop_bits: false,
            parity: Parity::None,
        }
    }

    pub fn with_character_size(mut self, character_size: u8) -> Self {
        self.character_size = character_size;
        self
    }

    pub fn with_two_stop_bits(mut self, two_stop_bits: bool) -> Self {
        self.two_stop_bits = two_stop_bits;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Structural validation performed before any native call.
    ///
    /// Whether the device actually supports the settings is left to the
    /// native layer.
    pub fn validate(&self) -> Result<(), String> {
        if self.port.trim().is_empty() {
            return Err("port path must not be empty".to_string());
        }
        if self.baud == 0 {
            return Err("baud rate must be positive".to_string());
        }
        if !(MIN_CHARACTER_SIZE..=MAX_CHARACTER_SIZE).contains(&self.character_size) {
            return Err(format!(
                "character size {} is outside {}..={}",
                self.character_size, MIN_CHARACTER_SIZE, MAX_CHARACTER_SIZE
            ));
        }
        Ok(())
    }
}

impl fmt::Display for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} {}{}{}",
            self.port,
            self.baud,
            self.character_size,
            self.parity.letter(),
            if self.two_stop_bits { 2 } else { 1 }
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    /// Conventional single-letter form used in "8N1" notation.
    pub fn letter(self) -> char {
        match self {
            Self::None => 'N',
            Self::Odd => 'O',
            Self::Even => 'E',
            Self::Mark => 'M',
            Self::Space => 'S',
        }
    }
}

/// Lifecycle of a port operator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum OperatorState {
    /// Normal operation.
    Open,
    /// Close requested or fault detected; in-flight work is draining.
    Closing,
    /// Terminal. The native handle has been released.
    Closed,
}

impl OperatorState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Closing => 1,
            Self::Closed => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for OperatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
