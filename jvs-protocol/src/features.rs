//! Feature table decoding
//!
//! The "read features" reply lists the I/O capabilities of a board as
//! 4-byte records `[code, a, b, c]`, ended by a record whose code is 0:
//!
//! ```text
//! ┌──────┬────┬────┬────┐
//! │ CODE │ A  │ B  │ C  │  × N, then 00 xx xx xx
//! └──────┴────┴────┴────┘
//! ```
//!
//! [`FeatureTable`] only segments the bytes into [`FeatureRecord`]s;
//! [`Feature`] gives the known codes a typed meaning.

use core::iter::FusedIterator;
use core::slice::ChunksExact;

/// Size of one record in bytes
pub const FEATURE_RECORD_SIZE: usize = 4;

/// Code that ends the table
pub const FEATURE_END: u8 = 0x00;

// Feature codes
pub const FEATURE_SWITCHES: u8 = 0x01;
pub const FEATURE_COINS: u8 = 0x02;
pub const FEATURE_ANALOG: u8 = 0x03;
pub const FEATURE_ROTARY: u8 = 0x04;
pub const FEATURE_KEYPAD: u8 = 0x05;
pub const FEATURE_LIGHT_GUN: u8 = 0x06;
pub const FEATURE_DIGITAL_INPUTS: u8 = 0x07;
pub const FEATURE_DIGITAL_OUTPUTS: u8 = 0x12;

/// One raw capability record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeatureRecord {
    /// Capability code (never 0)
    pub code: u8,
    pub a: u8,
    pub b: u8,
    pub c: u8,
}

impl FeatureRecord {
    /// Interpret this record
    pub fn feature(&self) -> Feature {
        Feature::from_record(*self)
    }
}

/// A capability reported by an I/O board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Feature {
    /// Player switch inputs
    Switches { players: u8, switches_per_player: u8 },
    /// Coin slots
    Coins { slots: u8 },
    /// Analog input channels
    Analog { channels: u8, bits: u8 },
    /// Rotary encoder channels
    Rotary { channels: u8 },
    /// Keypad
    Keypad,
    /// Light gun (screen position) inputs
    LightGun { x_bits: u8, y_bits: u8, channels: u8 },
    /// General purpose digital inputs
    DigitalInputs { channels: u16 },
    /// General purpose digital outputs
    DigitalOutputs { channels: u8 },
    /// Any code this crate does not interpret
    Unknown { code: u8, a: u8, b: u8, c: u8 },
}

impl Feature {
    /// Decode a record into a typed feature
    pub fn from_record(record: FeatureRecord) -> Self {
        let FeatureRecord { code, a, b, c } = record;
        match code {
            FEATURE_SWITCHES => Feature::Switches {
                players: a,
                switches_per_player: b,
            },
            FEATURE_COINS => Feature::Coins { slots: a },
            FEATURE_ANALOG => Feature::Analog {
                channels: a,
                bits: b,
            },
            FEATURE_ROTARY => Feature::Rotary { channels: a },
            FEATURE_KEYPAD => Feature::Keypad,
            FEATURE_LIGHT_GUN => Feature::LightGun {
                x_bits: a,
                y_bits: b,
                channels: c,
            },
            FEATURE_DIGITAL_INPUTS => Feature::DigitalInputs {
                channels: u16::from_be_bytes([a, b]),
            },
            FEATURE_DIGITAL_OUTPUTS => Feature::DigitalOutputs { channels: a },
            _ => Feature::Unknown { code, a, b, c },
        }
    }

    /// Wire code of this feature
    pub fn code(&self) -> u8 {
        match self {
            Feature::Switches { .. } => FEATURE_SWITCHES,
            Feature::Coins { .. } => FEATURE_COINS,
            Feature::Analog { .. } => FEATURE_ANALOG,
            Feature::Rotary { .. } => FEATURE_ROTARY,
            Feature::Keypad => FEATURE_KEYPAD,
            Feature::LightGun { .. } => FEATURE_LIGHT_GUN,
            Feature::DigitalInputs { .. } => FEATURE_DIGITAL_INPUTS,
            Feature::DigitalOutputs { .. } => FEATURE_DIGITAL_OUTPUTS,
            Feature::Unknown { code, .. } => *code,
        }
    }
}

/// Feature table as returned by the board
///
/// Wraps the reply data that follows the status and report bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureTable<'a> {
    data: &'a [u8],
}

impl<'a> FeatureTable<'a> {
    /// Wrap raw table bytes
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Iterate over the records before the end marker
    ///
    /// Each call starts again from the first record.
    pub fn iter(&self) -> FeatureRecords<'a> {
        FeatureRecords {
            chunks: self.data.chunks_exact(FEATURE_RECORD_SIZE),
            done: false,
        }
    }

    /// Iterate over the typed features
    pub fn features(&self) -> impl Iterator<Item = Feature> + 'a {
        self.iter().map(Feature::from_record)
    }

    /// Returns true if the table contains an end marker
    ///
    /// A table without one still yields every complete record, but was
    /// probably cut short.
    pub fn is_terminated(&self) -> bool {
        self.data
            .chunks_exact(FEATURE_RECORD_SIZE)
            .any(|chunk| chunk[0] == FEATURE_END)
    }
}

impl<'a> IntoIterator for FeatureTable<'a> {
    type Item = FeatureRecord;
    type IntoIter = FeatureRecords<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &FeatureTable<'a> {
    type Item = FeatureRecord;
    type IntoIter = FeatureRecords<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the records of a [`FeatureTable`]
///
/// Stops at the end marker, or when fewer than four bytes remain.
#[derive(Debug, Clone)]
pub struct FeatureRecords<'a> {
    chunks: ChunksExact<'a, u8>,
    done: bool,
}

impl Iterator for FeatureRecords<'_> {
    type Item = FeatureRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.chunks.next() {
            Some(&[code, a, b, c]) if code != FEATURE_END => Some(FeatureRecord { code, a, b, c }),
            _ => {
                self.done = true;
                None
            }
        }
    }
}

impl FusedIterator for FeatureRecords<'_> {}
