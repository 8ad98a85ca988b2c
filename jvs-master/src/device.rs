//! Board description gathered while probing

use jvs_protocol::{Feature, Version};

/// Everything a board reports about itself during bring-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Address assigned to the board
    pub address: u8,
    /// Identification string (maker, model, revision)
    pub id: String,
    pub command_version: Version,
    pub jvs_version: Version,
    pub protocol_version: Version,
    /// Feature table in the order the board listed it
    pub features: Vec<Feature>,
}

impl DeviceInfo {
    /// Player switch layout as `(players, switches_per_player)`
    ///
    /// Taken from the first switch feature; `None` if the board has none.
    pub fn switch_layout(&self) -> Option<(u8, u8)> {
        self.features.iter().find_map(|feature| match *feature {
            Feature::Switches {
                players,
                switches_per_player,
            } => Some((players, switches_per_player)),
            _ => None,
        })
    }

    /// Number of coin slots, 0 if the board has none
    pub fn coin_slots(&self) -> u8 {
        self.features
            .iter()
            .find_map(|feature| match *feature {
                Feature::Coins { slots } => Some(slots),
                _ => None,
            })
            .unwrap_or(0)
    }
}
