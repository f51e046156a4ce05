//! The `Carry` record, the read-only projection of one tutorial row used for rendering.

use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::normalize;
use crate::title;

/// A row of the carries table, as stored in the record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawCarry {
    pub name: String,
    #[serde(rename = "longtitle")]
    pub long_title: String,
    /// Drop-height offset code, see `normalize::DROP_HEIGHT_OFFSETS`.
    #[serde(rename = "mmposition")]
    pub drop_height_offset: i64,
    pub position: String,
    pub size: i64,
    pub difficulty: f64,
}

/// Tutorial metadata normalized for display. Constructed once per row and never mutated.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Carry {
    pub name: String,
    pub title: String,
    pub finish: String,
    pub position: String,
    pub size: String,
    pub difficulty: String,
    #[serde(rename = "mmposition")]
    pub drop_height_offset: String,
}

impl Carry {
    /// Normalizes a raw row, failing if the difficulty or the drop-height code is unknown.
    pub fn from_raw(raw_carry: &RawCarry) -> Result<Carry, ContextError> {
        let decomposed = title::decompose(&raw_carry.long_title);

        Ok(Carry {
            name: raw_carry.name.clone(),
            title: decomposed.title,
            finish: decomposed.finish,
            position: normalize::format_position(&raw_carry.position),
            size: normalize::format_size(raw_carry.size),
            difficulty: normalize::format_difficulty(raw_carry.difficulty)?,
            drop_height_offset: normalize::format_drop_height_offset(
                raw_carry.drop_height_offset,
            )?,
        })
    }

    pub fn is_back_carry(&self) -> bool {
        self.position == "BACK CARRY"
    }
}

impl TryFrom<RawCarry> for Carry {
    type Error = ContextError;

    fn try_from(raw_carry: RawCarry) -> Result<Self, Self::Error> {
        Carry::from_raw(&raw_carry)
    }
}
