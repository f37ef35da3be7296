//! Perception thresholds deciding when a pixel, and when a whole image,
//! counts as different.
//!
//! The global difference amount is kept as the raw string from the suite
//! document (`"120px"` or `"5%"`) and decoded on demand, so it round-trips
//! through the declarative format unchanged.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PIXEL_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)px$").expect("pixel amount pattern is valid"));

// Anchored at the start only: "15%abc" still reads as 15%.
static PERCENTAGE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,2}|100)%").expect("percentage amount pattern is valid")
});

/// Unit a global difference amount can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountType {
    Percentage,
    Pixel,
}

impl AmountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountType::Percentage => "percentage",
            AmountType::Pixel => "pixel",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            AmountType::Percentage => &PERCENTAGE_AMOUNT,
            AmountType::Pixel => &PIXEL_AMOUNT,
        }
    }

    fn parse(&self, digits: &str) -> Option<AmountValue> {
        match self {
            AmountType::Percentage => digits.parse().ok().map(AmountValue::Percentage),
            AmountType::Pixel => digits.parse().ok().map(AmountValue::Pixels),
        }
    }
}

/// Decoded global difference amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountValue {
    Pixels(u64),
    /// Always within `0..=100`.
    Percentage(u8),
}

/// Outcome of decoding the raw amount as one particular unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amount {
    /// No amount is configured.
    Absent,
    /// An amount is configured but it is not written in the requested unit.
    WrongUnit,
    Value(AmountValue),
}

impl Amount {
    pub fn value(self) -> Option<AmountValue> {
        match self {
            Amount::Value(value) => Some(value),
            Amount::Absent | Amount::WrongUnit => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Amount::Absent)
    }

    pub fn is_wrong_unit(&self) -> bool {
        matches!(self, Amount::WrongUnit)
    }
}

/// How a single pixel delta is classified against the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    Same,
    /// Differs, but not above the one-pixel threshold.
    Unperceptible,
    /// Above the one-pixel threshold; `global` when it also exceeds the
    /// global difference threshold.
    Perceptible { global: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Perception {
    one_pixel_threshold: Option<u32>,
    global_difference_threshold: Option<u32>,
    #[serde(alias = "global-difference-pixel-amount")]
    global_difference_amount: Option<String>,
}

impl Perception {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn one_pixel_threshold(&self) -> Option<u32> {
        self.one_pixel_threshold
    }

    pub fn set_one_pixel_threshold(&mut self, value: Option<u32>) {
        self.one_pixel_threshold = value;
    }

    pub fn global_difference_threshold(&self) -> Option<u32> {
        self.global_difference_threshold
    }

    pub fn set_global_difference_threshold(&mut self, value: Option<u32>) {
        self.global_difference_threshold = value;
    }

    pub fn global_difference_amount(&self) -> Option<&str> {
        self.global_difference_amount.as_deref()
    }

    /// Stores the raw amount verbatim; it is only validated when decoded.
    pub fn set_global_difference_amount(&mut self, raw: impl Into<String>) {
        self.global_difference_amount = Some(raw.into());
    }

    pub fn clear_global_difference_amount(&mut self) {
        self.global_difference_amount = None;
    }

    /// Decodes the raw amount as `unit`.
    pub fn amount_as(&self, unit: AmountType) -> Amount {
        let Some(raw) = self.global_difference_amount.as_deref() else {
            return Amount::Absent;
        };
        unit.pattern()
            .captures(raw)
            .and_then(|captures| captures.get(1))
            .and_then(|digits| unit.parse(digits.as_str()))
            .map_or(Amount::WrongUnit, Amount::Value)
    }

    pub fn global_difference_pixel_amount(&self) -> Option<u64> {
        match self.amount_as(AmountType::Pixel).value() {
            Some(AmountValue::Pixels(pixels)) => Some(pixels),
            _ => None,
        }
    }

    /// Replaces any previous amount with `"<pixels>px"`.
    pub fn set_global_difference_pixel_amount(&mut self, pixels: u64) {
        self.global_difference_amount = Some(format!("{pixels}px"));
    }

    pub fn global_difference_percentage(&self) -> Option<u8> {
        match self.amount_as(AmountType::Percentage).value() {
            Some(AmountValue::Percentage(percentage)) => Some(percentage),
            _ => None,
        }
    }

    /// Replaces any previous amount with `"<percentage>%"`. Values above 100
    /// are stored as written and will not decode as a percentage.
    pub fn set_global_difference_percentage(&mut self, percentage: u8) {
        self.global_difference_amount = Some(format!("{percentage}%"));
    }

    /// The configured global amount in whichever unit it is written in.
    pub fn global_amount(&self) -> Option<AmountValue> {
        self.amount_as(AmountType::Pixel)
            .value()
            .or_else(|| self.amount_as(AmountType::Percentage).value())
    }

    pub fn effective_one_pixel_threshold(&self) -> u32 {
        self.one_pixel_threshold.unwrap_or(0)
    }

    pub fn effective_global_difference_threshold(&self) -> u32 {
        self.global_difference_threshold
            .unwrap_or_else(|| self.effective_one_pixel_threshold())
    }

    /// Classifies the largest per-channel delta of one pixel.
    pub fn classify(&self, delta: u8) -> PixelClass {
        let delta = u32::from(delta);
        if delta == 0 {
            PixelClass::Same
        } else if delta <= self.effective_one_pixel_threshold() {
            PixelClass::Unperceptible
        } else {
            PixelClass::Perceptible {
                global: delta > self.effective_global_difference_threshold(),
            }
        }
    }

    /// Whether `global` globally-different pixels out of `considered`
    /// unmasked pixels make the images different.
    pub fn exceeds_global_amount(&self, global: u64, considered: u64) -> bool {
        match self.global_amount() {
            Some(AmountValue::Pixels(limit)) => global > limit,
            Some(AmountValue::Percentage(limit)) => {
                u128::from(global) * 100 > u128::from(limit) * u128::from(considered)
            }
            None => global > 0,
        }
    }

    /// Returns a copy where every field present in `overrides` wins.
    pub fn merged_with(&self, overrides: &Perception) -> Perception {
        Perception {
            one_pixel_threshold: overrides.one_pixel_threshold.or(self.one_pixel_threshold),
            global_difference_threshold: overrides
                .global_difference_threshold
                .or(self.global_difference_threshold),
            global_difference_amount: overrides
                .global_difference_amount
                .clone()
                .or_else(|| self.global_difference_amount.clone()),
        }
    }
}
