//! Fee references and fee estimation
//!
//! A fee reference is the provider's recommended sat/byte rate for three
//! confirmation targets. Estimating a fee is the reference rate for the
//! chosen speed times the transaction size.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::currency::estimate_fee;

// =============================================================================
// Fee Rate
// =============================================================================

/// Fee rate in satoshis per byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FeeRate(pub u64);

impl FeeRate {
    /// Create from satoshis per byte
    pub fn from_sat_per_byte(rate: u64) -> Self {
        Self(rate)
    }

    /// Fee for a given size, saturating on overflow
    pub fn fee_for_size(&self, size_bytes: u64) -> u64 {
        estimate_fee(size_bytes, self.0)
    }

    /// Get rate as satoshis per byte
    pub fn as_sat_per_byte(&self) -> u64 {
        self.0
    }
}

// =============================================================================
// Fee Reference
// =============================================================================

/// Confirmation speed a caller is willing to pay for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    /// Next block
    Fastest,
    /// Within about half an hour
    HalfHour,
    /// Within about an hour
    Hour,
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Speed::Fastest => "fastest",
            Speed::HalfHour => "half-hour",
            Speed::Hour => "hour",
        };
        f.write_str(name)
    }
}

impl FromStr for Speed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fastest" => Ok(Speed::Fastest),
            "half-hour" | "halfhour" | "half_hour" => Ok(Speed::HalfHour),
            "hour" => Ok(Speed::Hour),
            other => Err(format!("unknown speed: {other}")),
        }
    }
}

/// Recommended fee rates, in sat/byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeReference {
    pub fastest_sat_per_byte: u64,
    pub half_hour_sat_per_byte: u64,
    pub hour_sat_per_byte: u64,
}

impl FeeReference {
    /// Rate for a given speed
    pub fn rate_for(&self, speed: Speed) -> FeeRate {
        match speed {
            Speed::Fastest => FeeRate(self.fastest_sat_per_byte),
            Speed::HalfHour => FeeRate(self.half_hour_sat_per_byte),
            Speed::Hour => FeeRate(self.hour_sat_per_byte),
        }
    }

    /// Fee in satoshis for `size_bytes` at the given speed
    pub fn fee_for(&self, size_bytes: u64, speed: Speed) -> u64 {
        self.rate_for(speed).fee_for_size(size_bytes)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> FeeReference {
        FeeReference {
            fastest_sat_per_byte: 40,
            half_hour_sat_per_byte: 20,
            hour_sat_per_byte: 10,
        }
    }

    #[test]
    fn test_fee_rate() {
        let rate = FeeRate::from_sat_per_byte(10);
        assert_eq!(rate.fee_for_size(250), 2500);
        assert_eq!(FeeRate(u64::MAX).fee_for_size(3), u64::MAX);
    }

    #[test]
    fn test_fee_for_speed() {
        let reference = reference();
        assert_eq!(reference.fee_for(250, Speed::Fastest), 10_000);
        assert_eq!(reference.fee_for(250, Speed::HalfHour), 5_000);
        assert_eq!(reference.fee_for(250, Speed::Hour), 2_500);
        assert!(reference.rate_for(Speed::Fastest) > reference.rate_for(Speed::Hour));
    }

    #[test]
    fn test_speed_parse() {
        assert_eq!("fastest".parse::<Speed>().unwrap(), Speed::Fastest);
        assert_eq!("half-hour".parse::<Speed>().unwrap(), Speed::HalfHour);
        assert_eq!(Speed::HalfHour.to_string(), "half-hour");
        assert!("slow".parse::<Speed>().is_err());
    }
}
