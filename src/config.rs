//! Electrical and clock configuration for an acquisition session.

use crate::error::Error;

/// Input voltage range preset, volts. The analog front end accepts
/// exactly these three symmetric spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoltageRange {
    Pm1,
    #[default]
    Pm5,
    Pm10,
}

impl VoltageRange {
    /// Looks a preset up by its positive bound in volts.
    pub fn from_volts(volts: u32) -> Option<Self> {
        match volts {
            1 => Some(VoltageRange::Pm1),
            5 => Some(VoltageRange::Pm5),
            10 => Some(VoltageRange::Pm10),
            _ => None,
        }
    }

    pub fn min_volts(self) -> f64 {
        -self.max_volts()
    }

    pub fn max_volts(self) -> f64 {
        match self {
            VoltageRange::Pm1 => 1.0,
            VoltageRange::Pm5 => 5.0,
            VoltageRange::Pm10 => 10.0,
        }
    }
}

/// Analog front-end referencing mode for a voltage measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalConfig {
    #[default]
    Default,
    Differential,
    Rse,
    Nrse,
}

impl TerminalConfig {
    /// Parses the operator-facing mode name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Default" => Some(TerminalConfig::Default),
            "Differential" => Some(TerminalConfig::Differential),
            "RSE" => Some(TerminalConfig::Rse),
            "NRSE" => Some(TerminalConfig::Nrse),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TerminalConfig::Default => "Default",
            TerminalConfig::Differential => "Differential",
            TerminalConfig::Rse => "RSE",
            TerminalConfig::Nrse => "NRSE",
        }
    }
}

/// The ordered channel selection of one session: a comma-joined list of
/// physical channel identifiers sharing one voltage range and one
/// terminal mode. Immutable for the session's lifetime.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    physical_channels: String,
    range: VoltageRange,
    terminal: TerminalConfig,
}

impl ChannelSpec {
    pub fn new(
        physical_channels: impl Into<String>,
        range: VoltageRange,
        terminal: TerminalConfig,
    ) -> Self {
        ChannelSpec {
            physical_channels: physical_channels.into(),
            range,
            terminal,
        }
    }

    /// The comma-joined identifier list as given by the operator.
    pub fn physical_channels(&self) -> &str {
        &self.physical_channels
    }

    /// One identifier per channel, in acquisition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.physical_channels.split(',').map(str::trim)
    }

    /// Channel count is one more than the number of separators.
    pub fn channel_count(&self) -> usize {
        1 + self.physical_channels.matches(',').count()
    }

    pub fn range(&self) -> VoltageRange {
        self.range
    }

    pub fn terminal(&self) -> TerminalConfig {
        self.terminal
    }
}

/// Hardware clock programming for continuous acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSpec {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Samples per channel delivered per block-ready notification.
    pub block_size: u32,
}

impl ClockSpec {
    /// Gates session configuration: a block shorter than a tenth of a
    /// second floods the callback path, a block longer than five seconds
    /// starves the consumers and risks overflowing the device ring
    /// before the first notification. Both bounds are inclusive. Runs
    /// before any hardware resource is acquired.
    pub fn validate(self) -> Result<(), Error> {
        let ratio = self.block_size as f64 / self.sample_rate as f64;
        if !(0.1..=5.0).contains(&ratio) {
            return Err(Error::RatioOutOfRange {
                sample_rate: self.sample_rate,
                block_size: self.block_size,
            });
        }
        Ok(())
    }

    /// On-device ring depth, samples per channel. Ten seconds of slack
    /// independent of consumer speed.
    pub fn ring_depth(self) -> u64 {
        10 * self.sample_rate as u64
    }

    /// Wall-clock duration of one block.
    pub fn block_period(self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.block_size as f64 / self.sample_rate as f64)
    }
}

/// Parses operator count notation: `200k` is 200_000, `2M` is 2_000_000,
/// anything after the magnitude suffix (or the first non-numeric
/// character) is dropped. Returns `None` unless the result is a positive
/// integer.
pub fn parse_count(text: &str) -> Option<u64> {
    let mut digits = String::new();
    let mut scale = 1.0;
    for c in text.trim().chars() {
        match c {
            '0'..='9' | '.' => digits.push(c),
            'k' | 'K' => {
                scale = 1e3;
                break;
            }
            'M' => {
                scale = 1e6;
                break;
            }
            _ => break,
        }
    }
    let value: f64 = digits.parse().ok()?;
    let count = (value * scale) as u64;
    (count > 0).then_some(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_bounds_are_inclusive() {
        assert!(ClockSpec { sample_rate: 10_000, block_size: 1_000 }.validate().is_ok());
        assert!(ClockSpec { sample_rate: 10_000, block_size: 50_000 }.validate().is_ok());
        assert!(matches!(
            ClockSpec { sample_rate: 10_000, block_size: 999 }.validate(),
            Err(Error::RatioOutOfRange { .. })
        ));
        assert!(matches!(
            ClockSpec { sample_rate: 10_000, block_size: 50_001 }.validate(),
            Err(Error::RatioOutOfRange { .. })
        ));
    }

    #[test]
    fn full_rate_block_accepted_small_block_rejected() {
        assert!(ClockSpec { sample_rate: 200_000, block_size: 200_000 }.validate().is_ok());
        assert!(matches!(
            ClockSpec { sample_rate: 200_000, block_size: 5_000 }.validate(),
            Err(Error::RatioOutOfRange { sample_rate: 200_000, block_size: 5_000 })
        ));
    }

    #[test]
    fn ring_depth_is_ten_seconds() {
        let clock = ClockSpec { sample_rate: 200_000, block_size: 200_000 };
        assert_eq!(clock.ring_depth(), 2_000_000);
    }

    #[test]
    fn channel_count_from_separators() {
        let one = ChannelSpec::new("Dev1/ai0", VoltageRange::Pm5, TerminalConfig::Default);
        assert_eq!(one.channel_count(), 1);

        let three = ChannelSpec::new(
            "Dev1/ai0,Dev1/ai1,Dev1/ai2",
            VoltageRange::Pm5,
            TerminalConfig::Rse,
        );
        assert_eq!(three.channel_count(), 3);
        assert_eq!(
            three.names().collect::<Vec<_>>(),
            vec!["Dev1/ai0", "Dev1/ai1", "Dev1/ai2"]
        );
    }

    #[test]
    fn range_presets() {
        assert_eq!(VoltageRange::from_volts(1), Some(VoltageRange::Pm1));
        assert_eq!(VoltageRange::from_volts(10), Some(VoltageRange::Pm10));
        assert_eq!(VoltageRange::from_volts(2), None);
        assert_eq!(VoltageRange::Pm5.min_volts(), -5.0);
        assert_eq!(VoltageRange::Pm5.max_volts(), 5.0);
    }

    #[test]
    fn terminal_names_round_trip() {
        for mode in [
            TerminalConfig::Default,
            TerminalConfig::Differential,
            TerminalConfig::Rse,
            TerminalConfig::Nrse,
        ] {
            assert_eq!(TerminalConfig::parse(mode.name()), Some(mode));
        }
        assert_eq!(TerminalConfig::parse("differential"), None);
    }

    #[test]
    fn count_notation() {
        assert_eq!(parse_count("200k"), Some(200_000));
        assert_eq!(parse_count("2M"), Some(2_000_000));
        assert_eq!(parse_count("2.5k"), Some(2_500));
        assert_eq!(parse_count("1234"), Some(1_234));
        assert_eq!(parse_count("200k samples"), Some(200_000));
        assert_eq!(parse_count("0"), None);
        assert_eq!(parse_count("fast"), None);
        assert_eq!(parse_count(""), None);
    }
}
