//! Simulated multifunction DAQ for the demo binaries and tests.

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use log::debug;
use rand::Rng;

use crate::buffer::SampleBlock;
use crate::config::{ChannelSpec, ClockSpec};
use crate::driver::{AnalogTask, Driver};
use crate::error::Error;

/// A software stand-in for a multifunction DAQ: a few analog inputs,
/// each producing a phase-shifted sine with measurement noise, paced in
/// real time by the configured sample clock.
pub struct SimDaq {
    name: String,
    channel_count: usize,
    signal_hz: f64,
    realtime: bool,
}

impl SimDaq {
    pub fn new(name: &str) -> Self {
        SimDaq {
            name: name.to_string(),
            channel_count: 4,
            signal_hz: 50.0,
            realtime: true,
        }
    }

    /// A device whose reads return as fast as they are asked for.
    /// Tests use this to run a session without waiting on block periods.
    pub fn unpaced(name: &str) -> Self {
        SimDaq {
            realtime: false,
            ..SimDaq::new(name)
        }
    }
}

impl Driver for SimDaq {
    fn ai_channels(&self) -> Result<Vec<String>, Error> {
        Ok((0..self.channel_count)
            .map(|i| format!("{}/ai{}", self.name, i))
            .collect())
    }

    fn open(
        &self,
        channels: &ChannelSpec,
        clock: &ClockSpec,
    ) -> Result<Box<dyn AnalogTask>, Error> {
        let known = self.ai_channels()?;
        for name in channels.names() {
            if !known.iter().any(|k| k == name) {
                return Err(Error::DeviceUnavailable(name.to_string()));
            }
        }

        debug!(
            "sim task: {} channel(s) at {} S/s, ring depth {}",
            channels.channel_count(),
            clock.sample_rate,
            clock.ring_depth()
        );
        Ok(Box::new(SimTask {
            clock: *clock,
            amplitude: 0.8 * channels.range().max_volts(),
            signal_hz: self.signal_hz,
            realtime: self.realtime,
            running: false,
            closed: false,
            sample_index: 0,
            started_at: None,
        }))
    }
}

struct SimTask {
    clock: ClockSpec,
    amplitude: f64,
    signal_hz: f64,
    realtime: bool,
    running: bool,
    closed: bool,
    /// Position of the next sample on the session clock, per channel.
    sample_index: u64,
    started_at: Option<Instant>,
}

impl AnalogTask for SimTask {
    fn start(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::Device("task handle already released".to_string()));
        }
        self.running = true;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.running = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.running = false;
        self.closed = true;
        Ok(())
    }

    fn read_block(&mut self, buffer: &mut SampleBlock) -> Result<(), Error> {
        if !self.running {
            return Err(Error::Device("read on a halted task".to_string()));
        }

        let rate = self.clock.sample_rate as f64;
        if self.realtime {
            // Block until the simulated clock has accumulated one block;
            // a reader lagging by more than the ring depth has lost data.
            let started = self.started_at.unwrap_or_else(Instant::now);
            let due = started
                + Duration::from_secs_f64(
                    (self.sample_index + self.clock.block_size as u64) as f64 / rate,
                );
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            } else {
                let behind = ((now - due).as_secs_f64() * rate) as u64;
                if behind > self.clock.ring_depth() {
                    return Err(Error::Device(format!(
                        "input ring overflow: reader is {behind} samples behind a ring of {}",
                        self.clock.ring_depth()
                    )));
                }
            }
        }

        let mut rng = rand::thread_rng();
        let channels = buffer.channel_count();
        for ch in 0..channels {
            let phase = ch as f64 / channels as f64 * TAU;
            let row = buffer.channel_mut(ch);
            for (i, sample) in row.iter_mut().enumerate() {
                let t = (self.sample_index + i as u64) as f64 / rate;
                *sample = self.amplitude * (TAU * self.signal_hz * t + phase).sin()
                    + rng.gen_range(-0.01..0.01);
            }
        }
        self.sample_index += self.clock.block_size as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TerminalConfig, VoltageRange};

    fn spec() -> (ChannelSpec, ClockSpec) {
        (
            ChannelSpec::new("sim/ai0,sim/ai1", VoltageRange::Pm5, TerminalConfig::Default),
            ClockSpec { sample_rate: 1_000, block_size: 500 },
        )
    }

    #[test]
    fn enumerates_its_channels() {
        let daq = SimDaq::unpaced("sim");
        let names = daq.ai_channels().unwrap();
        assert_eq!(names[0], "sim/ai0");
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn unknown_channel_is_unavailable() {
        let daq = SimDaq::unpaced("sim");
        let channels =
            ChannelSpec::new("other/ai0", VoltageRange::Pm5, TerminalConfig::Default);
        let clock = ClockSpec { sample_rate: 1_000, block_size: 500 };
        assert!(matches!(
            daq.open(&channels, &clock),
            Err(Error::DeviceUnavailable(name)) if name == "other/ai0"
        ));
    }

    #[test]
    fn reads_stay_inside_the_range() {
        let daq = SimDaq::unpaced("sim");
        let (channels, clock) = spec();
        let mut task = daq.open(&channels, &clock).unwrap();
        let mut buffer = SampleBlock::new(2, 500);

        task.start().unwrap();
        for _ in 0..3 {
            task.read_block(&mut buffer).unwrap();
        }
        for sample in buffer.as_slice() {
            assert!(sample.abs() <= 5.0, "{sample} outside ±5 V");
        }
    }

    #[test]
    fn read_before_start_is_a_fault() {
        let daq = SimDaq::unpaced("sim");
        let (channels, clock) = spec();
        let mut task = daq.open(&channels, &clock).unwrap();
        let mut buffer = SampleBlock::new(2, 500);
        assert!(matches!(task.read_block(&mut buffer), Err(Error::Device(_))));
    }
}
