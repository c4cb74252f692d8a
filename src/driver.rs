//! The hardware boundary.
//!
//! The session core never touches a concrete device. It opens a task
//! through [`Driver`], drives the clock through [`AnalogTask`], and
//! relies on whoever integrates the driver to invoke
//! `AcquisitionSession::on_samples_ready` once per accumulated block, in
//! order and without overlap. How that invocation is scheduled (thread,
//! interrupt, event loop) is the integration layer's business.

use crate::buffer::SampleBlock;
use crate::config::{ChannelSpec, ClockSpec};
use crate::error::Error;

/// An analog-input device as seen by the control surface.
pub trait Driver {
    /// The available analog-input channel identifiers, discovery order.
    fn ai_channels(&self) -> Result<Vec<String>, Error>;

    /// Opens the given channels with their shared range and terminal
    /// mode, and programs a free-running clock with an on-device ring of
    /// `clock.ring_depth()` samples per channel. Must not retain any
    /// hardware resource on failure.
    fn open(
        &self,
        channels: &ChannelSpec,
        clock: &ClockSpec,
    ) -> Result<Box<dyn AnalogTask>, Error>;
}

/// One configured hardware task: clock control plus the blocking data
/// plane. Exclusively owned by the acquisition session.
pub trait AnalogTask {
    /// Begins the free-running sample clock.
    fn start(&mut self) -> Result<(), Error>;

    /// Halts the clock without releasing the hardware.
    fn stop(&mut self) -> Result<(), Error>;

    /// Releases the hardware handle. The session calls this exactly
    /// once, after `stop`.
    fn close(&mut self) -> Result<(), Error>;

    /// Reads exactly one block per channel into `buffer`, blocking
    /// without a timeout until the samples are available. The ring depth
    /// is the only slack: a consumer slower than real time for longer
    /// than the ring absorbs surfaces here as a `Device` fault carrying
    /// the driver's diagnostic, never as silent loss.
    fn read_block(&mut self, buffer: &mut SampleBlock) -> Result<(), Error>;
}
