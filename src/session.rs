//! The acquisition session: hardware task ownership, lifecycle, and the
//! block-ready callback path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use log::{debug, info, warn};

use crate::buffer::SampleBlock;
use crate::config::{ChannelSpec, ClockSpec};
use crate::driver::{AnalogTask, Driver};
use crate::error::Error;
use crate::segment::{Segmentation, segment_path};
use crate::sink::{PlotSink, SegmentSink};

/// Session lifecycle. A session is born `Configured` (the idle state is
/// the absence of a session); `Stopped` is terminal, and only a fresh
/// `configure` acquires hardware again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Configured,
    Running,
    Paused,
    Stopped,
}

/// Segmented-logging policy handed to `configure` when logging is on.
pub struct LogPolicy {
    /// Persistence collaborator receiving every logged block.
    pub sink: Box<dyn SegmentSink>,
    /// Folder the segment names are derived under.
    pub folder: PathBuf,
    /// Rollover threshold, samples per channel per file. Shared with the
    /// control surface; re-read at every block boundary.
    pub max_samples_per_file: Arc<AtomicU64>,
}

struct LogState {
    sink: Box<dyn SegmentSink>,
    folder: PathBuf,
    segmentation: Segmentation,
    current_path: Option<PathBuf>,
    segments_opened: u64,
}

/// Owns the hardware task, the per-block sample buffer, and the
/// segmentation bookkeeping for one continuous acquisition run.
///
/// The driver integration layer feeds it through [`on_samples_ready`],
/// once per accumulated block, in order and without overlap. The session
/// itself must not be driven from more than one thread of control at a
/// time; the control surface synchronizes externally if it needs to.
///
/// [`on_samples_ready`]: AcquisitionSession::on_samples_ready
pub struct AcquisitionSession {
    channels: ChannelSpec,
    clock: ClockSpec,
    task: Option<Box<dyn AnalogTask>>,
    buffer: SampleBlock,
    time_axis: Vec<f64>,
    block_index: u64,
    plot: Box<dyn PlotSink>,
    log: Option<LogState>,
    state: SessionState,
}

impl AcquisitionSession {
    /// Validates the clock parameters, then opens the channels and
    /// programs the continuous clock with a ring depth of
    /// `10 * sample_rate` samples per channel.
    ///
    /// Nothing is acquired when validation fails, and a driver failure
    /// returns without retaining any hardware resource: configuration
    /// either fully applies or not at all.
    pub fn configure(
        driver: &dyn Driver,
        channels: ChannelSpec,
        clock: ClockSpec,
        plot: Box<dyn PlotSink>,
        log: Option<LogPolicy>,
    ) -> Result<Self, Error> {
        clock.validate()?;
        let task = driver.open(&channels, &clock)?;

        let channel_count = channels.channel_count();
        let block_size = clock.block_size as usize;
        info!(
            "configured {:?}: {} channel(s) at {} S/s, {} samples/block, ring depth {}",
            channels.physical_channels(),
            channel_count,
            clock.sample_rate,
            clock.block_size,
            clock.ring_depth()
        );

        Ok(AcquisitionSession {
            channels,
            clock,
            task: Some(task),
            buffer: SampleBlock::new(channel_count, block_size),
            time_axis: vec![0.0; block_size],
            block_index: 0,
            plot,
            log: log.map(|policy| LogState {
                sink: policy.sink,
                folder: policy.folder,
                segmentation: Segmentation::new(policy.max_samples_per_file),
                current_path: None,
                segments_opened: 0,
            }),
            state: SessionState::Configured,
        })
    }

    /// Opens the first segment when logging is on, then begins the
    /// clock.
    ///
    /// # Panics
    ///
    /// Calling this on anything but a freshly configured session
    /// (a paused one included) is a programming error and fails fast;
    /// a fresh `configure` is the only way to restart acquisition.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.state != SessionState::Configured {
            panic!("start() on a {:?} session; a fresh configure() is required", self.state);
        }

        if let Err(err) = self.open_first_segment_and_start_clock() {
            let _ = self.stop();
            return Err(err);
        }
        self.state = SessionState::Running;
        Ok(())
    }

    fn open_first_segment_and_start_clock(&mut self) -> Result<(), Error> {
        if let Some(log) = self.log.as_mut() {
            let path = segment_path(&log.folder);
            log.sink.open_segment(&path)?;
            log.segmentation.reset();
            log.segments_opened += 1;
            info!("logging to {}", path.display());
            log.current_path = Some(path);
        }
        self.task
            .as_mut()
            .expect("a configured session owns its task")
            .start()
    }

    /// Halts the clock without releasing the hardware handle; the buffer
    /// and segmentation state are retained untouched. Takes effect at
    /// the next callback boundary; a callback in flight runs to
    /// completion.
    pub fn pause(&mut self) -> Result<(), Error> {
        match self.state {
            SessionState::Running => {
                self.task
                    .as_mut()
                    .expect("a running session owns its task")
                    .stop()?;
                self.state = SessionState::Paused;
                Ok(())
            }
            SessionState::Paused => Ok(()),
            other => panic!("pause() on a {other:?} session"),
        }
    }

    /// Pauses, then releases the hardware handle and closes the current
    /// segment. Terminal and idempotent: a stopped session only ever
    /// stays stopped. All release steps run even when an earlier one
    /// fails; the first failure is reported.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Stopped {
            return Ok(());
        }

        let mut first_err = None;
        if let Some(task) = self.task.as_mut() {
            if self.state == SessionState::Running {
                if let Err(err) = task.stop() {
                    first_err.get_or_insert(err);
                }
            }
            if let Err(err) = task.close() {
                first_err.get_or_insert(err);
            }
        }
        self.task = None;

        if let Some(log) = self.log.as_mut() {
            if let Err(err) = log.sink.close() {
                first_err.get_or_insert(err.into());
            }
        }

        self.state = SessionState::Stopped;
        info!("session stopped after {} block(s)", self.block_index);
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Hardware notification entry point: one block of
    /// `block_size` samples per channel has accumulated.
    ///
    /// Reads the block into the session buffer (blocking, no timeout),
    /// publishes it to the plot sink, and, when logging, appends it to
    /// the current segment and evaluates rollover. Invoked on a session
    /// that already left `Running`, it does nothing: pause/stop won the
    /// race to this boundary.
    ///
    /// Any failure forces a best-effort release of the hardware (the
    /// session ends `Stopped`) and is returned once the handle is gone;
    /// a mid-stream fault is never retried.
    pub fn on_samples_ready(&mut self) -> Result<(), Error> {
        if self.state != SessionState::Running {
            return Ok(());
        }

        if let Err(err) = self.read_and_dispatch() {
            warn!("fault while streaming: {err}");
            let _ = self.stop();
            return Err(err);
        }
        Ok(())
    }

    fn read_and_dispatch(&mut self) -> Result<(), Error> {
        let timer = Instant::now();
        self.task
            .as_mut()
            .expect("a running session owns its task")
            .read_block(&mut self.buffer)?;
        debug!("block {} read in {:?}", self.block_index, timer.elapsed());

        let rate = self.clock.sample_rate as f64;
        let origin = self.block_index as f64 * self.clock.block_size as f64 / rate;
        for (i, t) in self.time_axis.iter_mut().enumerate() {
            *t = origin + i as f64 / rate;
        }
        self.plot.publish(&self.time_axis, &self.buffer);

        if let Some(log) = self.log.as_mut() {
            log.sink.append(&self.buffer)?;
            if log.segmentation.on_block_logged(self.clock.block_size as u64) {
                log.sink.close()?;
                let path = segment_path(&log.folder);
                log.sink.open_segment(&path)?;
                log.segments_opened += 1;
                debug!("rolled over to {}", path.display());
                log.current_path = Some(path);
            }
        }

        self.block_index += 1;
        Ok(())
    }

    /// Drains callbacks until `stop` is observed at a block boundary or
    /// a fault ends the run. The flag is the cancellation primitive for
    /// driver integrations that poll the data plane from a plain loop.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), Error> {
        while self.state == SessionState::Running && !stop.load(Ordering::Relaxed) {
            self.on_samples_ready()?;
        }
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn channels(&self) -> &ChannelSpec {
        &self.channels
    }

    pub fn clock(&self) -> ClockSpec {
        self.clock
    }

    /// Blocks delivered through the callback so far.
    pub fn blocks_delivered(&self) -> u64 {
        self.block_index
    }

    /// Samples per channel logged into the current segment; zero when
    /// logging is off.
    pub fn samples_in_current_file(&self) -> u64 {
        self.log
            .as_ref()
            .map(|l| l.segmentation.samples_in_current_file())
            .unwrap_or(0)
    }

    /// Segments opened since `start`, the initial one included.
    pub fn segments_opened(&self) -> u64 {
        self.log.as_ref().map(|l| l.segments_opened).unwrap_or(0)
    }

    /// Path of the segment currently receiving blocks.
    pub fn current_segment(&self) -> Option<&Path> {
        self.log
            .as_ref()
            .and_then(|l| l.current_path.as_deref())
    }
}

impl Drop for AcquisitionSession {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
