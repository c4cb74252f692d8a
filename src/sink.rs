//! Collaborator interfaces fed once per callback.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::buffer::SampleBlock;

/// Waveform sink for the plot surface.
///
/// Pure sink, no backpressure: the core assumes the call never blocks
/// meaningfully. Both views are valid only until the callback returns;
/// a consumer that keeps data longer must copy it.
pub trait PlotSink {
    fn publish(&mut self, time_axis: &[f64], block: &SampleBlock);
}

/// Discards every block. Stands in when no plot surface is attached.
#[derive(Debug, Default)]
pub struct NullPlot;

impl PlotSink for NullPlot {
    fn publish(&mut self, _time_axis: &[f64], _block: &SampleBlock) {}
}

/// Append-capable persistence channel, one open segment at a time.
///
/// Every logged block must be durably appended to the currently open
/// segment before a rollover closes it.
pub trait SegmentSink {
    fn open_segment(&mut self, path: &Path) -> io::Result<()>;
    fn append(&mut self, block: &SampleBlock) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
}

/// Writes segments as raw little-endian f64 frames, channel-major per
/// block: a stand-in for the opaque TDMS encoder behind the same
/// contract.
#[derive(Debug, Default)]
pub struct RawSegmentWriter {
    out: Option<BufWriter<File>>,
}

impl RawSegmentWriter {
    pub fn new() -> Self {
        RawSegmentWriter { out: None }
    }
}

impl SegmentSink for RawSegmentWriter {
    fn open_segment(&mut self, path: &Path) -> io::Result<()> {
        self.out = Some(BufWriter::new(File::create(path)?));
        Ok(())
    }

    fn append(&mut self, block: &SampleBlock) -> io::Result<()> {
        let Some(out) = self.out.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no open segment"));
        };
        for sample in block.as_slice() {
            out.write_all(&sample.to_le_bytes())?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_writer_round_trips_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TDMS_20260101-000000.tdms");

        let mut block = SampleBlock::new(2, 3);
        block.write_block(&[1.0, 2.0, 3.0, -1.0, -2.0, -3.0]);

        let mut writer = RawSegmentWriter::new();
        writer.open_segment(&path).unwrap();
        writer.append(&block).unwrap();
        writer.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let samples: Vec<f64> = bytes
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(samples, vec![1.0, 2.0, 3.0, -1.0, -2.0, -3.0]);
    }

    #[test]
    fn append_without_open_segment_fails() {
        let block = SampleBlock::new(1, 1);
        let mut writer = RawSegmentWriter::new();
        assert!(writer.append(&block).is_err());
    }

    #[test]
    fn close_is_idempotent() {
        let mut writer = RawSegmentWriter::new();
        writer.close().unwrap();
        writer.close().unwrap();
    }
}
