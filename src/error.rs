use std::io;

/// Errors reported by the acquisition pipeline.
///
/// The first four variants are configuration-time: they are returned
/// synchronously, before the session holds any hardware resource, and the
/// operator can correct the inputs and try again. `Device` is the runtime
/// class: it is fatal to the session and carries the driver's extended
/// diagnostic text verbatim.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "block size {block_size} incompatible with sample rate {sample_rate}: \
         block_size/sample_rate must lie within 0.1..=5"
    )]
    RatioOutOfRange { sample_rate: u32, block_size: u32 },

    #[error("no device or channel matches {0:?}")]
    DeviceUnavailable(String),

    #[error("voltage range rejected by device: {0}")]
    InvalidRange(String),

    #[error("terminal configuration rejected by device: {0}")]
    InvalidTerminalConfig(String),

    #[error("device fault: {0}")]
    Device(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
