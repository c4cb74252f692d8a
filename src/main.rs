use std::error::Error;

use daq_tdms_bridge::config::{ChannelSpec, ClockSpec, TerminalConfig, VoltageRange};
use daq_tdms_bridge::session::AcquisitionSession;
use daq_tdms_bridge::sim::SimDaq;
use daq_tdms_bridge::sink::NullPlot;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let daq = SimDaq::new("SimDAQ1");
    let channels = ChannelSpec::new("SimDAQ1/ai0", VoltageRange::Pm5, TerminalConfig::Default);
    let clock = ClockSpec { sample_rate: 50_000, block_size: 10_000 };

    let mut session =
        AcquisitionSession::configure(&daq, channels, clock, Box::new(NullPlot), None)?;
    session.start()?;
    for _ in 0..5 {
        session.on_samples_ready()?;
    }
    session.stop()?;

    eprintln!("delivered {} block(s)", session.blocks_delivered());
    Ok(())
}
