use clap::{Arg, ArgAction, Command, value_parser};
use daq_tdms_bridge::config::{ChannelSpec, ClockSpec, TerminalConfig, VoltageRange, parse_count};
use daq_tdms_bridge::driver::Driver;
use daq_tdms_bridge::session::{AcquisitionSession, LogPolicy, SessionState};
use daq_tdms_bridge::sim::SimDaq;
use daq_tdms_bridge::sink::{NullPlot, RawSegmentWriter};
use status_line::StatusLine;
use std::{
    error::Error,
    fmt::Display,
    path::PathBuf,
    process::exit,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use thread_priority::{ThreadPriority, set_current_thread_priority};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let matches = Command::new("capture-tdms")
        .about("Continuously capture analog input into segmented TDMS files")
        .arg(
            Arg::new("folder")
                .short('o')
                .long("folder")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .help("Folder the segment files are created in"),
        )
        .arg(
            Arg::new("channels")
                .short('c')
                .long("channels")
                .default_value("SimDAQ1/ai0")
                .help("Comma-joined physical channel list"),
        )
        .arg(
            Arg::new("samplerate")
                .short('s')
                .long("samplerate")
                .default_value("200k")
                .help("Sample rate per channel, e.g. 200k"),
        )
        .arg(
            Arg::new("blocksize")
                .short('b')
                .long("blocksize")
                .default_value("200k")
                .help("Samples per channel per block, e.g. 200k"),
        )
        .arg(
            Arg::new("range")
                .short('r')
                .long("range")
                .default_value("5")
                .value_parser(["1", "5", "10"])
                .help("Symmetric voltage range in volts"),
        )
        .arg(
            Arg::new("termconfig")
                .short('t')
                .long("termconfig")
                .default_value("Default")
                .value_parser(["Default", "Differential", "RSE", "NRSE"])
                .help("Terminal configuration"),
        )
        .arg(
            Arg::new("maxsamples")
                .short('m')
                .long("max-samples")
                .default_value("3M")
                .help("Samples per channel per file before rollover"),
        )
        .arg(
            Arg::new("nolog")
                .long("no-log")
                .action(ArgAction::SetTrue)
                .help("Stream to the plot sink only, write no files"),
        )
        .arg(
            Arg::new("list")
                .long("list-channels")
                .action(ArgAction::SetTrue)
                .help("List the available analog input channels and exit"),
        )
        .get_matches();

    let daq = SimDaq::new("SimDAQ1");
    if matches.get_flag("list") {
        for name in daq.ai_channels()? {
            println!("{name}");
        }
        return Ok(());
    }

    let folder = matches.get_one::<PathBuf>("folder").unwrap().clone();
    let sample_rate = parse_count(matches.get_one::<String>("samplerate").unwrap())
        .ok_or("invalid sample rate")?;
    let block_size = parse_count(matches.get_one::<String>("blocksize").unwrap())
        .ok_or("invalid block size")?;
    let max_samples = parse_count(matches.get_one::<String>("maxsamples").unwrap())
        .ok_or("invalid max samples per file")?;
    let range = VoltageRange::from_volts(
        matches.get_one::<String>("range").unwrap().parse().unwrap(),
    )
    .unwrap();
    let terminal =
        TerminalConfig::parse(matches.get_one::<String>("termconfig").unwrap()).unwrap();

    let channels = ChannelSpec::new(
        matches.get_one::<String>("channels").unwrap().clone(),
        range,
        terminal,
    );
    let clock = ClockSpec {
        sample_rate: u32::try_from(sample_rate)?,
        block_size: u32::try_from(block_size)?,
    };
    let max_samples_per_file = Arc::new(AtomicU64::new(max_samples));
    let logging = !matches.get_flag("nolog");

    let log = if logging {
        std::fs::create_dir_all(&folder)?;
        Some(LogPolicy {
            sink: Box::new(RawSegmentWriter::new()),
            folder: folder.clone(),
            max_samples_per_file: max_samples_per_file.clone(),
        })
    } else {
        None
    };

    eprintln!(
        "starting acquisition on {:?}: {} channel(s) at {} S/s",
        channels.physical_channels(),
        channels.channel_count(),
        clock.sample_rate
    );
    let mut session =
        AcquisitionSession::configure(&daq, channels, clock, Box::new(NullPlot), log)?;

    #[derive(Clone)]
    struct Progress {
        recorded: Arc<AtomicU64>,
        in_file: Arc<AtomicU64>,
        segments: Arc<AtomicU64>,
        sample_rate: f64,
    }
    impl Display for Progress {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let recorded = self.recorded.load(Ordering::Relaxed);
            write!(
                f,
                "Recorded: {} ({:.02}s) \t In file: {} \t Segments: {}",
                recorded,
                recorded as f64 / self.sample_rate,
                self.in_file.load(Ordering::Relaxed),
                self.segments.load(Ordering::Relaxed)
            )
        }
    }

    let progress = Progress {
        recorded: Arc::new(AtomicU64::new(0)),
        in_file: Arc::new(AtomicU64::new(0)),
        segments: Arc::new(AtomicU64::new(0)),
        sample_rate: clock.sample_rate as f64,
    };
    let status = StatusLine::new(progress.clone());

    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();
    ctrlc::set_handler(move || {
        if stop_clone.load(Ordering::Relaxed) {
            eprintln!("Killing...");
            exit(-1);
        }
        stop_clone.store(true, Ordering::Relaxed);
    })?;

    if let Err(err) = set_current_thread_priority(ThreadPriority::Max) {
        log::warn!("could not raise acquisition thread priority: {err:?}");
    }

    session.start()?;
    while session.state() == SessionState::Running && !stop.load(Ordering::Relaxed) {
        if let Err(err) = session.on_samples_ready() {
            eprintln!("Error: {err}");
            break;
        }
        progress.recorded.store(
            session.blocks_delivered() * clock.block_size as u64,
            Ordering::Relaxed,
        );
        progress
            .in_file
            .store(session.samples_in_current_file(), Ordering::Relaxed);
        progress
            .segments
            .store(session.segments_opened(), Ordering::Relaxed);
    }
    session.stop()?;

    eprintln!("{}", progress);
    drop(status);
    eprintln!("Done!");

    Ok(())
}
