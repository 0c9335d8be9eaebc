use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use turret_vision::error::Error;
use turret_vision::mode::prompt_mode;
use turret_vision::surface::{HeadlessSurface, HighGuiSurface, Surface};
use turret_vision::telemetry::{LogChannel, SerialChannel, TelemetryChannel, TelemetryPublisher};
use turret_vision::{list_devices, Camera, Mode, Session, VisionConfig};

const WINDOW: &str = "turret-vision";

#[derive(Parser, Debug)]
#[command(name = "turret-vision", about = "Track the vision target and report turn angles")]
struct Args {
    /// TOML config, defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// calibration, shooting or gear
    #[arg(short, long)]
    mode: Option<Mode>,
    /// Ask for the mode even if the config sets one
    #[arg(long)]
    interactive: bool,
    /// Run without a preview window
    #[arg(long)]
    headless: bool,
    /// Camera index
    #[arg(long)]
    device: Option<i32>,
    /// Serial port of the turret controller
    #[arg(long)]
    port: Option<PathBuf>,
    /// Print available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<VisionConfig, Error> {
    let mut config = match &args.config {
        Some(path) => VisionConfig::load(path)?,
        None => VisionConfig::default(),
    };

    if let Some(device) = args.device {
        config.camera.device = device;
    }
    if let Some(port) = &args.port {
        config.telemetry.port = Some(port.clone());
    }
    if args.headless {
        config.display.preview = false;
    }
    config.validate()?;

    Ok(config)
}

fn resolve_mode(args: &Args, config: &VisionConfig) -> Result<Mode, Error> {
    let configured = if args.interactive { None } else { config.mode };
    match args.mode.or(configured) {
        Some(mode) => Ok(mode),
        None => prompt_mode(&mut io::stdin().lock(), &mut io::stdout()),
    }
}

/// Ctrl+C ends the loop normally so the camera is released on the way out.
fn stop_on_interrupt(cancel: Arc<AtomicBool>) {
    if let Err(err) = ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    }) {
        log::warn!("failed to install Ctrl+C handler: {err}");
    }
}

fn run(args: Args) -> Result<(), Error> {
    if args.list_ports {
        for port in list_devices()? {
            println!("{}", port.display());
        }
        return Ok(());
    }

    let config = load_config(&args)?;
    let mode = resolve_mode(&args, &config)?;
    let session = Session::new(mode, &config);

    let channel: Box<dyn TelemetryChannel> = match &config.telemetry.port {
        Some(port) => Box::new(SerialChannel::new(port.clone(), config.telemetry.baud_rate)),
        None => {
            log::info!("no telemetry port configured, values are only logged");
            Box::new(LogChannel)
        }
    };
    let mut publisher = TelemetryPublisher::new(channel);

    // released on every way out of this function
    let mut camera = Camera::open(&config.camera)?;

    let poll = Duration::from_millis(config.display.poll_ms);
    let (mut surface, cancel): (Box<dyn Surface>, Arc<AtomicBool>) = if config.display.preview {
        let surface = HighGuiSurface::new(WINDOW, poll);
        let cancel = surface.cancel_handle();
        (Box::new(surface) as Box<dyn Surface>, cancel)
    } else {
        let surface = HeadlessSurface::new(poll);
        let cancel = surface.cancel_handle();
        (Box::new(surface) as Box<dyn Surface>, cancel)
    };
    stop_on_interrupt(cancel);

    let summary = session.run(&mut camera, &mut publisher, surface.as_mut())?;
    log::info!(
        "{} frames, {} published, last estimate {:.1} fps",
        summary.frames,
        summary.published,
        summary.fps
    );

    Ok(())
}
