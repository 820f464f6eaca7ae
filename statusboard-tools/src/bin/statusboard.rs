//! statusboard
//!
//! Dashboard daemon: cycles the configured pages on the OLED panel (or the
//! terminal) and reads the configured push-buttons from sysfs GPIO.

use statusboard::config::ModeConfig;
use statusboard::display::DisplaySink;
use statusboard::input::{InputMonitor, SysfsGpio};
use statusboard::metrics::{DockerCli, HostMetrics};
use statusboard::pages::{self, Sources};
use statusboard::runtime::{self, RenderLoop, RunFlag, SystemPower};
use statusboard::schedule::{Mode, Screensaver};
use statusboard::{Config, PageScheduler};
#[cfg(feature = "oled")]
use statusboard_tools::oled::{self, OledDisplay};
use statusboard_tools::ConsoleDisplay;

use getopts::Options;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossbeam::channel;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

fn init_logging(log_dir: &Path, verbose: bool) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let date = chrono::Local::now().format("%Y_%m_%d");
    let path = log_dir.join(format!("{}.log", date));
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_timer(ChronoLocal::new("%H:%M:%S".to_string()))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(path)
}

fn run(config: Config, display: Box<dyn DisplaySink>) -> Result<(), statusboard::Error> {
    let running = RunFlag::new();
    let sources = Sources {
        system: Arc::new(HostMetrics::new()),
        containers: Arc::new(DockerCli::default()),
    };
    let pages = config
        .pages
        .iter()
        .map(|spec| pages::build(spec, &sources))
        .collect();

    let now = Instant::now();
    let mode = match config.mode {
        ModeConfig::Auto { delay } => Mode::Auto { delay },
        ModeConfig::Manual {
            screensaver_minutes,
        } => Mode::Manual(Screensaver::new(screensaver_minutes, now)),
    };
    let scheduler = PageScheduler::new(pages, mode, config.show_icons, display, now);

    let (command_send, commands) = channel::bounded(runtime::COMMAND_QUEUE);
    let input = if config.buttons.is_empty() {
        None
    } else {
        let mut monitor = InputMonitor::new(SysfsGpio::new());
        for button in &config.buttons {
            monitor.add(runtime::switch_for(button, command_send.clone()))?;
        }
        Some(monitor.spawn(runtime::INPUT_PERIOD, running.clone())?)
    };
    drop(command_send);

    info!(
        pages = scheduler.len(),
        buttons = config.buttons.len(),
        "statusboard started"
    );
    let render = RenderLoop::new(
        scheduler,
        commands,
        Box::new(SystemPower),
        runtime::RENDER_PERIOD,
        running,
    );
    let result = render.run();

    if let Some(handle) = input {
        if handle.join().is_err() {
            warn!("input thread panicked");
        }
    }
    result?;
    Ok(())
}

fn main() -> ExitCode {
    let mut opts = Options::new();
    opts.optopt(
        "c",
        "",
        "Configuration file (default config/config.yml next to the executable)",
        "path",
    );
    opts.optopt(
        "l",
        "",
        "Log directory (default log/ next to the executable)",
        "dir",
    );
    opts.optopt("d", "", "Display: oled or console (default console)", "kind");
    opts.optopt(
        "",
        "i2c",
        "I2C bus of the OLED panel (default /dev/i2c-1)",
        "path",
    );
    opts.optflag("v", "", "Debug logging");
    opts.optflag("", "check", "Validate the configuration, then quit");
    opts.optflag("h", "help", "Show this help");

    let args: Vec<String> = env::args().collect();

    macro_rules! die{
        ($f:expr,$($a:tt)*)=>{
        {
            die!(format!($f, $($a)*));
        }
        };
        ($msg:expr)=>{
        {
            eprintln!("ERROR: {}", $msg);
            return ExitCode::FAILURE;
        }
        };
    }

    let usage = format!(
        "Usage: {} [-c config] [-l logdir] [-d oled|console] [-v] [--check]",
        args.first().map(String::as_str).unwrap_or("statusboard")
    );
    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(m) => m,
        Err(f) => die!("{}\n{}", f, opts.usage(&usage)),
    };
    if matches.opt_present("h") {
        print!("{}", opts.usage(&usage));
        return ExitCode::SUCCESS;
    }

    let base = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let config_path = matches
        .opt_str("c")
        .map(PathBuf::from)
        .unwrap_or_else(|| base.join("config").join("config.yml"));
    let log_dir = matches
        .opt_str("l")
        .map(PathBuf::from)
        .unwrap_or_else(|| base.join("log"));

    let log_file = match init_logging(&log_dir, matches.opt_present("v")) {
        Ok(path) => path,
        Err(err) => die!("cannot open log in {}: {}", log_dir.display(), err),
    };

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!("{}: {}", config_path.display(), err);
            die!("{}", err);
        }
    };
    if matches.opt_present("check") {
        println!("{}: ok", config_path.display());
        return ExitCode::SUCCESS;
    }

    info!("logging to {}", log_file.display());
    let display: Box<dyn DisplaySink> = match matches.opt_str("d").as_deref() {
        None | Some("console") => Box::new(ConsoleDisplay::stdout()),
        #[cfg(feature = "oled")]
        Some("oled") => {
            let bus = matches
                .opt_str("i2c")
                .unwrap_or_else(|| oled::I2C_BUS.to_string());
            match OledDisplay::open(&bus) {
                Ok(panel) => Box::new(panel),
                Err(err) => {
                    error!("{}: {}", bus, err);
                    die!("cannot open the display on {}: {}", bus, err);
                }
            }
        }
        #[cfg(not(feature = "oled"))]
        Some("oled") => die!("oled display support was not compiled in (feature \"oled\")"),
        Some(other) => die!("unknown display '{}', expected oled or console", other),
    };
    match run(config, display) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            die!("{}", err);
        }
    }
}
