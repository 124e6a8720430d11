//! Daemon entry point for the virtual touch service.
//!
//! Listens for control frames on a Unix datagram socket (one frame per
//! datagram), optionally tails a keyboard event device, and emits
//! synthetic touch contacts through a uinput virtual device.

use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use evdev::EventType;

use vtouch::config::StartupConfig;
use vtouch::device::TouchDevice;
use vtouch::sink::{TouchSink, TraceSink, UinputTouchSink};
use vtouch::watchdog::Watchdog;
use vtouch::worker::Worker;

/// Number of contact slots advertised by the virtual device.
const TOUCH_SLOTS: i32 = 10;

#[derive(Parser, Debug)]
#[command(name = "vtouchd", version, about = "Virtual multi-touch input service")]
struct Args {
    /// Config file (defaults to ~/.config/vtouch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Unix datagram socket accepting control frames
    #[arg(long, default_value = "/run/vtouch.sock")]
    socket: PathBuf,

    /// Keyboard event device to follow, e.g. /dev/input/event3
    #[arg(long)]
    keyboard: Option<PathBuf>,

    /// Log touch reports instead of creating a uinput device
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vtouch=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(StartupConfig::default_path);
    let boot = StartupConfig::load(&config_path)?;
    tracing::info!(
        config = %config_path.display(),
        screen = format!("{}x{}", boot.screen_width, boot.screen_height),
        mode = boot.mode.name(),
        mappings = boot.mappings.len(),
        "starting"
    );

    let device = TouchDevice::new(&boot);

    let sink: Box<dyn TouchSink> = if args.dry_run {
        tracing::info!("dry run, touch reports are logged only");
        Box::new(TraceSink)
    } else {
        Box::new(
            UinputTouchSink::new(
                "vtouch virtual touchscreen",
                boot.screen_width,
                boot.screen_height,
                TOUCH_SLOTS,
            )
            .context("creating uinput device (is /dev/uinput accessible?)")?,
        )
    };
    device.attach_sink(sink);

    let watchdog = Watchdog::spawn(&device).context("spawning watchdog")?;
    let worker = Worker::spawn(&device).context("spawning worker")?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            tracing::info!("shutdown requested");
            running.store(false, Ordering::SeqCst);
        })
        .context("installing signal handler")?;
    }

    if let Some(path) = &args.keyboard {
        spawn_keyboard_reader(path.clone(), Arc::clone(&device), Arc::clone(&running))?;
    }

    run_socket_loop(&args.socket, &device, &running)?;

    watchdog.stop();
    worker.stop();
    let _ = std::fs::remove_file(&args.socket);
    tracing::info!("bye");
    Ok(())
}

/// Accept control frames until shutdown. Each datagram is one frame.
fn run_socket_loop(
    path: &PathBuf,
    device: &Arc<TouchDevice>,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("removing stale socket {}", path.display()))?;
    }
    let socket = UnixDatagram::bind(path)
        .with_context(|| format!("binding control socket {}", path.display()))?;
    // Short timeout so the shutdown flag is observed promptly
    socket.set_read_timeout(Some(Duration::from_millis(500)))?;
    tracing::info!(socket = %path.display(), "control socket ready");

    let mut buf = [0u8; 512];
    while running.load(Ordering::SeqCst) {
        let n = match socket.recv(&mut buf) {
            Ok(n) => n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(e).context("receiving control frame"),
        };
        match device.write(&buf[..n]) {
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, len = n, "control frame rejected"),
        }
    }
    Ok(())
}

/// Tail a keyboard device, feeding key transitions to the mode
/// controller. Repeats (value 2) are dropped.
fn spawn_keyboard_reader(
    path: PathBuf,
    device: Arc<TouchDevice>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let mut keyboard = evdev::Device::open(&path)
        .with_context(|| format!("opening keyboard device {}", path.display()))?;
    tracing::info!(keyboard = %path.display(), "following keyboard");

    std::thread::Builder::new()
        .name("vtouch-keys".into())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                let events = match keyboard.fetch_events() {
                    Ok(events) => events,
                    Err(err) => {
                        tracing::warn!(%err, "keyboard read failed, stopping reader");
                        return;
                    }
                };
                for event in events {
                    if event.event_type() != EventType::KEY {
                        continue;
                    }
                    let pressed = match event.value() {
                        0 => false,
                        1 => true,
                        _ => continue,
                    };
                    if let Err(err) = device.handle_key_event(event.code() as u32, pressed) {
                        tracing::warn!(%err, code = event.code(), "key event failed");
                    }
                }
            }
        })
        .context("spawning keyboard reader")?;
    Ok(())
}
