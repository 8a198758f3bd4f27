use std::io::{self, stdout, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, TryRecvError};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};

use vxconsole::app::LogicThread;
use vxconsole::config::Config;
use vxconsole::headless;
use vxconsole::remote::{ScriptedTransport, TcpTransport, Transport};
use vxconsole::render::RenderState;
use vxconsole::settings::{JsonSettings, MemorySettings, SettingsStore};
use vxconsole::{ui, vlog, vlog_warn, Result};

const FRAME_DURATION: Duration = Duration::from_micros(16_666); // 60fps

/// vxconsole - remote developer console for devkit targets
#[derive(Parser, Debug)]
#[command(name = "vxconsole")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    VXCONSOLE_DEBUG=1     Enable debug logging (alternative to --debug)\n    VXCONSOLE_LOG=trace   Set the log level explicitly"
)]
pub struct Cli {
    /// Target to connect to (host[:port]); defaults to the last one used
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Enable debug logging (writes to ~/.vxconsole/vxconsole.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Connect on startup and keep reconnecting
    #[arg(long)]
    pub auto_connect: bool,

    /// Record console output to a transcript file
    #[arg(long)]
    pub playtest: bool,

    /// Talk to a built-in demo target instead of the network
    #[arg(long)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Connect, run one console line, print its output and exit
    Exec {
        /// The console line, e.g. `*systime` or `map c1a0`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        line: Vec<String>,
    },

    /// List the built-in console commands
    Commands,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    vxconsole::log::init_with_debug(cli.debug);

    if cli.command == Some(Command::Commands) {
        return headless::print_commands(&mut io::stdout().lock());
    }

    let mut config = Config::load()?;
    let settings = load_settings();
    config.apply_settings(settings.as_ref());
    if let Some(target) = &cli.target {
        config.target = target.clone();
    }
    if cli.auto_connect {
        config.auto_connect = true;
    }
    if cli.playtest {
        config.playtest_mode = true;
    }

    let transport: Arc<dyn Transport> = if cli.offline {
        Arc::new(ScriptedTransport::demo())
    } else {
        Arc::new(TcpTransport::new(config.request_timeout()))
    };

    if let Some(Command::Exec { line }) = cli.command {
        return match headless::exec(&config, transport, &line.join(" "), &mut io::stdout().lock()) {
            Err(e) if e.is_recoverable() => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
            other => other,
        };
    }

    vlog!(
        "vxconsole starting target={:?}{}",
        config.target,
        if cli.debug { " (debug)" } else { "" }
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let (state_tx, state_rx) = crossbeam_channel::bounded::<RenderState>(1);

    let shutdown_clone = shutdown.clone();
    let logic_handle = thread::spawn(move || {
        LogicThread::run(config, transport, settings, state_tx, shutdown_clone)
    });

    let mut terminal = setup_terminal()?;
    let result = render_loop(&mut terminal, state_rx, &shutdown);

    shutdown.store(true, Ordering::SeqCst);
    let logic_result = match logic_handle.join() {
        Ok(r) => r,
        Err(_) => {
            vlog_warn!("logic thread panicked");
            Ok(())
        }
    };
    restore_terminal(&mut terminal)?;
    result.and(logic_result)
}

fn load_settings() -> Box<dyn SettingsStore> {
    let loaded = Config::settings_path().and_then(|path| JsonSettings::load(&path));
    match loaded {
        Ok(settings) => Box::new(settings),
        Err(e) => {
            vlog_warn!("settings unavailable ({}), changes will not be kept", e);
            Box::new(MemorySettings::new())
        }
    }
}

fn render_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: Receiver<RenderState>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let mut state = RenderState::default();
    let mut last_version: u64 = 0;
    let mut last_frame = Instant::now();
    let mut dirty = true;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match state_rx.try_recv() {
            Ok(s) => {
                dirty = dirty || s.version != last_version;
                state = s;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => break,
        }

        if last_frame.elapsed() < FRAME_DURATION {
            thread::sleep(Duration::from_micros(500));
            continue;
        }
        last_frame = Instant::now();

        if dirty {
            terminal.draw(|f| ui::draw(f, &state))?;
            last_version = state.version;
            dirty = false;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(disable_raw_mode()?)
}
