//! `kiosk-cli` – Kiosk Command Line Interface
//!
//! Runs the full kiosk agent in a terminal.  It:
//!
//! 1. Checks for `~/.kiosk/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Starts the [`KioskLoop`] on a Tokio runtime, loading the knowledge
//!    table in the background from the configured URL or file.
//! 3. Drops the operator into an **interactive REPL** that plays the part of
//!    the touch screen and the camera (`/arrive`, `/leave`, `/tap`, …).
//! 4. Intercepts **Ctrl-C** to stop the loop cleanly.

mod config;
mod console;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use kiosk_kernel::{Clock, SystemClock};
use kiosk_knowledge::{FileKnowledgeSource, HttpKnowledgeSource, KnowledgeSource, QueryLog};
use kiosk_middleware::EventBus;
use kiosk_perception::PresenceSource;
use kiosk_runtime::{KioskLoop, SessionController, init_tracing};

use crate::console::{ConsoleDisplay, ConsoleSpeech, SimulatedPresence};

/// Simulated playback speed of the console voice.
const CONSOLE_SPEECH_PER_CHAR: Duration = Duration::from_millis(60);

fn main() {
    let _tracing = init_tracing("kiosk");

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => run_first_run_wizard(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    if let Err(e) = cfg.validate() {
        println!("{}: {}", "Invalid configuration".red(), e);
        return;
    }

    let Some((knowledge, query_log)) = knowledge_source(&cfg) else {
        println!(
            "{} Set {} or {} in {} (see {}).",
            "No knowledge source configured.".red(),
            "knowledge_url".bold(),
            "knowledge_file".bold(),
            config::config_path().display(),
            "demos/knowledge.json".bold()
        );
        return;
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start async runtime".red(), e);
            return;
        }
    };

    // ── Shared shutdown ───────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    {
        let shutdown = shutdown.clone();
        let shutdown_tx = shutdown_tx.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            println!();
            println!("{}", "⚠  Ctrl-C received – stopping the kiosk …".yellow().bold());
            let _ = shutdown_tx.send(true);
            shutdown.store(true, Ordering::SeqCst);
            println!("{}", "  ✓ Press Enter to exit.".green());
        }) {
            warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
        }
    }

    // ── Wiring ────────────────────────────────────────────────────────────
    let bus = EventBus::default();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let display = Arc::new(ConsoleDisplay::new());
    let speech = Arc::new(ConsoleSpeech::new(bus.clone(), CONSOLE_SPEECH_PER_CHAR));
    let someone_there = Arc::new(AtomicBool::new(false));

    let mut controller =
        SessionController::new(cfg.session_config(), clock.clone(), speech, display.clone());
    if let Some(log) = query_log {
        controller = controller.with_query_log(log);
    }
    let kiosk = KioskLoop::new(bus.clone(), clock, cfg.loop_config(), controller);
    let presence: Box<dyn PresenceSource> = Box::new(SimulatedPresence::new(someone_there.clone()));
    let loop_handle = runtime.spawn(kiosk.run(knowledge, Some(presence), shutdown_rx));
    info!(language = %cfg.language, "kiosk started");

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&repl::ReplContext {
        bus,
        display,
        someone_there,
        shutdown,
    });

    let _ = shutdown_tx.send(true);
    if let Err(e) = runtime.block_on(loop_handle) {
        warn!(error = %e, "kiosk loop ended abnormally");
    }
    runtime.shutdown_timeout(Duration::from_secs(1));
}

/// Pick the knowledge source; the HTTP endpoint also serves as the query log.
fn knowledge_source(
    cfg: &config::Config,
) -> Option<(Arc<dyn KnowledgeSource>, Option<Arc<dyn QueryLog>>)> {
    if let Some(path) = &cfg.knowledge_file {
        let source: Arc<dyn KnowledgeSource> = Arc::new(FileKnowledgeSource::new(path));
        return Some((source, None));
    }
    if cfg.knowledge_url.is_empty() {
        return None;
    }
    let http = Arc::new(HttpKnowledgeSource::new(cfg.knowledge_url.clone()));
    let source: Arc<dyn KnowledgeSource> = http.clone();
    let log: Arc<dyn QueryLog> = http;
    Some((source, Some(log)))
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        Kiosk First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up the kiosk.\n");

    let mut cfg = config::Config::default();

    let source = prompt_line(
        "  Knowledge sheet URL or local JSON file [demos/knowledge.json]: ",
        "demos/knowledge.json",
    );
    if source.starts_with("http://") || source.starts_with("https://") {
        cfg.knowledge_url = source;
    } else {
        cfg.knowledge_file = Some(source.into());
    }

    println!("  Default language?");
    println!("    1) Thai     (default)");
    println!("    2) English");
    cfg.language = match prompt_line("  Enter choice [1]: ", "1").trim() {
        "2" => kiosk_types::Language::English,
        _ => kiosk_types::Language::Thai,
    };

    let secs = prompt_line(
        &format!("  Idle timeout in seconds [{}]: ", cfg.idle_timeout_secs),
        &cfg.idle_timeout_secs.to_string(),
    );
    if let Ok(s) = secs.trim().parse::<u64>()
        && s > 0
    {
        cfg.idle_timeout_secs = s;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   __ __ _           __  "#.bold().cyan());
    println!("{}", r#"  / //_/(_)__  ___ / /__"#.bold().cyan());
    println!("{}", r#" / ,<  / / _ \(_-</  '_/"#.bold().cyan());
    println!("{}", r#"/_/|_|/_/\___/___/_/\_\ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Kiosk".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Bilingual information kiosk agent");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
