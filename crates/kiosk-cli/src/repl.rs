//! REPL – the operator's stand-in for the kiosk touch screen.
//!
//! Anything that is not a slash-command is submitted as a typed query.
//!
//! Supported commands:
//!   <n>           – press choice number n (quick question, yes / no)
//!   /tap          – simulate a tap on the screen
//!   /lang th|en   – switch the active language
//!   /arrive       – a visitor steps in front of the camera
//!   /leave        – the visitor walks away
//!   /yes | /no    – answer a "did you mean" prompt
//!   /help         – show this list
//!   /quit | /exit – stop the kiosk

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kiosk_middleware::{ChoiceAction, EventBus, Topic};
use kiosk_types::{Event, EventPayload, Language, QueryOrigin};
use tracing::warn;

use crate::console::ConsoleDisplay;

const SOURCE: &str = "kiosk-cli::repl";

/// One parsed line of operator input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask(String),
    Choose(usize),
    Tap,
    Language(Language),
    Arrive,
    Leave,
    Reply(bool),
    Help,
    Quit,
    Unknown(String),
}

/// Parse one line.  Returns `None` for a blank line.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Ok(n) = line.parse::<usize>() {
        return Some(Command::Choose(n));
    }
    if !line.starts_with('/') {
        return Some(Command::Ask(line.to_string()));
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();
    Some(match (command, arg) {
        ("/tap", _) => Command::Tap,
        ("/lang", Some(code)) => match code.parse::<Language>() {
            Ok(language) => Command::Language(language),
            Err(_) => Command::Unknown(line.to_string()),
        },
        ("/arrive", _) => Command::Arrive,
        ("/leave", _) => Command::Leave,
        ("/yes", _) => Command::Reply(true),
        ("/no", _) => Command::Reply(false),
        ("/help", _) => Command::Help,
        ("/quit" | "/exit", _) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    })
}

/// Handles the REPL needs to drive the kiosk.
pub struct ReplContext {
    pub bus: EventBus,
    pub display: Arc<ConsoleDisplay>,
    pub someone_there: Arc<AtomicBool>,
    pub shutdown: Arc<AtomicBool>,
}

impl ReplContext {
    fn publish(&self, payload: EventPayload) {
        if let Err(e) = self.bus.publish_to(Topic::Input, Event::new(SOURCE, payload)) {
            warn!(error = %e, "kiosk loop is not listening");
        }
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(ctx: &ReplContext) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if ctx.shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "kiosk>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let Some(command) = parse(&line) else {
            continue;
        };

        match command {
            Command::Ask(text) => ctx.publish(EventPayload::QuerySubmitted {
                text,
                origin: QueryOrigin::Typed,
            }),
            Command::Choose(n) => match ctx.display.choice(n) {
                Some(choice) => {
                    ctx.publish(EventPayload::ManualInteraction);
                    ctx.publish(match choice.action {
                        ChoiceAction::Ask(text) => EventPayload::QuerySubmitted {
                            text,
                            origin: QueryOrigin::QuickQuestion,
                        },
                        ChoiceAction::Confirm => EventPayload::ClarificationReply { confirmed: true },
                        ChoiceAction::Deny => EventPayload::ClarificationReply { confirmed: false },
                    });
                }
                None => println!("{} {}", "No choice numbered".red(), n.to_string().yellow()),
            },
            Command::Tap => ctx.publish(EventPayload::ManualInteraction),
            Command::Language(language) => ctx.publish(EventPayload::LanguageChanged(language)),
            Command::Arrive => {
                ctx.someone_there.store(true, Ordering::SeqCst);
                println!("  {}", "(a visitor steps up to the kiosk)".dimmed());
            }
            Command::Leave => {
                ctx.someone_there.store(false, Ordering::SeqCst);
                println!("  {}", "(the visitor walks away)".dimmed());
            }
            Command::Reply(confirmed) => {
                ctx.publish(EventPayload::ClarificationReply { confirmed });
            }
            Command::Help => cmd_help(),
            Command::Quit => {
                println!("{}", "Goodbye.".green());
                ctx.shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Command::Unknown(other) => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }
}

fn cmd_help() {
    println!();
    println!("{}", "Kiosk Commands".bold().underline());
    println!("  {}            – ask a question", "<text>".bold().cyan());
    println!("  {}               – press a numbered choice", "<n>".bold().cyan());
    println!("  {}              – tap the screen", "/tap".bold().cyan());
    println!("  {}      – switch language", "/lang th|en".bold().cyan());
    println!("  {}   – visitor arrives / leaves", "/arrive /leave".bold().cyan());
    println!("  {}         – answer \"did you mean\"", "/yes /no".bold().cyan());
    println!("  {}      – stop the kiosk", "/quit /exit".bold().cyan());
    println!();
}
