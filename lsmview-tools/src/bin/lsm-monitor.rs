// lsm-monitor
//
// Live view of an LSM engine's MemTable and SSTables, mirrored from the
// events the engine pushes over its WebSocket.
//
// Build: cargo run --release --bin lsm-monitor -- [-H host:port] [options]
// Keys:  set <key> <value> / get <key> / del <key>, Enter to send
// Quit:  Esc / Ctrl-C

use crossbeam::channel;
use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::{cursor, style, terminal, ExecutableCommand, QueueableCommand};
use lsmview::shadow::{compose, Frame};
use lsmview::ws::{ConnectionState, WsConnector};
use lsmview::{command, ConnectionManager, Presenter, ShadowModel, UiPort};
use lsmview_tools::{init_logging, lsm_opts, lsm_parseopts};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const DEFAULT_FPS: u64 = 30;
const MIN_COLUMN: usize = 24;
const GUTTER: usize = 4;

#[derive(Debug)]
struct Cli {
    endpoint: String,
    fps: u64,
    log_file: Option<PathBuf>,
}

fn print_help_and_exit(opts: &getopts::Options, program: &str, code: i32) -> ! {
    let brief = format!(
        "Usage: {program} [options]\n\n\
         Live view of an LSM key-value engine's MemTable and SSTables."
    );
    let usage = opts.usage(&brief);
    eprintln!("{usage}");
    std::process::exit(code)
}

fn parse_cli() -> Cli {
    let mut opts = lsm_opts();
    opts.optflag("h", "help", "Show help");
    opts.optopt("", "fps", "UI refresh rate (default 30)", "n");

    let args: Vec<String> = std::env::args().collect();
    let program = args
        .first()
        .cloned()
        .unwrap_or_else(|| "lsm-monitor".into());
    let (matches, endpoint) = match lsm_parseopts(&opts, &args) {
        Ok(parsed) => parsed,
        Err(fail) => {
            eprintln!("{fail}");
            print_help_and_exit(&opts, &program, 2);
        }
    };
    if matches.opt_present("help") {
        print_help_and_exit(&opts, &program, 0);
    }

    let fps = matches
        .opt_str("fps")
        .as_deref()
        .unwrap_or("30")
        .parse()
        .unwrap_or(DEFAULT_FPS)
        .max(1);
    let log_file = matches.opt_str("log-file").map(PathBuf::from);

    Cli {
        endpoint,
        fps,
        log_file,
    }
}

struct Line {
    text: String,
    color: Option<Color>,
    bold: bool,
}

impl Line {
    fn plain(text: impl Into<String>) -> Line {
        Line {
            text: text.into(),
            color: None,
            bold: false,
        }
    }

    fn bold(text: impl Into<String>) -> Line {
        Line {
            bold: true,
            ..Line::plain(text)
        }
    }

    fn colored(text: impl Into<String>, color: Color) -> Line {
        Line {
            color: Some(color),
            ..Line::plain(text)
        }
    }
}

fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

struct Tui {
    stdout: io::Stdout,
}

impl Tui {
    fn setup() -> io::Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        stdout.execute(terminal::EnterAlternateScreen)?;
        stdout.execute(cursor::Hide)?;
        Ok(Self { stdout })
    }

    fn teardown(&mut self) {
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }

    fn draw(&mut self, lines: &[Line]) -> io::Result<()> {
        let (width, height) = terminal::size()?;
        self.stdout.queue(cursor::MoveTo(0, 0))?;
        self.stdout
            .queue(terminal::Clear(terminal::ClearType::All))?;

        for (row, line) in lines.iter().take(height as usize).enumerate() {
            self.stdout.queue(cursor::MoveTo(0, row as u16))?;
            if line.bold {
                self.stdout.queue(SetAttribute(Attribute::Bold))?;
            }
            if let Some(color) = line.color {
                self.stdout.queue(SetForegroundColor(color))?;
            }
            self.stdout
                .queue(style::Print(clip(&line.text, width as usize)))?;
            self.stdout.queue(ResetColor)?;
            self.stdout.queue(SetAttribute(Attribute::Reset))?;
        }

        self.stdout.flush()
    }
}

struct View<'a> {
    endpoint: &'a str,
    fps: u64,
    state: ConnectionState,
    reconnect_in: Option<Duration>,
    frame: &'a Frame,
    presenter: &'a Presenter,
    input: &'a str,
}

fn layout(view: &View) -> Vec<Line> {
    let mut lines = Vec::new();
    let frame = view.frame;

    lines.push(Line::bold(format!(
        "lsm-monitor  {}  fps={}",
        view.endpoint, view.fps
    )));
    lines.push(match view.state {
        ConnectionState::Connected => Line::colored("Connected", Color::Green),
        ConnectionState::Connecting => Line::colored("Connecting...", Color::Yellow),
        ConnectionState::Disconnected => match view.reconnect_in {
            Some(left) => Line::colored(
                format!("Disconnected, retrying in {:.1}s", left.as_secs_f64()),
                Color::Red,
            ),
            None => Line::colored("Disconnected", Color::Red),
        },
    });
    lines.push(Line::plain(""));

    // MemTable on the left, SSTables stacked on the right
    let left: Vec<String> = frame
        .memtable
        .lines
        .iter()
        .map(|l| format!("  {}", l))
        .collect();
    let mut right = Vec::new();
    for panel in &frame.sstables {
        right.push(panel.title.clone());
        right.extend(panel.lines.iter().map(|l| format!("  {}", l)));
    }
    let column = (frame.memtable.width() + 2).max(MIN_COLUMN) + GUTTER;

    lines.push(Line::bold(format!(
        "{:<column$}{}",
        frame.memtable.title, "SSTables"
    )));
    for row in 0..left.len().max(right.len()) {
        let l = left.get(row).map(String::as_str).unwrap_or("");
        let r = right.get(row).map(String::as_str).unwrap_or("");
        lines.push(Line::plain(format!("{:<column$}{}", l, r)));
    }
    lines.push(Line::plain(""));

    lines.push(Line::bold(frame.operations.title.clone()));
    for op in &frame.operations.lines {
        lines.push(Line::plain(format!("  {}", op)));
    }
    lines.push(Line::plain(""));

    lines.push(match view.presenter.status() {
        Some(status) if status.is_error => Line::colored(status.text.clone(), Color::Red),
        Some(status) => Line::colored(status.text.clone(), Color::Green),
        None => Line::plain(""),
    });
    lines.push(Line::plain(""));

    lines.push(Line::bold("Log"));
    for entry in view.presenter.transcript().iter() {
        lines.push(Line::colored(format!("  {}", entry), Color::DarkGrey));
    }
    lines.push(Line::plain(""));

    let prompt = format!("> {}_", view.input);
    lines.push(if view.presenter.controls_enabled() {
        Line::plain(prompt)
    } else {
        Line::colored(prompt, Color::DarkGrey)
    });
    lines.push(Line::colored(
        "set <key> <value> | get <key> | del <key>   Enter to send, Esc to quit",
        Color::DarkGrey,
    ));

    lines
}

/// Returns true when the key asks to quit.
fn on_key(
    key: KeyEvent,
    input: &mut String,
    manager: &mut ConnectionManager<WsConnector>,
    presenter: &mut Presenter,
) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Enter => {
            let sent = match command::parse(input.as_str()) {
                Ok(request) => match manager.send(&request, presenter) {
                    Ok(()) => true,
                    Err(err) => {
                        debug!(%err, "request not sent");
                        false
                    }
                },
                Err(err) => {
                    presenter.show_status(&err.to_string(), true);
                    false
                }
            };
            if sent {
                input.clear();
            }
        }
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Char(c) => input.push(c),
        _ => {}
    }
    false
}

fn main() -> ExitCode {
    let cli = parse_cli();

    if let Some(path) = &cli.log_file {
        if let Err(e) = init_logging(path) {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let mut tui = match Tui::setup() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to set up terminal: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let mut t = Tui {
            stdout: io::stdout(),
        };
        t.teardown();
        original_hook(panic_info);
    }));

    info!(endpoint = %cli.endpoint, fps = cli.fps, "starting");

    let (link_tx, link_rx) = channel::unbounded();
    let mut manager = ConnectionManager::new(WsConnector::new(link_tx), cli.endpoint.clone());
    let mut model = ShadowModel::new();
    let mut presenter = Presenter::new();
    let mut input = String::new();
    manager.connect();

    // Keyboard handler
    let (key_tx, key_rx) = channel::unbounded();
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if key_tx.send(ev).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });

    // UI loop
    let tick = channel::tick(Duration::from_millis(1000 / cli.fps));
    let mut outcome = Ok(());
    'main: loop {
        crossbeam::select! {
            recv(link_rx) -> notice => {
                if let Ok(notice) = notice {
                    manager.handle(notice, &mut model, &mut presenter, Instant::now());
                }
            }

            recv(key_rx) -> ev => {
                if let Ok(event::Event::Key(k)) = ev {
                    if k.kind == KeyEventKind::Press
                        && on_key(k, &mut input, &mut manager, &mut presenter)
                    {
                        break 'main;
                    }
                }
            }

            recv(tick) -> _ => {
                let now = Instant::now();
                manager.poll(now);
                presenter.expire(now);

                let frame = compose(&model);
                let lines = layout(&View {
                    endpoint: manager.endpoint(),
                    fps: cli.fps,
                    state: manager.state(),
                    reconnect_in: manager
                        .reconnect_deadline()
                        .map(|d| d.saturating_duration_since(now)),
                    frame: &frame,
                    presenter: &presenter,
                    input: &input,
                });
                if let Err(e) = tui.draw(&lines) {
                    outcome = Err(e);
                    break 'main;
                }
            }
        }
    }

    tui.teardown();
    match outcome {
        Ok(()) => {
            info!("exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(%e, "terminal output failed");
            eprintln!("Terminal output failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
