use tokio::sync::mpsc;

use crate::client::buffer::{CodeField, Field, IntakeState};
use crate::client::event_bus::{ClientEvent, EventBus, NoticeLevel};
use crate::client::input::{self, Capture, Focus, KeyEvent};
use crate::client::sender::BatchSender;
use crate::client::view::render_table;

pub const HELP: &str = "\
Scan or type a code and press Enter to buffer it.
  /qty N    set the quantity for the next entry (default 1)
  /code X   type a code into the code field
  /edit N   edit row N
  /send     send the buffer to the server
  /clear    drop every buffered entry
  /list     show the buffer
  /quit     exit";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Raw keystrokes arriving with no field focused.
    Keys(Vec<KeyEvent>),
    SetCode(String),
    SetQuantity(String),
    /// Zero-based row.
    Edit(usize),
    Send,
    Clear,
    List,
    Help,
    Quit,
}

/// Maps one input line to a command. Plain lines are scanner input.
pub fn parse_line(line: &str) -> Result<SessionCommand, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(SessionCommand::Keys(input::scan_keystrokes(line)));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "qty" | "q" => Ok(SessionCommand::SetQuantity(arg.to_string())),
        "code" | "c" => Ok(SessionCommand::SetCode(arg.to_string())),
        "edit" | "e" => match arg.parse::<usize>() {
            Ok(row) if row >= 1 => Ok(SessionCommand::Edit(row - 1)),
            _ => Err(format!("/edit needs a row number, got {arg:?}")),
        },
        "send" | "s" => Ok(SessionCommand::Send),
        "clear" => Ok(SessionCommand::Clear),
        "list" | "l" => Ok(SessionCommand::List),
        "help" | "h" | "?" => Ok(SessionCommand::Help),
        "quit" | "exit" => Ok(SessionCommand::Quit),
        other => Err(format!("Unknown command /{other}; try /help")),
    }
}

/// Terminal intake session: owns the client state and applies commands
/// one at a time.
pub struct ScanSession {
    state: IntakeState,
    sender: BatchSender,
    bus: EventBus,
}

impl ScanSession {
    pub fn new(sender: BatchSender, bus: EventBus) -> Self {
        Self {
            state: IntakeState::new(),
            sender,
            bus,
        }
    }

    pub fn state(&self) -> &IntakeState {
        &self.state
    }

    pub async fn run_loop(&mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        while let Some(command) = commands.recv().await {
            if !self.handle(command).await {
                break;
            }
        }
        if !self.state.entries().is_empty() {
            tracing::warn!(pending = self.state.entries().len(), "session ended with unsent entries");
        }
        tracing::info!("scan session ended");
    }

    /// Applies one command. Returns `false` once the session should stop.
    pub async fn handle(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Keys(keys) => {
                for key in &keys {
                    match input::capture(&self.state, key, Focus::Body) {
                        Capture::Edited(next) => self.state = next,
                        Capture::Submit => self.submit(),
                        Capture::Ignored => {}
                    }
                }
            }
            SessionCommand::SetCode(raw) => {
                self.state = self.state.with_code(CodeField::typed(&raw));
            }
            SessionCommand::SetQuantity(raw) => {
                self.state = self.state.with_qtty(&raw);
                self.bus
                    .notify(NoticeLevel::Info, format!("Quantity set to {}", self.state.qtty()));
            }
            SessionCommand::Edit(index) => match self.state.select_for_edit(index) {
                Ok(next) => {
                    self.state = next;
                    self.bus.notify(
                        NoticeLevel::Info,
                        format!(
                            "Editing row {}: scan a new code or set /qty, then press Enter",
                            index + 1
                        ),
                    );
                    self.show_table();
                }
                Err(e) => self.bus.notify(NoticeLevel::Error, e.to_string()),
            },
            SessionCommand::Send => {
                let (next, outcome) = self.sender.send(&self.state).await;
                tracing::debug!(?outcome, "send finished");
                self.state = next;
                self.show_table();
            }
            SessionCommand::Clear => {
                if self.state.is_sending() {
                    return true;
                }
                let dropped = self.state.entries().len();
                self.state = self.state.clear();
                self.bus
                    .notify(NoticeLevel::Info, format!("Cleared {dropped} entries"));
            }
            SessionCommand::List => self.show_table(),
            SessionCommand::Help => self.bus.notify(NoticeLevel::Info, HELP),
            SessionCommand::Quit => {
                let pending = self.state.entries().len();
                if pending > 0 {
                    self.bus.notify(
                        NoticeLevel::Warning,
                        format!("Discarding {pending} unsent entries"),
                    );
                }
                return false;
            }
        }
        true
    }

    fn submit(&mut self) {
        match self.state.submit() {
            Ok(next) => {
                self.state = next;
                if self.state.scroll_pending() {
                    self.show_table();
                    self.state = self.state.acknowledge_scroll();
                }
            }
            Err(e) => {
                let hint = match e.field() {
                    Some(Field::Quantity) => " (use /qty N)",
                    _ => "",
                };
                self.bus.notify(NoticeLevel::Error, format!("{e}{hint}"));
            }
        }
    }

    fn show_table(&self) {
        let _ = self.bus.send(ClientEvent::BufferView {
            table: render_table(&self.state),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::IntakeApi;
    use crate::errors::IntakeResult;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct RecordingApi {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl IntakeApi for RecordingApi {
        async fn server_time(&self) -> IntakeResult<i64> {
            Ok(42)
        }

        async fn add_item(&self, code: &str, qtty: f64, date: Option<i64>) -> IntakeResult<String> {
            let line = format!("{code}|{qtty}|{}", date.unwrap_or_default());
            self.lines.lock().unwrap().push(line.clone());
            Ok(line)
        }
    }

    fn session() -> (ScanSession, Arc<RecordingApi>) {
        let api = Arc::new(RecordingApi {
            lines: Mutex::new(Vec::new()),
        });
        let bus = EventBus::new();
        let sender = BatchSender::new(api.clone(), bus.clone());
        (ScanSession::new(sender, bus), api)
    }

    async fn feed(session: &mut ScanSession, lines: &[&str]) {
        for line in lines {
            let cmd = parse_line(line).unwrap();
            assert!(session.handle(cmd).await);
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_line("/qty 4").unwrap(), SessionCommand::SetQuantity("4".into()));
        assert_eq!(parse_line("/edit 2").unwrap(), SessionCommand::Edit(1));
        assert_eq!(parse_line("/send\r\n").unwrap(), SessionCommand::Send);
        assert!(parse_line("/edit 0").is_err());
        assert!(parse_line("/bogus").is_err());
        assert!(matches!(parse_line("ABC").unwrap(), SessionCommand::Keys(k) if k.len() == 4));
    }

    #[tokio::test]
    async fn scans_edits_and_sends() {
        let (mut session, api) = session();
        feed(&mut session, &["/qty 2", "ABC123", "XYZ", "/edit 1", "/qty 5", "QQQ", "/send"]).await;

        assert_eq!(*api.lines.lock().unwrap(), vec!["QQQ|5|42", "XYZ|1|42"]);
        assert!(session.state().entries().is_empty());
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let (mut session, _) = session();
        let (tx, rx) = mpsc::channel(8);
        tx.send(parse_line("A1").unwrap()).await.unwrap();
        tx.send(SessionCommand::Quit).await.unwrap();
        tx.send(parse_line("B2").unwrap()).await.unwrap();

        session.run_loop(rx).await;
        assert_eq!(session.state().entries().len(), 1);
    }

    #[tokio::test]
    async fn rejected_submit_keeps_the_buffer() {
        let (mut session, _) = session();
        let bus = session.bus.clone();
        let mut rx = bus.subscribe();
        feed(&mut session, &["/qty 0", "A1"]).await;

        assert!(session.state().entries().is_empty());
        assert_eq!(session.state().code().text(), "A1");
        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if let ClientEvent::Notice(n) = event {
                saw_error |= n.level == NoticeLevel::Error && n.message.contains("/qty");
            }
        }
        assert!(saw_error);
    }
}
