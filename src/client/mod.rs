//! Scan buffering client: state machine, keystroke capture, batch sender
//! and the terminal session that drives them.

pub mod api;
pub mod buffer;
pub mod event_bus;
pub mod input;
pub mod sender;
pub mod session;
pub mod view;

pub use api::{HttpIntakeApi, IntakeApi};
pub use buffer::{BufferEntry, BufferError, IntakeState, Mode};
pub use event_bus::{ClientEvent, EventBus, Notice, NoticeLevel};
pub use sender::{BatchOutcome, BatchSender};
pub use session::{ScanSession, SessionCommand};
