use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Input to a live rest countdown. `Tick` means the interval passed with
/// nothing pressed; the session then re-reads the clock.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Key(KeyEvent),
    Timer(TimerCommand),
    Tick,
}

/// Controls offered while the countdown is on screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerCommand {
    TogglePause,
    Add,
    Subtract,
    Skip,
    Quit,
}

impl TimerCommand {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Self::Quit);
        }
        match key.code {
            KeyCode::Char(' ') | KeyCode::Char('p') => Some(Self::TogglePause),
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => Some(Self::Add),
            KeyCode::Char('-') | KeyCode::Down => Some(Self::Subtract),
            KeyCode::Char('s') | KeyCode::Enter => Some(Self::Skip),
            KeyCode::Char('q') | KeyCode::Esc => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Where countdown input comes from: the terminal, or a channel fed by a test
pub trait SessionEventSource: Send + 'static {
    /// Waits at most `timeout`; `Err(Timeout)` lets the runner emit a tick.
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError>;
}

/// Reads key presses on a background thread while the terminal is in raw mode.
/// Releases and auto-repeats are dropped so one press adjusts the timer once.
pub struct CrosstermEventSource {
    rx: Receiver<SessionEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(ev) => {
                    if let Some(ev) = session_event(ev) {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                }
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

fn session_event(ev: CtEvent) -> Option<SessionEvent> {
    match ev {
        CtEvent::Key(key) if key.kind == KeyEventKind::Press => Some(SessionEvent::Key(key)),
        _ => None,
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How often the countdown redraws and checks for expiry
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Tick at a constant rate, `Config::tick_interval` in the binary
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Replays whatever is sent on the channel. Used when stdin is not a tty.
pub struct TestEventSource {
    rx: Receiver<SessionEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<SessionEvent>) -> Self {
        Self { rx }
    }
}

impl SessionEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Drives a rest countdown: each call yields the next key or a tick
pub struct Runner<E: SessionEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: SessionEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Waits one tick interval for input. A closed source also reads as a tick,
    /// so an unattended countdown still runs to expiry.
    pub fn step(&self) -> SessionEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                SessionEvent::Tick
            }
        }
    }

    /// Like `step`, with key presses translated to timer commands.
    /// Unmapped keys come back as `Key`.
    pub fn next_command(&self) -> SessionEvent {
        match self.step() {
            SessionEvent::Key(key) => match TimerCommand::from_key(&key) {
                Some(cmd) => SessionEvent::Timer(cmd),
                None => SessionEvent::Key(key),
            },
            ev => ev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        let ev = runner.step();
        match ev {
            SessionEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(SessionEvent::Timer(TimerCommand::Skip)).unwrap();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            SessionEvent::Timer(TimerCommand::Skip) => {}
            _ => panic!("expected Skip command"),
        }
    }

    #[test]
    fn next_command_maps_keys() {
        let (tx, rx) = mpsc::channel();
        tx.send(SessionEvent::Key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE)))
            .unwrap();
        tx.send(SessionEvent::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)))
            .unwrap();
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(10)),
        );

        assert!(matches!(
            runner.next_command(),
            SessionEvent::Timer(TimerCommand::TogglePause)
        ));
        assert!(matches!(runner.next_command(), SessionEvent::Key(_)));
    }

    #[test]
    fn only_key_presses_reach_the_countdown() {
        let press = KeyEvent::new(KeyCode::Char('+'), KeyModifiers::NONE);
        assert!(matches!(
            session_event(CtEvent::Key(press)),
            Some(SessionEvent::Key(_))
        ));

        let mut repeat = press;
        repeat.kind = KeyEventKind::Repeat;
        assert!(session_event(CtEvent::Key(repeat)).is_none());
        let mut release = press;
        release.kind = KeyEventKind::Release;
        assert!(session_event(CtEvent::Key(release)).is_none());
        assert!(session_event(CtEvent::Resize(80, 24)).is_none());
    }

    #[test]
    fn ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(TimerCommand::from_key(&key), Some(TimerCommand::Quit));
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(TimerCommand::from_key(&key), None);
    }
}
