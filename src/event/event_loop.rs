//! Event/tick loop
//!
//! One thread merges user input, forwarded by a background listener over a
//! channel, with a fixed-interval ticker. Events are handled one at a time in
//! arrival order. Input that changes state renders immediately; every tick
//! renders unconditionally so the clock keeps moving without input.

use super::{dispatch, Action, Outcome};
use crate::display::{Renderer, StatusView};
use crate::playback::PlaybackController;
use crate::streaming::AudioDevice;
use crossterm::event::{self, Event};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// How often the listener re-checks its stop flag while idle.
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for input or the next tick
    Running,
    /// Quit was requested
    Terminated,
}

/// One occurrence from either source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// Raw terminal event
    Input(Event),
    /// Timer fired
    Tick,
}

/// Fixed-interval deadline tracker.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    /// First tick one `interval` from now.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    /// Tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True once the next deadline has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// Time left before the next tick.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Schedule the following tick; missed ticks are skipped, not replayed.
    pub fn advance(&mut self, now: Instant) {
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
    }

    /// Wait for whichever comes first: an input event or the tick deadline.
    ///
    /// Returns `None` when the input side has hung up.
    pub fn next_event(&mut self, events: &Receiver<Event>) -> Option<LoopEvent> {
        let now = Instant::now();
        if self.is_due(now) {
            self.advance(now);
            return Some(LoopEvent::Tick);
        }
        match events.recv_timeout(self.remaining(now)) {
            Ok(event) => Some(LoopEvent::Input(event)),
            Err(RecvTimeoutError::Timeout) => {
                self.advance(Instant::now());
                Some(LoopEvent::Tick)
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// The coordinating loop.
pub struct EventLoop<'a, D: AudioDevice, R: Renderer> {
    controller: &'a PlaybackController<D>,
    renderer: R,
    state: LoopState,
    renders: u64,
}

impl<'a, D: AudioDevice, R: Renderer> EventLoop<'a, D, R> {
    /// Loop over `controller`, drawing through `renderer`.
    pub fn new(controller: &'a PlaybackController<D>, renderer: R) -> Self {
        Self {
            controller,
            renderer,
            state: LoopState::Running,
            renders: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames drawn so far.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Give back the renderer.
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Snapshot under the lock, then draw with the lock released.
    pub fn render(&mut self) {
        let snapshot = self.controller.snapshot();
        let view = StatusView::from_snapshot(&snapshot, self.controller.limits());
        self.renderer.render(&view);
        self.renders += 1;
    }

    /// Handle one input event; renders when the controller reports a change.
    pub fn handle_input(&mut self, event: &Event) -> Outcome {
        let action = Action::decode(event);
        let outcome = dispatch(self.controller, action);
        if action != Action::Ignored {
            debug!(?action, changed = outcome.changed, "input handled");
        }
        if outcome.quit {
            self.state = LoopState::Terminated;
        } else if outcome.changed {
            self.render();
        }
        outcome
    }

    /// Handle one occurrence from either source.
    pub fn step(&mut self, event: LoopEvent) -> LoopState {
        if self.state == LoopState::Terminated {
            return self.state;
        }
        match event {
            LoopEvent::Input(event) => {
                self.handle_input(&event);
            }
            LoopEvent::Tick => self.render(),
        }
        self.state
    }

    /// Run until quit, or until the input side disconnects.
    pub fn run(&mut self, events: &Receiver<Event>, mut ticker: Ticker) {
        while self.state == LoopState::Running {
            let Some(event) = ticker.next_event(events) else {
                warn!("Input source closed, leaving event loop");
                self.state = LoopState::Terminated;
                break;
            };
            self.step(event);
        }
        debug!(renders = self.renders, "event loop terminated");
    }
}

/// Background thread forwarding terminal events into a channel.
pub struct InputListener {
    events: Receiver<Event>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputListener {
    /// Start listening on the terminal.
    pub fn spawn() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("termtune-input".into())
            .spawn(move || run_input_thread(tx, running_clone))?;

        Ok(Self {
            events: rx,
            running,
            handle: Some(handle),
        })
    }

    /// Receiving end of the event channel.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Ask the thread to stop and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Input thread panicked");
            }
        }
    }
}

impl Drop for InputListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_input_thread(tx: Sender<Event>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        match event::poll(INPUT_POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                error!("Failed to poll terminal input: {e}");
                break;
            }
        }
        match event::read() {
            Ok(event) => {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Failed to read terminal input: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_fires_after_interval_without_input() {
        let (_tx, rx) = mpsc::channel::<Event>();
        let mut ticker = Ticker::new(Duration::from_millis(20));
        let start = Instant::now();
        assert_eq!(ticker.next_event(&rx), Some(LoopEvent::Tick));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn queued_input_arrives_before_the_deadline() {
        let (tx, rx) = mpsc::channel();
        tx.send(Event::FocusGained).unwrap();
        let mut ticker = Ticker::new(Duration::from_secs(60));
        assert_eq!(
            ticker.next_event(&rx),
            Some(LoopEvent::Input(Event::FocusGained))
        );
    }

    #[test]
    fn overdue_tick_beats_queued_input() {
        let (tx, rx) = mpsc::channel();
        let mut ticker = Ticker::new(Duration::from_millis(200));
        std::thread::sleep(Duration::from_millis(250));
        tx.send(Event::FocusLost).unwrap();
        assert_eq!(ticker.next_event(&rx), Some(LoopEvent::Tick));
        assert_eq!(
            ticker.next_event(&rx),
            Some(LoopEvent::Input(Event::FocusLost))
        );
    }

    #[test]
    fn disconnected_input_ends_the_stream_of_events() {
        let (tx, rx) = mpsc::channel::<Event>();
        drop(tx);
        let mut ticker = Ticker::new(Duration::from_secs(60));
        assert_eq!(ticker.next_event(&rx), None);
    }

    #[test]
    fn advance_skips_missed_ticks() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        let late = Instant::now() + Duration::from_millis(100);
        ticker.advance(late);
        assert_eq!(ticker.remaining(late), Duration::from_millis(10));
    }
}
