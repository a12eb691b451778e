//! Event loop behaviour against a recording renderer.

use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use termtune::display::{Renderer, StatusView};
use termtune::event::{EventLoop, LoopEvent, LoopState, Outcome, Ticker};
use termtune::playback::{PlaybackController, SharedPipeline};
use termtune::stream::{DecodedStream, MemoryStream};
use termtune::streaming::AudioDevice;
use termtune::{PlayerConfig, SampleRate, SeekError};

#[derive(Default)]
struct NullDevice;

impl AudioDevice for NullDevice {
    fn play(&mut self, _pipeline: SharedPipeline) -> termtune::Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

#[derive(Default)]
struct Recorder {
    frames: Vec<StatusView>,
}

impl Renderer for Recorder {
    fn render(&mut self, view: &StatusView) {
        self.frames.push(*view);
    }
}

/// Stream whose every reposition fails.
struct Unseekable(MemoryStream);

impl DecodedStream for Unseekable {
    fn sample_rate(&self) -> SampleRate {
        self.0.sample_rate()
    }

    fn channels(&self) -> u16 {
        self.0.channels()
    }

    fn len(&self) -> u64 {
        self.0.len()
    }

    fn position(&self) -> u64 {
        self.0.position()
    }

    fn seek(&mut self, position: u64) -> Result<(), SeekError> {
        Err(SeekError::new(position, "not seekable"))
    }

    fn read_frames(&mut self, out: &mut [f32]) -> usize {
        self.0.read_frames(out)
    }
}

fn key(c: char) -> Event {
    Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn controller() -> PlaybackController<NullDevice> {
    PlaybackController::new(
        Box::new(MemoryStream::ramp(10_000, SampleRate::new(100))),
        NullDevice,
        &PlayerConfig::default(),
    )
}

#[test]
fn unmapped_key_changes_nothing_and_draws_nothing() {
    let c = controller();
    let mut event_loop = EventLoop::new(&c, Recorder::default());
    let outcome = event_loop.handle_input(&key('z'));
    assert_eq!(outcome, Outcome::NONE);
    assert_eq!(event_loop.state(), LoopState::Running);
    assert_eq!(event_loop.renders(), 0);
}

#[test]
fn quit_terminates_without_drawing() {
    let c = controller();
    let mut event_loop = EventLoop::new(&c, Recorder::default());
    assert_eq!(
        event_loop.step(LoopEvent::Input(Event::Key(KeyEvent::new(
            KeyCode::Esc,
            KeyModifiers::NONE
        )))),
        LoopState::Terminated
    );
    assert_eq!(event_loop.renders(), 0);

    // Later events are not processed.
    event_loop.step(LoopEvent::Tick);
    assert_eq!(event_loop.renders(), 0);
}

#[test]
fn state_change_draws_immediately() {
    let c = controller();
    let mut event_loop = EventLoop::new(&c, Recorder::default());
    let outcome = event_loop.handle_input(&key('a'));
    assert!(outcome.changed);

    let recorder = event_loop.into_renderer();
    assert_eq!(recorder.frames.len(), 1);
    assert_eq!(recorder.frames[0].volume_percent, 87);
}

#[test]
fn tick_always_draws() {
    let c = controller();
    let mut event_loop = EventLoop::new(&c, Recorder::default());
    event_loop.step(LoopEvent::Tick);
    event_loop.step(LoopEvent::Tick);
    assert_eq!(event_loop.renders(), 2);
}

#[test]
fn failed_seek_is_not_fatal() {
    let c = PlaybackController::new(
        Box::new(Unseekable(MemoryStream::ramp(10_000, SampleRate::new(100)))),
        NullDevice,
        &PlayerConfig::default(),
    );
    let mut event_loop = EventLoop::new(&c, Recorder::default());
    let outcome = event_loop.handle_input(&key('n'));
    assert_eq!(outcome, Outcome::NONE);
    assert_eq!(event_loop.state(), LoopState::Running);
    assert_eq!(event_loop.renders(), 0);

    assert!(event_loop.handle_input(&key('p')).changed);
    assert_eq!(event_loop.renders(), 1);
}

#[test]
fn run_processes_queued_input_in_order() {
    let c = controller();
    let (tx, rx) = mpsc::channel();
    for ch in ['a', 'a', 'p', 'n', 'q', 'd'] {
        tx.send(key(ch)).unwrap();
    }

    let mut event_loop = EventLoop::new(&c, Recorder::default());
    event_loop.run(&rx, Ticker::new(Duration::from_secs(60)));
    assert_eq!(event_loop.state(), LoopState::Terminated);

    let frames = event_loop.into_renderer().frames;
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].volume_percent, 87);
    assert_eq!(frames[1].volume_percent, 90);
    assert!(!frames[1].paused);
    assert!(frames[2].paused);
    assert_eq!(frames[3].elapsed_secs, 5);

    // The key queued after quit was never handled.
    let snap = c.snapshot();
    assert!((snap.volume - 0.8).abs() < 1e-9);
}

#[test]
fn closed_input_terminates_the_loop() {
    let c = controller();
    let (tx, rx) = mpsc::channel::<Event>();
    drop(tx);

    let mut event_loop = EventLoop::new(&c, Recorder::default());
    event_loop.run(&rx, Ticker::new(Duration::from_secs(60)));
    assert_eq!(event_loop.state(), LoopState::Terminated);
    assert_eq!(event_loop.renders(), 0);
}
