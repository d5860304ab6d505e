// Shared fixtures for unit tests

use crate::activation::WindowHandle;
use crate::error::instance::InstanceError;
use crate::transport::RendezvousListener;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Restored,
    Activated,
    Topmost(bool),
}

/// In-memory window that records every call made on it.
#[derive(Default)]
pub struct RecordingWindow {
    minimized: AtomicBool,
    topmost: AtomicBool,
    events: Mutex<Vec<WindowEvent>>,
}

impl RecordingWindow {
    pub fn minimized() -> Self {
        let window = Self::default();
        window.minimized.store(true, Ordering::SeqCst);
        window
    }

    pub fn pinned() -> Self {
        let window = Self::default();
        window.topmost.store(true, Ordering::SeqCst);
        window
    }

    pub fn events(&self) -> Vec<WindowEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: WindowEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl WindowHandle for RecordingWindow {
    fn is_minimized(&self) -> bool {
        self.minimized.load(Ordering::SeqCst)
    }

    fn restore(&self) {
        self.minimized.store(false, Ordering::SeqCst);
        self.record(WindowEvent::Restored);
    }

    fn activate(&self) {
        self.record(WindowEvent::Activated);
    }

    fn is_topmost(&self) -> bool {
        self.topmost.load(Ordering::SeqCst)
    }

    fn set_topmost(&self, topmost: bool) {
        self.topmost.store(topmost, Ordering::SeqCst);
        self.record(WindowEvent::Topmost(topmost));
    }
}

/// Listener that replays a fixed sequence of accept results, then waits forever.
pub struct ScriptedListener {
    script: VecDeque<Result<Option<String>, InstanceError>>,
}

impl ScriptedListener {
    pub fn new(script: Vec<Result<Option<String>, InstanceError>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl RendezvousListener for ScriptedListener {
    async fn accept_line(&mut self) -> Result<Option<String>, InstanceError> {
        match self.script.pop_front() {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

pub fn line(text: &str) -> Result<Option<String>, InstanceError> {
    Ok(Some(text.to_string()))
}

pub fn protocol_fault() -> Result<Option<String>, InstanceError> {
    Err(InstanceError::Protocol {
        message: String::from("scripted fault"),
        location: common::ErrorLocation::caller(),
    })
}
