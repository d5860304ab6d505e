//! Headless main window.
//!
//! Stands in for the GUI toolkit's top-level window: it keeps the window
//! state the activation sequence reads and writes, and logs every change.

use instance_core::WindowHandle;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{debug, info};

pub struct MainWindow {
    title: String,
    minimized: AtomicBool,
    topmost: AtomicBool,
    activations: AtomicUsize,
}

impl MainWindow {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            minimized: AtomicBool::new(false),
            topmost: AtomicBool::new(false),
            activations: AtomicUsize::new(0),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn minimize(&self) {
        debug!("Window '{}' minimized", self.title);
        self.minimized.store(true, Ordering::SeqCst);
    }

    /// How many times the window was brought to the foreground.
    pub fn activation_count(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }
}

impl WindowHandle for MainWindow {
    fn is_minimized(&self) -> bool {
        self.minimized.load(Ordering::SeqCst)
    }

    fn restore(&self) {
        debug!("Window '{}' restored", self.title);
        self.minimized.store(false, Ordering::SeqCst);
    }

    fn activate(&self) {
        let count = self.activations.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Window '{}' brought to front (activation #{count})", self.title);
    }

    fn is_topmost(&self) -> bool {
        self.topmost.load(Ordering::SeqCst)
    }

    fn set_topmost(&self, topmost: bool) {
        debug!("Window '{}' topmost={topmost}", self.title);
        self.topmost.store(topmost, Ordering::SeqCst);
    }
}
