use imageprov::remote::Reporter;
use parking_lot::Mutex;

/// Reporter that keeps every message in order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Whether any message contains `needle`.
    pub fn said(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn say(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
