//! Output sinks for engine invocations.

/// Receiver for engine output during one [`run`](super::CodeEngine::run)
/// invocation.
///
/// Implementations must not block: emission happens on the transport task
/// while an operation is in flight.
pub trait OutputSink: Send {
    /// One chunk of normal engine output.
    fn emit_output(&mut self, text: &str);

    /// One chunk of engine diagnostic output.
    fn emit_error(&mut self, text: &str);
}

/// Sink that discards everything. Used for non-streaming invocations.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit_output(&mut self, _text: &str) {}

    fn emit_error(&mut self, _text: &str) {}
}

/// Sink that accumulates output in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    output: String,
    errors: String,
}

impl BufferSink {
    /// Empty buffer sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated normal output.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Accumulated diagnostic output.
    #[must_use]
    pub fn errors(&self) -> &str {
        &self.errors
    }
}

impl OutputSink for BufferSink {
    fn emit_output(&mut self, text: &str) {
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn emit_error(&mut self, text: &str) {
        self.errors.push_str(text);
        self.errors.push('\n');
    }
}
