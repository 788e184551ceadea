//! Synchronous event fan-out.
//!
//! [`EventBus`] is itself an [`EventSink`]: every emitted event is handed
//! to each subscriber in subscription order before `emit` returns.

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for EventBus {
    fn emit(&mut self, event: &AppEvent) {
        for sink in &mut self.sinks {
            sink.emit(event);
        }
    }
}
