use crate::event::SnifferEvent;

/// Receives everything the pipeline decides to emit.
pub trait EventSink {
    fn emit(&mut self, event: SnifferEvent);
}

impl EventSink for Vec<SnifferEvent> {
    fn emit(&mut self, event: SnifferEvent) {
        self.push(event);
    }
}

impl<K: EventSink + ?Sized> EventSink for &mut K {
    fn emit(&mut self, event: SnifferEvent) {
        (**self).emit(event);
    }
}

impl<K: EventSink + ?Sized> EventSink for Box<K> {
    fn emit(&mut self, event: SnifferEvent) {
        (**self).emit(event);
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F: FnMut(SnifferEvent)> EventSink for FnSink<F> {
    fn emit(&mut self, event: SnifferEvent) {
        (self.0)(event);
    }
}

/// Drops every event. Useful when only statistics are wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: SnifferEvent) {}
}
