//! Audit events emitted by a reconciliation run.
//!
//! The run never writes files itself; callers inject an [`EventSink`]
//! (a log file writer, a collector in tests, a closure).

use chrono::NaiveDateTime;

/// Audit status. The wire names are fixed; log consumers match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Started,
    Ok,
    Error,
    NotFound,
    Interrupted,
    Finished,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "INICIO",
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::NotFound => "NO_ENCONTRADO",
            Self::Interrupted => "INTERRUMPIDO",
            Self::Finished => "FIN",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who an event is about: the run as a whole, or one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    System,
    Series(String),
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => f.write_str("SISTEMA"),
            Self::Series(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunEvent {
    pub timestamp: NaiveDateTime,
    pub subject: Subject,
    pub status: RunStatus,
    pub message: String,
}

impl RunEvent {
    /// Event stamped with the local wall clock.
    pub fn now(subject: Subject, status: RunStatus, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().naive_local(),
            subject,
            status,
            message: message.into(),
        }
    }

    pub fn system(status: RunStatus, message: impl Into<String>) -> Self {
        Self::now(Subject::System, status, message)
    }

    pub fn series(id: &str, status: RunStatus, message: impl Into<String>) -> Self {
        Self::now(Subject::Series(id.to_string()), status, message)
    }
}

/// Receiver for run events.
pub trait EventSink {
    fn emit(&mut self, event: RunEvent);
}

impl<F: FnMut(RunEvent)> EventSink for F {
    fn emit(&mut self, event: RunEvent) {
        self(event)
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: RunEvent) {}
}

/// Simple event collector for testing and for callers that report later.
#[derive(Default)]
pub struct EventCollector {
    events: Vec<RunEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn statuses(&self) -> Vec<RunStatus> {
        self.events.iter().map(|e| e.status).collect()
    }

    /// Events about one identifier, in emission order.
    pub fn for_series(&self, id: &str) -> Vec<&RunEvent> {
        self.events
            .iter()
            .filter(|e| matches!(&e.subject, Subject::Series(s) if s == id))
            .collect()
    }
}

impl EventSink for EventCollector {
    fn emit(&mut self, event: RunEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let names: Vec<&str> = [
            RunStatus::Started,
            RunStatus::Ok,
            RunStatus::Error,
            RunStatus::NotFound,
            RunStatus::Interrupted,
            RunStatus::Finished,
        ]
        .iter()
        .map(RunStatus::as_str)
        .collect();
        assert_eq!(names, vec!["INICIO", "OK", "ERROR", "NO_ENCONTRADO", "INTERRUMPIDO", "FIN"]);
    }

    #[test]
    fn test_event_collector_filtering() {
        let mut collector = EventCollector::new();
        collector.emit(RunEvent::system(RunStatus::Started, "start"));
        collector.emit(RunEvent::series("100", RunStatus::Ok, "2 rows"));
        collector.emit(RunEvent::series("200", RunStatus::NotFound, ""));
        collector.emit(RunEvent::system(RunStatus::Finished, "done"));

        assert_eq!(collector.len(), 4);
        assert_eq!(collector.for_series("100").len(), 1);
        assert_eq!(collector.for_series("200")[0].status, RunStatus::NotFound);
        assert_eq!(collector.events()[0].subject.to_string(), "SISTEMA");
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |e: RunEvent| seen.push(e.status);
            sink.emit(RunEvent::system(RunStatus::Started, ""));
        }
        assert_eq!(seen, vec![RunStatus::Started]);
    }
}
