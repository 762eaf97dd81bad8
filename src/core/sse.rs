//! Event-Stream Monitor
//!
//! Information Hiding:
//! - Byte accumulation and event framing hidden in `EventStreamParser`
//! - Status classification and resolution hidden in `TaskMonitor`
//! - Transport independent: any `Stream` of byte chunks can drive a monitor

use crate::core::task::{TaskStatus, TaskStatusRecord};
use crate::error::{BridgeError, Result};
use futures::{Stream, StreamExt};
use std::fmt;

pub const DATA_PREFIX: &str = "data:";
pub const EVENT_SEPARATOR: &[u8] = b"\n\n";

/// One complete event reassembled from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub data: String,
}

/// Incremental parser for blank-line-delimited events.
///
/// Bytes are kept undecoded until an event is complete, so multi-byte
/// characters split across reads survive intact.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buffer: Vec<u8>,
    // Bytes before this offset are known not to start a separator.
    scanned: usize,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event it completes, in order.
    /// A trailing partial event stays buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        let mut from = self.scanned;
        while let Some(pos) = find_separator(&self.buffer[from..]) {
            let end = from + pos;
            if let Some(event) = parse_block(&self.buffer[consumed..end]) {
                events.push(event);
            }
            consumed = end + EVENT_SEPARATOR.len();
            from = consumed;
        }
        self.buffer.drain(..consumed);
        self.scanned = self
            .buffer
            .len()
            .saturating_sub(EVENT_SEPARATOR.len() - 1);
        events
    }

    /// Flush at end of stream. Whatever is still buffered never saw its
    /// closing blank line, so it is dropped rather than dispatched.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let residue = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        if !residue.iter().all(u8::is_ascii_whitespace) {
            tracing::warn!(
                "Discarding incomplete trailing event ({} bytes)",
                residue.len()
            );
        }
        Vec::new()
    }

    pub fn residue(&self) -> &[u8] {
        &self.buffer
    }
}

fn find_separator(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(EVENT_SEPARATOR.len())
        .position(|window| window == EVENT_SEPARATOR)
}

fn parse_block(block: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(block);
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.trim_end_matches('\r').strip_prefix(DATA_PREFIX))
        .map(str::trim)
        .collect();

    if data.is_empty() {
        None
    } else {
        Some(SseEvent {
            data: data.join("\n"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    AwaitingData,
    EventReady,
    ResolvedSuccess,
    ResolvedFailure,
    ResolvedTimeout,
}

impl MonitorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MonitorState::ResolvedSuccess
                | MonitorState::ResolvedFailure
                | MonitorState::ResolvedTimeout
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Success(TaskStatusRecord),
    Failure(TaskStatusRecord),
    Timeout,
}

/// Drives one task to a terminal outcome from its status event stream
#[derive(Debug)]
pub struct TaskMonitor {
    task_id: String,
    parser: EventStreamParser,
    state: MonitorState,
}

impl TaskMonitor {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            parser: EventStreamParser::new(),
            state: MonitorState::AwaitingData,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Feed one read. Returns the resolution once a terminal event arrives;
    /// chunks fed after that are ignored.
    pub fn on_chunk(&mut self, chunk: &[u8]) -> Option<Resolution> {
        if self.state.is_terminal() {
            return None;
        }
        let events = self.parser.feed(chunk);
        self.process(events)
    }

    /// The stream ended. Anything short of a terminal event is a timeout.
    pub fn on_end(&mut self) -> Resolution {
        let events = self.parser.finish();
        match self.process(events) {
            Some(resolution) => resolution,
            None => {
                tracing::warn!(task_id = %self.task_id, "Stream ended without a terminal status");
                self.state = MonitorState::ResolvedTimeout;
                Resolution::Timeout
            }
        }
    }

    fn process(&mut self, events: Vec<SseEvent>) -> Option<Resolution> {
        if !events.is_empty() {
            self.state = MonitorState::EventReady;
        }

        for event in events {
            tracing::debug!(task_id = %self.task_id, "SSE event received: {}", event.data);

            let record = match serde_json::from_str::<TaskStatusRecord>(&event.data) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(task_id = %self.task_id, "Failed to parse SSE data: {}", e);
                    continue;
                }
            };

            tracing::info!(task_id = %self.task_id, status = ?record.status, "Task status update");
            match record.status {
                TaskStatus::Finished => {
                    self.state = MonitorState::ResolvedSuccess;
                    return Some(Resolution::Success(record));
                }
                TaskStatus::Failed => {
                    self.state = MonitorState::ResolvedFailure;
                    return Some(Resolution::Failure(record));
                }
                TaskStatus::Waiting | TaskStatus::Processing => {}
            }
        }

        self.state = MonitorState::AwaitingData;
        None
    }

    /// Consume `stream` until the task resolves. The stream is dropped as soon
    /// as a terminal event is seen, which cancels the in-flight read.
    pub async fn run<S, B, E>(mut self, stream: S) -> Result<TaskStatusRecord>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let mut stream = Box::pin(stream);
        let resolution = loop {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    if let Some(resolution) = self.on_chunk(chunk.as_ref()) {
                        break resolution;
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(task_id = %self.task_id, "SSE stream read failed: {}", e);
                    return Err(BridgeError::StreamConnection {
                        status: None,
                        body: format!("stream interrupted: {}", e),
                    });
                }
                None => break self.on_end(),
            }
        };
        drop(stream);

        match resolution {
            Resolution::Success(record) => {
                tracing::info!(task_id = %self.task_id, "Task finished");
                Ok(record)
            }
            Resolution::Failure(_) => Err(BridgeError::TaskFailed),
            Resolution::Timeout => Err(BridgeError::TaskTimeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;
    use std::sync::Arc;

    const TRANSCRIPT: &str = "data: {\"status\":\"WAITING\"}\n\n\
        data: {\"status\":\"PROCESSING\"}\n\n\
        : keep-alive\n\n\
        data: {\"taskId\":\"t1\",\"status\":\"FINISHED\",\"imageUrl\":\"https://x/y.png\"}\n\n";

    fn chunks(parts: &[&str]) -> Vec<std::result::Result<Vec<u8>, Infallible>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    #[test]
    fn test_parser_extracts_complete_events() {
        let mut parser = EventStreamParser::new();
        let events = parser.feed(TRANSCRIPT.as_bytes());

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].data, r#"{"status":"WAITING"}"#);
        assert!(parser.residue().is_empty());
    }

    #[test]
    fn test_parser_is_split_invariant() {
        let mut whole = EventStreamParser::new();
        let expected = whole.feed(TRANSCRIPT.as_bytes());
        let bytes = TRANSCRIPT.as_bytes();

        for size in 1..=bytes.len() {
            let mut parser = EventStreamParser::new();
            let mut events = Vec::new();
            for piece in bytes.chunks(size) {
                events.extend(parser.feed(piece));
            }
            events.extend(parser.finish());
            assert_eq!(events, expected, "chunk size {}", size);
        }
    }

    #[test]
    fn test_parser_holds_partial_event() {
        let mut parser = EventStreamParser::new();
        assert!(parser.feed(b"data: {\"status\":\"FINI").is_empty());
        assert!(parser.feed(b"SHED\"}\n").is_empty());

        let events = parser.feed(b"\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, r#"{"status":"FINISHED"}"#);
    }

    #[test]
    fn test_parser_keeps_split_multibyte_characters() {
        let text = "data: {\"note\":\"caf\u{e9}\"}\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut parser = EventStreamParser::new();
        assert!(parser.feed(&text[..split]).is_empty());
        let events = parser.feed(&text[split..]);
        assert_eq!(events[0].data, "{\"note\":\"caf\u{e9}\"}");
    }

    #[test]
    fn test_finish_drops_unterminated_fragment() {
        let mut parser = EventStreamParser::new();
        parser.feed(b"data: {\"status\":\"FINISHED\"}");
        assert!(parser.finish().is_empty());

        let mut parser = EventStreamParser::new();
        parser.feed(b"data: {\"status\":\"FINISHED\"}\n");
        assert!(parser.finish().is_empty());
        assert!(parser.residue().is_empty());
    }

    #[test]
    fn test_parser_resumes_scan_near_buffer_end() {
        let mut parser = EventStreamParser::new();
        for byte in b"data: {\"status\":\"WAITING\"}\n" {
            assert!(parser.feed(std::slice::from_ref(byte)).is_empty());
            assert_eq!(parser.scanned, parser.residue().len() - 1);
        }

        let events = parser.feed(b"\ndata: {\"status\"");
        assert_eq!(events.len(), 1);
        assert_eq!(parser.residue(), b"data: {\"status\"");
        assert_eq!(parser.scanned, parser.residue().len() - 1);
    }

    #[test]
    fn test_only_data_line_is_significant() {
        let mut parser = EventStreamParser::new();
        let events = parser.feed(b"event: status\nid: 7\ndata:   {\"status\":\"WAITING\"}  \r\n\n");
        assert_eq!(events[0].data, r#"{"status":"WAITING"}"#);
    }

    #[test]
    fn test_monitor_state_transitions() {
        let mut monitor = TaskMonitor::new("t1");
        assert_eq!(monitor.state(), MonitorState::AwaitingData);

        assert!(monitor.on_chunk(b"data: {\"status\":\"PROCESSING\"}\n\n").is_none());
        assert_eq!(monitor.state(), MonitorState::AwaitingData);

        let resolution = monitor
            .on_chunk(b"data: {\"status\":\"FAILED\"}\n\ndata: {\"status\":\"FINISHED\"}\n\n")
            .unwrap();
        assert!(matches!(resolution, Resolution::Failure(_)));
        assert_eq!(monitor.state(), MonitorState::ResolvedFailure);

        assert!(monitor.on_chunk(b"data: {\"status\":\"FINISHED\"}\n\n").is_none());
    }

    #[test]
    fn test_monitor_skips_malformed_events() {
        let mut monitor = TaskMonitor::new("t1");
        assert!(monitor.on_chunk(b"data: {not json}\n\n").is_none());

        let resolution = monitor
            .on_chunk(b"data: {\"status\":\"FINISHED\",\"imageUrl\":\"https://x/y.png\"}\n\n")
            .unwrap();
        match resolution {
            Resolution::Success(record) => {
                assert_eq!(record.result_url.as_deref(), Some("https://x/y.png"))
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_monitor_accepts_null_task_id_in_event() {
        let mut monitor = TaskMonitor::new("t1");
        let resolution = monitor
            .on_chunk(b"data: {\"taskId\":null,\"status\":\"FINISHED\",\"imageUrl\":\"https://x/y.png\"}\n\n")
            .unwrap();
        assert!(matches!(resolution, Resolution::Success(_)));
    }

    #[test]
    fn test_monitor_times_out_without_terminal_event() {
        let mut monitor = TaskMonitor::new("t1");
        monitor.on_chunk(b"data: {\"status\":\"WAITING\"}\n\ndata: garbage\n\n");
        assert_eq!(monitor.on_end(), Resolution::Timeout);
        assert_eq!(monitor.state(), MonitorState::ResolvedTimeout);
    }

    #[tokio::test]
    async fn test_run_resolves_success_across_fragmented_reads() {
        let parts = chunks(&[
            "data: {\"status\":\"PROC",
            "ESSING\"}\n",
            "\ndata: {\"status\":\"FINISHED\",\"imageUrl\":\"https://x/y.png\",\"mimeType\":\"image/png\"}",
            "\n\n",
        ]);

        let record = TaskMonitor::new("t1").run(stream::iter(parts)).await.unwrap();
        assert_eq!(record.mime_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_run_cancels_and_releases_stream_on_terminal_event() {
        let guard = Arc::new(());
        let held = guard.clone();

        // The peer never closes this stream; resolution must not wait for it.
        let source = stream::iter(chunks(&["data: {\"status\":\"FAILED\"}\n\n"]))
            .chain(stream::pending())
            .map(move |chunk| {
                let _ = Arc::strong_count(&held);
                chunk
            });

        let result = TaskMonitor::new("t2").run(source).await;
        assert!(matches!(result, Err(BridgeError::TaskFailed)));
        assert_eq!(Arc::strong_count(&guard), 1);
    }

    #[tokio::test]
    async fn test_run_reports_timeout_when_stream_ends() {
        let parts = chunks(&["data: {\"status\":\"WAITING\"}\n\n", "data: {\"status\":\"PROC"]);
        let result = TaskMonitor::new("t3").run(stream::iter(parts)).await;
        assert!(matches!(result, Err(BridgeError::TaskTimeout)));
    }

    #[tokio::test]
    async fn test_run_ignores_finished_event_missing_blank_line() {
        let parts = chunks(&[
            "data: {\"status\":\"PROCESSING\"}\n\n",
            "data: {\"status\":\"FINISHED\",\"imageUrl\":\"https://x/y.png\"}\n",
        ]);
        let result = TaskMonitor::new("t5").run(stream::iter(parts)).await;
        assert!(matches!(result, Err(BridgeError::TaskTimeout)));
    }

    #[tokio::test]
    async fn test_run_surfaces_read_errors() {
        let parts: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"status\":\"WAITING\"}\n\n".to_vec()),
            Err("connection reset".to_string()),
        ];
        let result = TaskMonitor::new("t4").run(stream::iter(parts)).await;
        assert!(matches!(result, Err(BridgeError::StreamConnection { .. })));
    }
}
