/// What the relay connection reports to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// Connection established; the orchestrator answers with `join`.
    Opened,
    /// A raw text frame from the relay, not yet parsed.
    Message(String),
    /// The relay connection is gone. No reconnect is attempted.
    Closed,
}
