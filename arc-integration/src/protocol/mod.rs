/// Signed HTTP request plumbing shared by exchange REST clients.
pub mod http;

/// WebSocket connect/frame-parsing plumbing shared by exchange WebSocket clients.
pub mod websocket;
