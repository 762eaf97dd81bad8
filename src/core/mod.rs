pub mod client;
pub mod mcp;
pub mod sse;
pub mod task;
