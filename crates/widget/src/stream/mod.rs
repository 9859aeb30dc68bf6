//! Consuming the chat event stream.

pub mod accumulator;
pub mod coordinator;
pub mod sse;

pub use accumulator::StreamAccumulator;
pub use coordinator::{
    RATE_LIMIT_MESSAGE, STREAM_ERROR_MESSAGE, StreamEventCoordinator, StreamOutcome,
};
pub use sse::SseDecoder;
