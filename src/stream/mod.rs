//! The token pipeline: a queue from model to transport and the renderer
//! that turns queued fragments into well-formed output units.

mod renderer;
mod sink;

pub use renderer::{Output, RenderPhase, RenderState, StreamRenderer};
pub use sink::{Token, TokenSink};
