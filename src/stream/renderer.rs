//! Incremental markdown renderer for streamed model output.
//!
//! Models stream fenced code blocks as many small fragments: the opening
//! fence, the language tag, the body and the closing fence usually arrive
//! separately. Printing each fragment as markdown would produce half-open
//! code blocks, so the renderer passes prose through immediately but holds
//! code back until its fence closes and then emits the whole block as one
//! unit.

use super::sink::Token;

const FENCE: &str = "```";

/// A transport-ready unit produced by [`StreamRenderer::consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// A response is starting.
    TurnStart,
    /// Prose that can be written as-is.
    Plain(String),
    /// A complete markdown unit (a closed code block, or a whole
    /// non-streamed response).
    Markdown(String),
    /// The turn failed.
    Error(String),
    /// The response is complete.
    TurnEnd,
}

impl Output {
    /// The visible text carried by this unit, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Plain(text) | Self::Markdown(text) | Self::Error(text) => Some(text),
            Self::TurnStart | Self::TurnEnd => None,
        }
    }
}

/// Where the renderer is in relation to a code fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPhase {
    #[default]
    Plain,
    /// An opening fence was seen but no content has followed yet.
    FencePending,
    Code,
}

/// Mutable renderer state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderState {
    pub phase: RenderPhase,
    /// The raw opening marker while a fence is being assembled.
    pub pending_fence: String,
    /// The code block collected so far, starting with its opening fence.
    pub buffered_block: String,
}

impl RenderState {
    pub fn in_code_block(&self) -> bool {
        self.phase != RenderPhase::Plain
    }
}

/// Turns a stream of [`Token`]s into [`Output`] units.
#[derive(Debug, Clone)]
pub struct StreamRenderer {
    streaming: bool,
    state: RenderState,
}

impl StreamRenderer {
    /// Creates a renderer.
    ///
    /// When `streaming` is `false` the model delivers whole responses, and
    /// each fragment is emitted as a single markdown unit.
    pub fn new(streaming: bool) -> Self {
        Self {
            streaming,
            state: RenderState::default(),
        }
    }

    pub const fn state(&self) -> &RenderState {
        &self.state
    }

    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Feeds one token and returns the units it completes.
    pub fn consume(&mut self, token: Token) -> Vec<Output> {
        match token {
            Token::Start => {
                self.state = RenderState::default();
                vec![Output::TurnStart]
            }
            Token::Text(fragment) if !self.streaming => {
                if fragment.is_empty() {
                    Vec::new()
                } else {
                    vec![Output::Markdown(fragment)]
                }
            }
            Token::Text(fragment) => self.consume_fragment(fragment).into_iter().collect(),
            Token::Error(message) => {
                let mut out: Vec<Output> = self.flush_unclosed().into_iter().collect();
                out.push(Output::Error(message));
                out
            }
            Token::End => {
                let mut out: Vec<Output> = self.flush_unclosed().into_iter().collect();
                out.push(Output::TurnEnd);
                out
            }
        }
    }

    fn consume_fragment(&mut self, fragment: String) -> Option<Output> {
        match self.state.phase {
            RenderPhase::Plain => {
                if is_fence_marker(&fragment) {
                    self.state.phase = RenderPhase::FencePending;
                    self.state.buffered_block = FENCE.to_string();
                    self.state.pending_fence = fragment;
                    return None;
                }
                if fragment == "\n\n" || fragment.is_empty() {
                    return None;
                }
                if fragment == "`\n" || fragment == "`\n\n" {
                    return Some(Output::Plain("\n".to_string()));
                }
                Some(Output::Plain(fragment))
            }
            RenderPhase::FencePending => {
                if is_fence_marker(&fragment) {
                    return Some(self.close_block());
                }
                // A two-backtick marker followed by "`lang" is a split triple fence.
                let content = if self.state.pending_fence.len() == 2 {
                    fragment.strip_prefix('`').unwrap_or(&fragment)
                } else {
                    &fragment
                };
                self.state.buffered_block.push_str(content);
                self.state.pending_fence.clear();
                self.state.phase = RenderPhase::Code;
                None
            }
            RenderPhase::Code => {
                if is_fence_marker(&fragment) {
                    return Some(self.close_block());
                }
                self.state.buffered_block.push_str(&fragment);
                None
            }
        }
    }

    fn close_block(&mut self) -> Output {
        let mut block = std::mem::take(&mut self.state.buffered_block);
        if block != FENCE && !block.ends_with('\n') {
            block.push('\n');
        }
        block.push_str(FENCE);
        self.state = RenderState::default();
        Output::Markdown(block)
    }

    /// Emits a still-open code block as plain text so nothing is lost.
    fn flush_unclosed(&mut self) -> Option<Output> {
        if !self.state.in_code_block() {
            return None;
        }
        let buffered = std::mem::take(&mut self.state.buffered_block);
        tracing::warn!(
            buffered_len = buffered.len(),
            "stream corruption: response ended inside a code block, flushing as plain text"
        );
        self.state = RenderState::default();
        Some(Output::Plain(buffered))
    }
}

fn is_fence_marker(fragment: &str) -> bool {
    fragment == "``" || fragment == FENCE
}
