//! Run event stream types.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::types::{RunResult, ToolCallRecord};
use crate::error::RociError;
use crate::types::{AgentToolCall, ModelMessage};

/// Events emitted by [`Runner::run_streamed`](super::Runner::run_streamed).
///
/// The stream always ends with exactly one `Completed` or `Failed`.
#[derive(Debug)]
pub enum RunStreamEvent {
    /// An agent became the active agent.
    AgentUpdated { agent: String },
    TurnStarted { agent: String, turn: usize },
    TextDelta { agent: String, text: String },
    ToolStarted { agent: String, call: AgentToolCall },
    ToolEnded { agent: String, record: ToolCallRecord },
    Handoff { from: String, to: String },
    /// An item was added to the run history.
    MessageAppended { message: ModelMessage },
    Completed(Box<RunResult>),
    Failed(RociError),
}

impl RunStreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// Optional event channel threaded through a run.
#[derive(Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::UnboundedSender<RunStreamEvent>>,
}

impl EventSink {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<RunStreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub(crate) fn is_streaming(&self) -> bool {
        self.tx.is_some()
    }

    /// Deliver `event`; a dropped receiver is ignored.
    pub(crate) fn emit(&self, event: RunStreamEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Stream of events for one streamed run.
///
/// Dropping the stream cancels the run. `cancel` is a child of the caller's
/// token, so the caller's token is left alone.
pub struct RunStream {
    inner: UnboundedReceiverStream<RunStreamEvent>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl RunStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<RunStreamEvent>, cancel: CancellationToken) -> Self {
        Self {
            inner: UnboundedReceiverStream::new(rx),
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
        }
    }

    /// Cancel the underlying run; the stream then ends with `Failed(Canceled)`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drain the stream and return the terminal outcome.
    pub async fn into_result(mut self) -> Result<RunResult, RociError> {
        use futures::StreamExt;
        while let Some(event) = self.next().await {
            match event {
                RunStreamEvent::Completed(result) => return Ok(*result),
                RunStreamEvent::Failed(err) => return Err(err),
                _ => {}
            }
        }
        Err(RociError::Stream("run ended without a terminal event".into()))
    }
}

impl Stream for RunStream {
    type Item = RunStreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
