//! Progressive rendering of a streamed rewrite.
//!
//! Every fragment re-renders the whole accumulated buffer instead of
//! appending, so a write the host dropped is repaired by the next one.

use tracing::{debug, warn};

use super::{CommitStrategy, InjectionEngine, editable_kind, order_for, restore, verify};
use crate::error::EngineError;
use crate::page::{BoundingBox, ElementId, Layer, LayerId, LayerKind, PageTree};

const CURSOR_WIDTH: f64 = 2.0;
const CURSOR_HEIGHT: f64 = 16.0;

#[derive(Debug, Clone)]
pub struct StreamingSession {
    pub id: u64,
    pub editable: ElementId,
    pub buffer: String,
    pub cursor_visible: bool,
    pub retries: u32,
    pub max_retries: u32,
    /// Draft present before the stream started.
    pub original: String,
    cursor_layer: Option<LayerId>,
    order: Vec<CommitStrategy>,
    strategy_index: usize,
    last_verified: bool,
}

impl StreamingSession {
    pub fn cursor_layer(&self) -> Option<LayerId> {
        self.cursor_layer
    }

    pub fn strategy(&self) -> Option<CommitStrategy> {
        self.order.get(self.strategy_index).copied()
    }
}

impl InjectionEngine {
    /// Clear the element and show the streaming cursor.
    pub fn begin_stream<P: PageTree + ?Sized>(
        &self,
        page: &mut P,
        id: u64,
        editable: ElementId,
        preferred: &[CommitStrategy],
    ) -> Result<StreamingSession, EngineError> {
        let kind = editable_kind(page, editable)?;
        let original = page.read_text(editable).unwrap_or_default();

        let mut session = StreamingSession {
            id,
            editable,
            buffer: String::new(),
            cursor_visible: true,
            retries: 0,
            max_retries: self.max_stream_retries,
            original,
            cursor_layer: None,
            order: order_for(kind, preferred),
            strategy_index: 0,
            last_verified: false,
        };

        self.render(page, &mut session)?;
        session.cursor_layer = Some(page.mount_layer(cursor_layer(page, editable, true)));
        debug!("Streaming session {} started on {}", id, editable);
        Ok(session)
    }

    /// Append a fragment and re-render the full buffer.
    pub fn push_chunk<P: PageTree + ?Sized>(
        &self,
        page: &mut P,
        session: &mut StreamingSession,
        chunk: &str,
    ) -> Result<(), EngineError> {
        session.buffer.push_str(chunk);
        self.render(page, session)?;
        page.scroll_to_end(session.editable)?;
        self.sync_cursor(page, session);
        Ok(())
    }

    /// Final render, cursor removal and a short emphasis layer.
    pub fn finish_stream<P: PageTree + ?Sized>(
        &self,
        page: &mut P,
        session: &mut StreamingSession,
    ) -> Result<LayerId, EngineError> {
        if !session.last_verified {
            self.render(page, session)?;
        }
        self.cancel_stream(page, session);

        let bbox = page
            .info(session.editable)
            .map(|i| i.bbox)
            .unwrap_or_default();
        debug!("Streaming session {} finished ({} chars)", session.id, session.buffer.len());
        Ok(page.mount_layer(Layer::new(LayerKind::Emphasis, bbox)))
    }

    /// Stop on error and put the original draft back.
    pub fn fail_stream<P: PageTree + ?Sized>(&self, page: &mut P, session: &mut StreamingSession) {
        self.cancel_stream(page, session);
        restore(page, session.editable, &session.original, &session.order);
    }

    /// Stop without touching the text written so far.
    pub fn cancel_stream<P: PageTree + ?Sized>(&self, page: &mut P, session: &mut StreamingSession) {
        if let Some(layer) = session.cursor_layer.take() {
            page.remove_layer(layer);
        }
        session.cursor_visible = false;
    }

    pub fn blink<P: PageTree + ?Sized>(&self, page: &mut P, session: &mut StreamingSession) {
        if session.cursor_layer.is_none() {
            return;
        }
        session.cursor_visible = !session.cursor_visible;
        self.sync_cursor(page, session);
    }

    /// Write the whole buffer, moving down the strategy order on failure
    /// until the retry budget runs out.
    fn render<P: PageTree + ?Sized>(
        &self,
        page: &mut P,
        session: &mut StreamingSession,
    ) -> Result<(), EngineError> {
        loop {
            let Some(strategy) = session.strategy() else {
                return Err(EngineError::InjectionFailure {
                    attempts: session.retries as usize,
                    message: "no applicable strategy".to_string(),
                });
            };

            let applied = strategy.apply(page, session.editable, &session.buffer);
            if applied.is_ok() && verify(page, session.editable, &session.buffer) {
                session.last_verified = true;
                return Ok(());
            }

            session.last_verified = false;
            session.retries += 1;
            if session.retries > session.max_retries || !page.is_connected(session.editable) {
                warn!(
                    "Streaming render into {} failed after {} retries",
                    session.editable, session.retries
                );
                return Err(EngineError::InjectionFailure {
                    attempts: session.retries as usize,
                    message: format!("streaming render via {strategy} did not verify"),
                });
            }
            if session.strategy_index + 1 < session.order.len() {
                session.strategy_index += 1;
            }
        }
    }

    fn sync_cursor<P: PageTree + ?Sized>(&self, page: &mut P, session: &StreamingSession) {
        if let Some(layer) = session.cursor_layer {
            let updated = cursor_layer(page, session.editable, session.cursor_visible);
            if let Err(e) = page.update_layer(layer, updated) {
                warn!("Failed to update streaming cursor: {}", e);
            }
        }
    }
}

/// Cursor drawn at the bottom-right inside the editable.
fn cursor_layer<P: PageTree + ?Sized>(page: &P, editable: ElementId, visible: bool) -> Layer {
    let bbox = page.info(editable).map(|i| i.bbox).unwrap_or_default();
    let cursor = BoundingBox::new(
        bbox.right() - CURSOR_WIDTH * 4.0,
        bbox.bottom() - CURSOR_HEIGHT - 4.0,
        CURSOR_WIDTH,
        CURSOR_HEIGHT,
    );
    let layer = Layer::new(LayerKind::Cursor, cursor);
    if visible { layer } else { layer.hidden() }
}
