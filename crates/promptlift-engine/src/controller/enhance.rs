//! Enhancement flows: immediate and streamed.
//!
//! Each accepted trigger takes a new request number and makes it the
//! session's current request. A result is applied only while its request is
//! still current, so the most recent trigger always wins.

use std::sync::atomic::Ordering;

use futures::StreamExt;
use promptlift_bridge::{RewriteRequest, StreamMessage};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use super::{PageController, resolve_and_attach};
use crate::error::EngineError;
use crate::injection::{CommitStrategy, InjectionMode, InjectionRequest};
use crate::intent::IntentHint;
use crate::notice::NoticeKind;
use crate::page::{BoundingBox, PageTree};
use crate::session::{ControlState, EngineSession};

#[derive(Debug, Clone, PartialEq)]
pub enum EnhanceOutcome {
    /// The rewrite was written into the page.
    Applied {
        text: String,
        strategy: Option<CommitStrategy>,
    },
    /// Duplicate trigger within the dedup window; nothing was sent.
    Suppressed,
    /// A newer request took over; this result was discarded.
    Superseded,
}

impl<P: PageTree> PageController<P> {
    /// Rewrite the draft (or `text`) and replace the input's content.
    pub async fn enhance(&self, text: Option<&str>) -> Result<EnhanceOutcome, EngineError> {
        let Some((request, rewrite)) = self.begin_request(text, InjectionMode::Immediate)? else {
            return Ok(EnhanceOutcome::Suppressed);
        };

        let limit = self.config.remote_timeout();
        let result = timeout(limit, self.bridge.rewrite(rewrite)).await;

        let mut session = self.session.lock();
        let mut page = self.page.lock();
        let s = &mut *session;
        if !s.is_current(request.generation) {
            debug!("Discarding superseded result for {}", request.id);
            return Ok(EnhanceOutcome::Superseded);
        }
        s.state = ControlState::Idle;
        s.current_request = 0;

        let near = s.overlay.control().bbox();
        let enhanced = match result {
            Err(_) => {
                warn!("Rewrite {} timed out after {:?}", request.id, limit);
                s.notices.show(&mut *page, NoticeKind::HighLoad, near, Instant::now());
                return Err(EngineError::RemoteTimeout(limit));
            }
            Ok(Err(e)) => {
                warn!("Rewrite {} failed: {}", request.id, e);
                s.notices.show(&mut *page, NoticeKind::Error(e.to_string()), near, Instant::now());
                return Err(EngineError::RemoteError(e.to_string()));
            }
            Ok(Ok(enhanced)) => enhanced,
        };

        let preferred = preferred_order(s);
        match self
            .engine
            .inject_immediate(&mut *page, request.target, &enhanced, &preferred)
        {
            Ok(report) => {
                info!("Applied rewrite {} via {}", request.id, report.strategy);
                Ok(EnhanceOutcome::Applied {
                    text: enhanced,
                    strategy: Some(report.strategy),
                })
            }
            Err(e) => {
                s.resolver.invalidate();
                s.notices.show(&mut *page, NoticeKind::InjectionFailed, near, Instant::now());
                Err(e)
            }
        }
    }

    /// Rewrite with progressive rendering of the streamed result.
    ///
    /// The remote timeout bounds opening the stream and each wait for a
    /// message. `stream_deadline` bounds the whole stream, so a reply that
    /// keeps trickling in still ends.
    pub async fn enhance_streaming(&self, text: Option<&str>) -> Result<EnhanceOutcome, EngineError> {
        let Some((request, rewrite)) = self.begin_request(text, InjectionMode::Streaming)? else {
            return Ok(EnhanceOutcome::Suppressed);
        };
        let generation = request.generation;
        let limit = self.config.remote_timeout();
        let deadline = Instant::now() + self.config.stream_deadline();

        let opened = timeout(limit, self.bridge.rewrite_stream(rewrite)).await;
        let mut stream = {
            let mut session = self.session.lock();
            let mut page = self.page.lock();
            let s = &mut *session;
            if !s.is_current(generation) {
                return Ok(EnhanceOutcome::Superseded);
            }
            let near = s.overlay.control().bbox();
            let stream = match opened {
                Err(_) => {
                    self.settle_failure(s, &mut *page, NoticeKind::HighLoad);
                    return Err(EngineError::RemoteTimeout(limit));
                }
                Ok(Err(e)) => {
                    self.settle_failure(s, &mut *page, NoticeKind::Error(e.to_string()));
                    return Err(EngineError::RemoteError(e.to_string()));
                }
                Ok(Ok(stream)) => stream,
            };

            let preferred = preferred_order(s);
            match self
                .engine
                .begin_stream(&mut *page, generation, request.target, &preferred)
            {
                Ok(streaming) => {
                    s.streaming = Some(streaming);
                    s.state = ControlState::Streaming;
                    s.last_blink = Some(Instant::now());
                }
                Err(e) => {
                    s.resolver.invalidate();
                    s.notices.show(&mut *page, NoticeKind::InjectionFailed, near, Instant::now());
                    s.state = ControlState::Idle;
                    s.current_request = 0;
                    return Err(e);
                }
            }
            stream
        };
        info!("Streaming rewrite {} started", request.id);

        loop {
            let wait_until = (Instant::now() + limit).min(deadline);
            let next = timeout_at(wait_until, stream.next()).await;

            let mut session = self.session.lock();
            let mut page = self.page.lock();
            let s = &mut *session;
            let active = s
                .streaming
                .as_ref()
                .is_some_and(|st| st.id == generation)
                && s.is_current(generation);
            if !active {
                debug!("Streaming rewrite {} was superseded", request.id);
                return Ok(EnhanceOutcome::Superseded);
            }

            let message = match next {
                Err(_) if Instant::now() >= deadline => {
                    let total = self.config.stream_deadline();
                    warn!("Streaming rewrite {} still running after {:?}", request.id, total);
                    self.abort_stream(s, &mut *page, NoticeKind::HighLoad);
                    return Err(EngineError::RemoteTimeout(total));
                }
                Err(_) => {
                    warn!("Streaming rewrite {} stalled for {:?}", request.id, limit);
                    self.abort_stream(s, &mut *page, NoticeKind::HighLoad);
                    return Err(EngineError::RemoteTimeout(limit));
                }
                Ok(None) => {
                    let empty = s.streaming.as_ref().is_none_or(|st| st.buffer.is_empty());
                    if empty {
                        let message = "stream ended without content".to_string();
                        self.abort_stream(s, &mut *page, NoticeKind::Error(message.clone()));
                        return Err(EngineError::RemoteError(message));
                    }
                    StreamMessage::complete()
                }
                Ok(Some(message)) => message,
            };

            match message {
                StreamMessage::Chunk { chunk } => {
                    let Some(streaming) = s.streaming.as_mut() else {
                        return Ok(EnhanceOutcome::Superseded);
                    };
                    if let Err(e) = self.engine.push_chunk(&mut *page, streaming, &chunk) {
                        s.resolver.invalidate();
                        self.abort_stream(s, &mut *page, NoticeKind::InjectionFailed);
                        return Err(e);
                    }
                }
                StreamMessage::Complete { complete: false } => {}
                StreamMessage::Complete { complete: true } => {
                    let Some(mut streaming) = s.streaming.take() else {
                        return Ok(EnhanceOutcome::Superseded);
                    };
                    s.state = ControlState::Idle;
                    s.current_request = 0;
                    let emphasis = match self.engine.finish_stream(&mut *page, &mut streaming) {
                        Ok(layer) => layer,
                        Err(e) => {
                            s.streaming = Some(streaming);
                            s.resolver.invalidate();
                            self.abort_stream(s, &mut *page, NoticeKind::InjectionFailed);
                            return Err(e);
                        }
                    };
                    s.emphasis = Some((emphasis, Instant::now() + self.config.emphasis()));
                    info!(
                        "Streaming rewrite {} complete ({} chars)",
                        request.id,
                        streaming.buffer.len()
                    );
                    let strategy = streaming.strategy();
                    return Ok(EnhanceOutcome::Applied {
                        text: streaming.buffer,
                        strategy,
                    });
                }
                StreamMessage::Error { error } => {
                    warn!("Streaming rewrite {} failed: {}", request.id, error);
                    self.abort_stream(s, &mut *page, NoticeKind::Error(error.clone()));
                    return Err(EngineError::RemoteError(error));
                }
            }
        }
    }

    /// Resolve the target, dedup the trigger and claim a request number.
    fn begin_request(
        &self,
        text: Option<&str>,
        mode: InjectionMode,
    ) -> Result<Option<(InjectionRequest, RewriteRequest)>, EngineError> {
        let now = Instant::now();
        let mut session = self.session.lock();
        let mut page = self.page.lock();
        let s = &mut *session;

        let target = resolve_and_attach(s, &mut *page, now)?;
        let source = match text {
            Some(text) => text.to_string(),
            None => page.read_text(target.editable).unwrap_or_default(),
        };
        if source.trim().is_empty() {
            return Err(EngineError::EmptyDraft);
        }

        let Some(hash) = s.guard.admit(&source, now) else {
            debug!("Suppressed duplicate trigger");
            return Ok(None);
        };

        let generation = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        s.cancel_stream(&mut *page, &self.engine);
        s.current_request = generation;
        s.state = ControlState::Loading;

        let request = InjectionRequest::new(hash, source.clone(), mode, target.editable, generation);
        let rewrite = RewriteRequest {
            intent_hint: IntentHint::classify(&source).as_str().to_string(),
            prompt: source,
            style: self.style.clone(),
            platform: s.platform_id().unwrap_or("generic").to_string(),
        };
        info!(request_id = %request.id, mode = ?mode, "Enhancement requested");
        Ok(Some((request, rewrite)))
    }

    /// Reset after a failure that happened before anything was written.
    fn settle_failure<Q: PageTree + ?Sized>(&self, s: &mut EngineSession, page: &mut Q, notice: NoticeKind) {
        let near = s.overlay.control().bbox();
        settle(s, page, notice, near);
    }

    /// Stop a stream, restore the draft and surface `notice` under the input.
    fn abort_stream<Q: PageTree + ?Sized>(&self, s: &mut EngineSession, page: &mut Q, notice: NoticeKind) {
        let mut near = s.overlay.control().bbox();
        if let Some(mut streaming) = s.streaming.take() {
            if let Some(info) = page.info(streaming.editable) {
                near = info.bbox;
            }
            self.engine.fail_stream(page, &mut streaming);
        }
        settle(s, page, notice, near);
    }
}

fn settle<Q: PageTree + ?Sized>(s: &mut EngineSession, page: &mut Q, notice: NoticeKind, near: BoundingBox) {
    s.notices.show(page, notice, near, Instant::now());
    s.state = ControlState::Idle;
    s.current_request = 0;
}

fn preferred_order(s: &EngineSession) -> Vec<CommitStrategy> {
    s.platform
        .as_deref()
        .map(|p| p.commit_order.clone())
        .unwrap_or_default()
}
