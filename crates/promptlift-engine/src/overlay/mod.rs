//! Overlay framing the resolved input and the draggable action control.
//!
//! The overlay is a set of engine-owned layers: a frame around the input
//! container, four anchor markers (shown only while dragging) and the
//! control itself. Geometry is recomputed from the tracked container on
//! scheduled refreshes; a container that left the document tears the
//! overlay down.

mod anchor;
mod control;
mod schedule;

pub use anchor::{AnchorCorner, AnchorSet};
pub use control::{ActionControl, DragState};
pub use schedule::{LayoutSignal, RefreshScheduler};

use promptlift_config::EngineConfig;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::page::{BoundingBox, ElementId, Layer, LayerId, LayerKind, PageError, PageTree, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct WrapperOverlay {
    pub bounding_box: BoundingBox,
    pub anchors: AnchorSet,
    pub tracked_container: ElementId,
    frame_layer: LayerId,
    control_layer: LayerId,
    anchor_layers: Vec<(AnchorCorner, LayerId)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No overlay attached.
    Idle,
    /// Nothing due, or nothing moved.
    Unchanged,
    Repositioned,
    /// The container left the document; the overlay was removed.
    Detached,
}

#[derive(Debug)]
pub struct OverlayController {
    overlay: Option<WrapperOverlay>,
    control: ActionControl,
    scheduler: RefreshScheduler,
    padding: f64,
}

impl OverlayController {
    pub fn new(config: &EngineConfig, anchor: AnchorCorner) -> Self {
        Self {
            overlay: None,
            control: ActionControl::new(anchor, config.control_size),
            scheduler: RefreshScheduler::new(
                config.refresh_debounce(),
                config.refresh_min_interval(),
            ),
            padding: config.overlay_padding,
        }
    }

    pub fn overlay(&self) -> Option<&WrapperOverlay> {
        self.overlay.as_ref()
    }

    pub fn control(&self) -> &ActionControl {
        &self.control
    }

    pub fn is_attached(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn current_anchor(&self) -> AnchorCorner {
        self.control.current_anchor
    }

    /// Frame `container`, replacing any existing overlay.
    pub fn attach<P: PageTree + ?Sized>(
        &mut self,
        page: &mut P,
        container: ElementId,
        now: Instant,
    ) -> Result<(), EngineError> {
        self.detach(page);

        let info = page
            .info(container)
            .filter(|_| page.is_connected(container))
            .ok_or(PageError::Detached(container))?;

        let bounding_box = info.bbox.expand(self.padding);
        let anchors = AnchorSet::from_box(&bounding_box, self.control.size / 2.0);
        self.control.drag = DragState::default();
        self.control.pin(&anchors);

        let frame_layer = page.mount_layer(Layer::new(LayerKind::Overlay, bounding_box));
        let anchor_layers = AnchorCorner::ALL
            .into_iter()
            .map(|corner| {
                let layer = anchor_layer(&anchors, corner, self.control.size, false);
                (corner, page.mount_layer(layer))
            })
            .collect();
        let control_layer = page.mount_layer(Layer::new(LayerKind::Control, self.control.bbox()));

        debug!("Overlay attached to {} at {:?}", container, bounding_box);
        self.overlay = Some(WrapperOverlay {
            bounding_box,
            anchors,
            tracked_container: container,
            frame_layer,
            control_layer,
            anchor_layers,
        });
        self.scheduler.mark_refreshed(now);
        Ok(())
    }

    /// Remove every overlay layer. The control keeps its anchor.
    pub fn detach<P: PageTree + ?Sized>(&mut self, page: &mut P) {
        if let Some(overlay) = self.overlay.take() {
            page.remove_layer(overlay.frame_layer);
            page.remove_layer(overlay.control_layer);
            for (_, layer) in overlay.anchor_layers {
                page.remove_layer(layer);
            }
            self.control.drag = DragState::default();
            debug!("Overlay detached from {}", overlay.tracked_container);
        }
    }

    pub fn signal(&mut self, kind: LayoutSignal, now: Instant) {
        if self.overlay.is_some() {
            self.scheduler.signal(kind, now);
        }
    }

    /// Run a scheduled refresh if one is due.
    pub fn tick<P: PageTree + ?Sized>(&mut self, page: &mut P, now: Instant) -> RefreshOutcome {
        let Some(overlay) = &self.overlay else {
            return RefreshOutcome::Idle;
        };
        if !self.scheduler.is_due(now) {
            return RefreshOutcome::Unchanged;
        }

        let container = overlay.tracked_container;
        let changed = !page.is_connected(container)
            || page
                .info(container)
                .is_none_or(|i| !i.bbox.expand(self.padding).approx_eq(&overlay.bounding_box));

        if self.scheduler.allows(now, changed) {
            self.refresh(page, now)
        } else {
            self.scheduler.skip();
            RefreshOutcome::Unchanged
        }
    }

    /// Recompute geometry from the tracked container.
    pub fn refresh<P: PageTree + ?Sized>(&mut self, page: &mut P, now: Instant) -> RefreshOutcome {
        let Some(overlay) = self.overlay.as_mut() else {
            return RefreshOutcome::Idle;
        };
        self.scheduler.mark_refreshed(now);

        let container = overlay.tracked_container;
        let info = match page.info(container) {
            Some(info) if page.is_connected(container) => info,
            _ => {
                debug!("Tracked container {} left the document", container);
                self.detach(page);
                return RefreshOutcome::Detached;
            }
        };

        let bounding_box = info.bbox.expand(self.padding);
        if bounding_box.approx_eq(&overlay.bounding_box) {
            return RefreshOutcome::Unchanged;
        }

        overlay.bounding_box = bounding_box;
        overlay.anchors = AnchorSet::from_box(&bounding_box, self.control.size / 2.0);
        self.control.pin(&overlay.anchors);

        let frame = Layer::new(LayerKind::Overlay, bounding_box);
        if let Err(e) = page.update_layer(overlay.frame_layer, frame) {
            warn!("Failed to update overlay frame: {}", e);
        }
        self.sync_layers(page);
        RefreshOutcome::Repositioned
    }

    /// Pointer pressed. Starts a drag when on the control.
    pub fn pointer_down<P: PageTree + ?Sized>(&mut self, page: &mut P, point: Point) -> bool {
        if self.overlay.is_none() || !self.control.begin_drag(point) {
            return false;
        }
        self.sync_layers(page);
        true
    }

    pub fn pointer_move<P: PageTree + ?Sized>(&mut self, page: &mut P, point: Point) -> bool {
        if !self.control.drag_to(point) {
            return false;
        }
        self.sync_layers(page);
        true
    }

    /// Pointer released. Snaps to the nearest anchor and returns it.
    pub fn pointer_up<P: PageTree + ?Sized>(
        &mut self,
        page: &mut P,
        point: Point,
    ) -> Option<AnchorCorner> {
        let anchors = self.overlay.as_ref()?.anchors;
        let corner = self.control.end_drag(point, &anchors)?;
        debug!("Action control snapped to {}", corner);
        self.sync_layers(page);
        Some(corner)
    }

    fn sync_layers<P: PageTree + ?Sized>(&self, page: &mut P) {
        let Some(overlay) = &self.overlay else {
            return;
        };
        let dragging = self.control.drag.is_dragging;
        for (corner, layer) in &overlay.anchor_layers {
            let updated = anchor_layer(&overlay.anchors, *corner, self.control.size, dragging);
            if let Err(e) = page.update_layer(*layer, updated) {
                warn!("Failed to update anchor layer: {}", e);
            }
        }
        let control = Layer::new(LayerKind::Control, self.control.bbox());
        if let Err(e) = page.update_layer(overlay.control_layer, control) {
            warn!("Failed to update control layer: {}", e);
        }
    }
}

fn anchor_layer(anchors: &AnchorSet, corner: AnchorCorner, size: f64, visible: bool) -> Layer {
    let point = anchors.get(corner);
    let layer = Layer::new(
        LayerKind::Anchor,
        BoundingBox::new(point.x - size / 2.0, point.y - size / 2.0, size, size),
    )
    .with_text(corner.as_str());
    if visible { layer } else { layer.hidden() }
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
