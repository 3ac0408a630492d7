//! Transient notices shown next to the action control.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::page::{BoundingBox, Layer, LayerId, LayerKind, PageTree};

const NOTICE_WIDTH: f64 = 240.0;
const NOTICE_HEIGHT: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    /// The rewrite service did not answer in time.
    HighLoad,
    Error(String),
    InjectionFailed,
}

impl NoticeKind {
    pub fn message(&self) -> String {
        match self {
            NoticeKind::HighLoad => "High load right now, please try again in a moment".to_string(),
            NoticeKind::Error(message) => format!("Enhancement failed: {message}"),
            NoticeKind::InjectionFailed => {
                "Couldn't write into this page's input. Your text is unchanged".to_string()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub layer: LayerId,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct NoticeBoard {
    display: Duration,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new(display: Duration) -> Self {
        Self {
            display,
            notices: Vec::new(),
        }
    }

    /// Mount a notice just below `near`.
    pub fn show<P: PageTree + ?Sized>(
        &mut self,
        page: &mut P,
        kind: NoticeKind,
        near: BoundingBox,
        now: Instant,
    ) -> LayerId {
        let bbox = BoundingBox::new(near.x, near.bottom() + 4.0, NOTICE_WIDTH, NOTICE_HEIGHT);
        let layer = page.mount_layer(Layer::new(LayerKind::Notice, bbox).with_text(kind.message()));
        debug!("Showing notice {:?}", kind);
        self.notices.push(Notice {
            kind,
            layer,
            expires_at: now + self.display,
        });
        layer
    }

    /// Remove expired notices, returning how many were removed.
    pub fn prune<P: PageTree + ?Sized>(&mut self, page: &mut P, now: Instant) -> usize {
        let before = self.notices.len();
        self.notices.retain(|n| {
            if n.expires_at <= now {
                page.remove_layer(n.layer);
                false
            } else {
                true
            }
        });
        before - self.notices.len()
    }

    pub fn dismiss_all<P: PageTree + ?Sized>(&mut self, page: &mut P) {
        for notice in self.notices.drain(..) {
            page.remove_layer(notice.layer);
        }
    }

    pub fn active(&self) -> &[Notice] {
        &self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{SnapshotPage, ViewportInfo};

    #[test]
    fn test_notice_expires_after_display() {
        let mut page = SnapshotPage::new("https://x.test/", ViewportInfo::default());
        let mut board = NoticeBoard::new(Duration::from_secs(5));
        let start = Instant::now();

        board.show(&mut page, NoticeKind::HighLoad, BoundingBox::new(0.0, 0.0, 32.0, 32.0), start);
        assert_eq!(page.layers_of(LayerKind::Notice).len(), 1);
        assert_eq!(page.layers_of(LayerKind::Notice)[0].bbox.y, 36.0);

        assert_eq!(board.prune(&mut page, start + Duration::from_secs(4)), 0);
        assert_eq!(board.prune(&mut page, start + Duration::from_secs(5)), 1);
        assert!(board.active().is_empty());
        assert!(page.layers_of(LayerKind::Notice).is_empty());
    }

    #[test]
    fn test_messages() {
        assert!(NoticeKind::HighLoad.message().contains("High load"));
        assert!(NoticeKind::Error("bad gateway".into()).message().contains("bad gateway"));
    }
}
