use alloc::boxed::Box;
use core::fmt;

use crate::{Rect, ScrollDirection, ViewportState};

/// The host's scroll container (an element, a window, a terminal pane, ...).
///
/// The engine never holds UI objects directly; it reads geometry through this trait when
/// the host forwards scroll/resize events.
pub trait ScrollContainer {
    /// Content-box size, rounded to whole pixels.
    fn content_rect(&self) -> Rect;

    /// Horizontal scroll position. Right-to-left containers report it as negative.
    fn scroll_left(&self) -> f64;

    fn scroll_top(&self) -> f64;

    /// Whether the host delivers a native "scroll settled" event
    /// (forwarded via [`crate::TreeVirtualizer::handle_scroll_end`]).
    fn supports_scrollend(&self) -> bool {
        false
    }

    /// Whether the host delivers resize notifications
    /// (forwarded via [`crate::TreeVirtualizer::handle_resize`]).
    fn supports_resize_observer(&self) -> bool {
        false
    }

    /// Window-like containers report absolute positions and are never RTL-negated.
    fn is_window(&self) -> bool {
        false
    }

    /// Requests a programmatic scroll. The host reports the result as a regular scroll event.
    fn scroll_to(&mut self, _horizontal: bool, _offset: u64) {}
}

/// Identifies one `attach`; pass it back to `detach`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttachToken(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ViewportReport {
    Rect(Rect),
    Offset {
        offset: u64,
        is_scrolling: bool,
        direction: Option<ScrollDirection>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TrackerConfig {
    pub(crate) horizontal: bool,
    pub(crate) is_rtl: bool,
    pub(crate) reset_delay_ms: u64,
}

struct Attached {
    token: AttachToken,
    container: Box<dyn ScrollContainer>,
    state: ViewportState,
    scrollend: bool,
    resize: bool,
}

/// Observes a scroll container: rect, offset, direction and scroll-end.
///
/// Scroll-end falls back to a debounce when the container has no native signal: every scroll
/// tick replaces the single pending deadline, and `advance` fires it once.
pub(crate) struct ViewportTracker {
    config: TrackerConfig,
    attached: Option<Attached>,
    next_token: u64,
    reset_deadline_ms: Option<u64>,
}

impl ViewportTracker {
    pub(crate) fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            attached: None,
            next_token: 0,
            reset_deadline_ms: None,
        }
    }

    pub(crate) fn set_config(&mut self, config: TrackerConfig) {
        self.config = config;
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub(crate) fn state(&self) -> Option<ViewportState> {
        self.attached.as_ref().map(|a| a.state)
    }

    /// Attaches `container`, replacing any previous one, and snapshots its rect and offset.
    pub(crate) fn attach(
        &mut self,
        container: Box<dyn ScrollContainer>,
    ) -> (AttachToken, [ViewportReport; 2]) {
        self.teardown();
        let token = AttachToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);

        let rect = container.content_rect();
        let offset = read_offset(container.as_ref(), self.config);
        let state = ViewportState {
            rect,
            offset,
            is_scrolling: false,
            direction: None,
        };
        vdebug!(
            token = token.0,
            width = rect.width,
            height = rect.height,
            offset,
            scrollend = container.supports_scrollend(),
            resize = container.supports_resize_observer(),
            "ViewportTracker::attach"
        );
        self.attached = Some(Attached {
            token,
            scrollend: container.supports_scrollend(),
            resize: container.supports_resize_observer(),
            container,
            state,
        });
        let reports = [
            ViewportReport::Rect(rect),
            ViewportReport::Offset {
                offset,
                is_scrolling: false,
                direction: None,
            },
        ];
        (token, reports)
    }

    /// Detaches if `token` names the current attachment. Repeated or stale tokens are no-ops.
    pub(crate) fn detach(&mut self, token: AttachToken) -> bool {
        if self.attached.as_ref().is_some_and(|a| a.token == token) {
            return self.teardown();
        }
        false
    }

    /// Drops the container and the pending scroll-end timer.
    pub(crate) fn teardown(&mut self) -> bool {
        self.reset_deadline_ms = None;
        let detached = self.attached.take().is_some();
        if detached {
            vdebug!("ViewportTracker::teardown");
        }
        detached
    }

    pub(crate) fn on_scroll(&mut self, now_ms: u64) -> Option<ViewportReport> {
        let config = self.config;
        let attached = self.attached.as_mut()?;
        let offset = read_offset(attached.container.as_ref(), config);
        let direction = if offset > attached.state.offset {
            ScrollDirection::Forward
        } else {
            ScrollDirection::Backward
        };
        attached.state.offset = offset;
        attached.state.is_scrolling = true;
        attached.state.direction = Some(direction);
        if !attached.scrollend {
            self.schedule_reset(now_ms);
        }
        vtrace!(offset, now_ms, "ViewportTracker::on_scroll");
        Some(ViewportReport::Offset {
            offset,
            is_scrolling: true,
            direction: Some(direction),
        })
    }

    pub(crate) fn on_scroll_end(&mut self) -> Option<ViewportReport> {
        let config = self.config;
        let attached = self.attached.as_mut()?;
        let offset = read_offset(attached.container.as_ref(), config);
        attached.state.offset = offset;
        attached.state.is_scrolling = false;
        attached.state.direction = None;
        self.reset_deadline_ms = None;
        Some(ViewportReport::Offset {
            offset,
            is_scrolling: false,
            direction: None,
        })
    }

    /// Refreshes the rect. Ignored for containers without resize observation.
    pub(crate) fn on_resize(&mut self) -> Option<ViewportReport> {
        let attached = self.attached.as_mut()?;
        if !attached.resize {
            return None;
        }
        let rect = attached.container.content_rect();
        attached.state.rect = rect;
        Some(ViewportReport::Rect(rect))
    }

    /// Cancels any pending scroll-end deadline and starts a new one.
    pub(crate) fn schedule_reset(&mut self, now_ms: u64) {
        self.reset_deadline_ms = Some(now_ms.saturating_add(self.config.reset_delay_ms));
    }

    pub(crate) fn next_deadline(&self) -> Option<u64> {
        self.reset_deadline_ms
    }

    /// Fires the scroll-end deadline if it has passed.
    ///
    /// Returns `Some(offset)` (the last known offset when attached) when it fired.
    pub(crate) fn advance(&mut self, now_ms: u64) -> Option<Option<u64>> {
        let deadline = self.reset_deadline_ms?;
        if now_ms < deadline {
            return None;
        }
        self.reset_deadline_ms = None;
        let offset = self.attached.as_mut().map(|a| {
            a.state.is_scrolling = false;
            a.state.direction = None;
            a.state.offset
        });
        vtrace!(now_ms, deadline, "ViewportTracker::advance fired");
        Some(offset)
    }

    pub(crate) fn scroll_to(&mut self, offset: u64) -> bool {
        let horizontal = self.config.horizontal;
        match self.attached.as_mut() {
            Some(a) => {
                a.container.scroll_to(horizontal, offset);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for ViewportTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportTracker")
            .field("config", &self.config)
            .field("attached", &self.attached.as_ref().map(|a| a.token))
            .field("state", &self.state())
            .field("reset_deadline_ms", &self.reset_deadline_ms)
            .finish()
    }
}

fn read_offset(container: &dyn ScrollContainer, config: TrackerConfig) -> u64 {
    let raw = if config.horizontal {
        let left = container.scroll_left();
        if config.is_rtl && !container.is_window() {
            -left
        } else {
            left
        }
    } else {
        container.scroll_top()
    };
    to_pixels(raw)
}

// Negative and NaN positions clamp to 0.
fn to_pixels(value: f64) -> u64 {
    if value > 0.0 { (value + 0.5) as u64 } else { 0 }
}
