use crate::overlay::geometry::{compute_overlay_rects, Rect, Viewport};
use crate::overlay::model::Area;
use crate::overlay::selection::SelectionVisual;
use serde::Serialize;

/// The page-side layer that actually draws panels.
pub trait OverlaySurface {
    fn hide(&mut self);
    fn show(&mut self, panels: &[Rect]);
    fn set_engagement_hidden(&mut self, hidden: bool);
    fn set_selection(&mut self, visual: SelectionVisual);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "panels", rename_all = "snake_case")]
pub enum OverlayFrame {
    Hidden,
    Panels(Vec<Rect>),
}

impl OverlayFrame {
    pub fn panels(&self) -> &[Rect] {
        match self {
            Self::Hidden => &[],
            Self::Panels(panels) => panels,
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderInputs<'a> {
    pub enabled: bool,
    pub native_bypass: bool,
    pub areas: &'a [Area],
    pub viewport: Viewport,
    pub scroll_y: f64,
}

pub fn frame_for(inputs: &RenderInputs<'_>) -> OverlayFrame {
    if !inputs.enabled || inputs.native_bypass {
        return OverlayFrame::Hidden;
    }
    OverlayFrame::Panels(compute_overlay_rects(
        inputs.areas,
        inputs.viewport,
        inputs.scroll_y,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RenderTicket(u64);

/// Sequences frames onto a surface so that only the newest request wins.
#[derive(Debug, Default)]
pub struct RenderDriver {
    issued: u64,
    applied: u64,
    last: Option<OverlayFrame>,
}

impl RenderDriver {
    pub fn request(&mut self) -> RenderTicket {
        self.issued += 1;
        RenderTicket(self.issued)
    }

    /// Applies `frame` unless a newer ticket was already applied. Returns
    /// whether the surface changed.
    pub fn apply<O: OverlaySurface + ?Sized>(
        &mut self,
        ticket: RenderTicket,
        frame: OverlayFrame,
        surface: &mut O,
    ) -> bool {
        if ticket.0 <= self.applied {
            tracing::debug!(ticket = ticket.0, applied = self.applied, "dropping stale overlay frame");
            return false;
        }
        self.applied = ticket.0;

        if self.last.as_ref() == Some(&frame) {
            return false;
        }
        match &frame {
            OverlayFrame::Hidden => surface.hide(),
            OverlayFrame::Panels(panels) => surface.show(panels),
        }
        self.last = Some(frame);
        true
    }

    pub fn render<O: OverlaySurface + ?Sized>(
        &mut self,
        inputs: &RenderInputs<'_>,
        surface: &mut O,
    ) -> bool {
        let ticket = self.request();
        let frame = frame_for(inputs);
        tracing::debug!(
            areas = inputs.areas.len(),
            scroll_y = inputs.scroll_y,
            panels = frame.panels().len(),
            "overlay recomputed"
        );
        self.apply(ticket, frame, surface)
    }

    pub fn last_frame(&self) -> Option<&OverlayFrame> {
        self.last.as_ref()
    }
}

/// Surface that only remembers what it was told; used off-page.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSurface {
    pub frame: OverlayFrame,
    pub engagement_hidden: bool,
    pub selection: SelectionVisual,
    pub writes: usize,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self {
            frame: OverlayFrame::Hidden,
            engagement_hidden: false,
            selection: SelectionVisual::Off,
            writes: 0,
        }
    }
}

impl OverlaySurface for HeadlessSurface {
    fn hide(&mut self) {
        self.frame = OverlayFrame::Hidden;
        self.writes += 1;
    }

    fn show(&mut self, panels: &[Rect]) {
        self.frame = OverlayFrame::Panels(panels.to_vec());
        self.writes += 1;
    }

    fn set_engagement_hidden(&mut self, hidden: bool) {
        self.engagement_hidden = hidden;
    }

    fn set_selection(&mut self, visual: SelectionVisual) {
        self.selection = visual;
    }
}
