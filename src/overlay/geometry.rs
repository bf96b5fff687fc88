use crate::overlay::model::Area;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized box spanned by two corners, whatever their order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.width * self.height
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Bounds are inclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// True when the interiors share positive area; touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let clipped = Rect::new(x, y, right - x, bottom - y);
        (!clipped.is_empty()).then_some(clipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    fn intersects(&self, rect: &Rect) -> bool {
        rect.bottom() > 0.0 && rect.y < self.height && rect.right() > 0.0 && rect.x < self.width
    }
}

/// Tiles everything in the viewport that is not covered by an area.
///
/// The returned rectangles never overlap each other. With no areas the
/// whole viewport comes back as one panel; a degenerate viewport yields
/// nothing.
pub fn compute_overlay_rects(areas: &[Area], viewport: Viewport, scroll_y: f64) -> Vec<Rect> {
    if viewport.is_degenerate() {
        return Vec::new();
    }

    let projected: Vec<Rect> = areas
        .iter()
        .map(|area| area.viewport_rect(scroll_y))
        .filter(Rect::is_finite)
        .collect();

    match projected.as_slice() {
        [] => vec![viewport.rect()],
        [single] => frame_single(*single, viewport),
        many => tile_many(many, viewport),
    }
}

fn push_panel(out: &mut Vec<Rect>, x: f64, y: f64, width: f64, height: f64) {
    let panel = Rect::new(x, y, width, height);
    if !panel.is_empty() {
        out.push(panel);
    }
}

// Full-width bands above and below, side strips limited to the area's own rows.
fn frame_single(rect: Rect, viewport: Viewport) -> Vec<Rect> {
    let (vw, vh) = (viewport.width, viewport.height);
    let mut out = Vec::with_capacity(4);

    let top = rect.y.min(vh);
    push_panel(&mut out, 0.0, 0.0, vw, top);

    let bottom = rect.bottom().max(0.0);
    push_panel(&mut out, 0.0, bottom, vw, vh - bottom);

    let band_top = rect.y.clamp(0.0, vh);
    let band_height = rect.bottom().clamp(0.0, vh) - band_top;

    let left = rect.x.min(vw);
    push_panel(&mut out, 0.0, band_top, left, band_height);

    let right = rect.right().max(0.0);
    push_panel(&mut out, right, band_top, vw - right, band_height);

    out
}

fn tile_many(rects: &[Rect], viewport: Viewport) -> Vec<Rect> {
    let (vw, vh) = (viewport.width, viewport.height);
    let visible: Vec<Rect> = rects
        .iter()
        .copied()
        .filter(|rect| viewport.intersects(rect))
        .collect();

    if visible.is_empty() {
        return vec![viewport.rect()];
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for rect in &visible {
        min_x = min_x.min(rect.x);
        min_y = min_y.min(rect.y);
        max_x = max_x.max(rect.right());
        max_y = max_y.max(rect.bottom());
    }
    let min_x = min_x.max(0.0);
    let min_y = min_y.max(0.0);
    let max_x = max_x.min(vw);
    let max_y = max_y.min(vh);

    let mut out = Vec::new();
    push_panel(&mut out, 0.0, 0.0, vw, min_y);
    push_panel(&mut out, 0.0, max_y, vw, vh - max_y);
    push_panel(&mut out, 0.0, min_y, min_x, max_y - min_y);
    push_panel(&mut out, max_x, min_y, vw - max_x, max_y - min_y);

    fill_interior_gaps(&visible, (min_x, min_y, max_x, max_y), &mut out);
    out
}

// Grid lines come only from area edges, so every cell is either wholly
// inside some area or wholly outside all of them and the centre decides.
fn fill_interior_gaps(rects: &[Rect], bounds: (f64, f64, f64, f64), out: &mut Vec<Rect>) {
    let (min_x, min_y, max_x, max_y) = bounds;

    let mut xs = vec![min_x, max_x];
    let mut ys = vec![min_y, max_y];
    for rect in rects {
        xs.push(rect.x.clamp(min_x, max_x));
        xs.push(rect.right().clamp(min_x, max_x));
        ys.push(rect.y.clamp(min_y, max_y));
        ys.push(rect.bottom().clamp(min_y, max_y));
    }
    let xs = sorted_unique(xs);
    let ys = sorted_unique(ys);

    for cols in xs.windows(2) {
        for rows in ys.windows(2) {
            let cell = Rect::new(cols[0], rows[0], cols[1] - cols[0], rows[1] - rows[0]);
            if cell.is_empty() {
                continue;
            }
            let centre = Point::new(cell.x + cell.width / 2.0, cell.y + cell.height / 2.0);
            if !rects.iter().any(|rect| rect.contains(centre)) {
                out.push(cell);
            }
        }
    }
}

fn sorted_unique(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}
