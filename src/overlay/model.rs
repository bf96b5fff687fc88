use crate::overlay::geometry::Rect;
use serde::{Deserialize, Serialize};

pub type AreaId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaType {
    Fixed,
    #[default]
    Floating,
}

impl AreaType {
    pub fn toggled(self) -> Self {
        match self {
            Self::Fixed => Self::Floating,
            Self::Floating => Self::Fixed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fixed => "Fixed",
            Self::Floating => "Floating",
        }
    }
}

/// The single authoritative vertical coordinate of an area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Viewport offset; the area keeps its place on screen while scrolling.
    Floating { y: f64 },
    /// Page offset (viewport y + scroll y at anchoring time).
    Fixed { original_y: f64 },
}

impl Anchor {
    pub fn new(kind: AreaType, viewport_y: f64, scroll_y: f64) -> Self {
        match kind {
            AreaType::Floating => Self::Floating { y: viewport_y },
            AreaType::Fixed => Self::Fixed {
                original_y: viewport_y + scroll_y,
            },
        }
    }

    pub fn kind(self) -> AreaType {
        match self {
            Self::Floating { .. } => AreaType::Floating,
            Self::Fixed { .. } => AreaType::Fixed,
        }
    }

    pub fn viewport_y(self, scroll_y: f64) -> f64 {
        match self {
            Self::Floating { y } => y,
            Self::Fixed { original_y } => original_y - scroll_y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AreaRecord", into = "AreaRecord")]
pub struct Area {
    pub id: AreaId,
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub anchor: Anchor,
}

impl Area {
    /// Builds an area from a rectangle observed in viewport coordinates.
    pub fn new(id: AreaId, rect: Rect, kind: AreaType, scroll_y: f64) -> Self {
        Self {
            id,
            x: rect.x,
            width: rect.width,
            height: rect.height,
            anchor: Anchor::new(kind, rect.y, scroll_y),
        }
    }

    pub fn kind(&self) -> AreaType {
        self.anchor.kind()
    }

    pub fn viewport_rect(&self, scroll_y: f64) -> Rect {
        Rect::new(
            self.x,
            self.anchor.viewport_y(scroll_y),
            self.width,
            self.height,
        )
    }

    /// Flips the anchoring while keeping the on-screen position at `scroll_y`.
    pub fn toggle_type(&mut self, scroll_y: f64) {
        let viewport_y = self.anchor.viewport_y(scroll_y);
        self.anchor = Anchor::new(self.kind().toggled(), viewport_y, scroll_y);
    }
}

/// Persisted shape of an area. Fixed areas carry `originalY`; their `y`
/// mirrors it so older readers still find a usable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AreaRecord {
    id: AreaId,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(rename = "type", default)]
    kind: AreaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_y: Option<f64>,
}

impl TryFrom<AreaRecord> for Area {
    type Error = String;

    fn try_from(record: AreaRecord) -> Result<Self, Self::Error> {
        if record.id == 0 || record.id == AreaId::MAX {
            return Err(format!("area id {} is out of range", record.id));
        }
        let anchor = match record.kind {
            AreaType::Floating => Anchor::Floating { y: record.y },
            AreaType::Fixed => Anchor::Fixed {
                original_y: record.original_y.unwrap_or(record.y),
            },
        };
        let area = Area {
            id: record.id,
            x: record.x,
            width: record.width,
            height: record.height,
            anchor,
        };

        let rect = area.viewport_rect(0.0);
        if !rect.is_finite() {
            return Err(format!("area {} has non-finite coordinates", record.id));
        }
        if rect.is_empty() {
            return Err(format!(
                "area {} has non-positive size {}x{}",
                record.id, record.width, record.height
            ));
        }
        Ok(area)
    }
}

impl From<Area> for AreaRecord {
    fn from(area: Area) -> Self {
        let (y, original_y) = match area.anchor {
            Anchor::Floating { y } => (y, None),
            Anchor::Fixed { original_y } => (original_y, Some(original_y)),
        };
        Self {
            id: area.id,
            x: area.x,
            y,
            width: area.width,
            height: area.height,
            kind: area.kind(),
            original_y,
        }
    }
}
