use crate::overlay::geometry::{Point, Rect};
use crate::overlay::model::{AreaId, AreaType};
use crate::overlay::store::TakenArea;

/// What the page should show for the selection layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionVisual {
    Off,
    Armed,
    Box(Rect),
}

/// An area being redrawn, held aside until the gesture commits or aborts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditTarget {
    pub original: TakenArea,
    pub display: Rect,
}

impl EditTarget {
    pub fn id(&self) -> AreaId {
        self.original.area.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionOutcome {
    Ignored,
    Committed {
        rect: Rect,
        area_type: AreaType,
        editing: Option<AreaId>,
    },
    Abandoned {
        restore: Option<TakenArea>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Armed {
        area_type: AreaType,
        editing: Option<EditTarget>,
    },
    Dragging {
        area_type: AreaType,
        editing: Option<EditTarget>,
        origin: Point,
        current: Point,
    },
}

impl SelectionState {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn editing_id(&self) -> Option<AreaId> {
        match self {
            Self::Idle => None,
            Self::Armed { editing, .. } | Self::Dragging { editing, .. } => {
                editing.as_ref().map(EditTarget::id)
            }
        }
    }

    pub fn edit_target(&self) -> Option<&EditTarget> {
        match self {
            Self::Idle => None,
            Self::Armed { editing, .. } | Self::Dragging { editing, .. } => editing.as_ref(),
        }
    }

    pub fn visual(&self) -> SelectionVisual {
        match self {
            Self::Idle => SelectionVisual::Off,
            Self::Armed {
                editing: Some(target),
                ..
            } => SelectionVisual::Box(target.display),
            Self::Armed { editing: None, .. } => SelectionVisual::Armed,
            Self::Dragging {
                origin, current, ..
            } => SelectionVisual::Box(Rect::from_corners(*origin, *current)),
        }
    }

    /// Arms a new gesture. Returns the area of an interrupted edit so the
    /// caller can put it back.
    pub fn begin(&mut self, area_type: AreaType, editing: Option<EditTarget>) -> Option<TakenArea> {
        let interrupted = self.cancel();
        *self = Self::Armed { area_type, editing };
        match interrupted {
            SelectionOutcome::Abandoned { restore } => restore,
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, point: Point) -> bool {
        let Self::Armed { area_type, editing } = *self else {
            return false;
        };
        *self = Self::Dragging {
            area_type,
            editing,
            origin: point,
            current: point,
        };
        true
    }

    pub fn pointer_move(&mut self, point: Point) -> Option<Rect> {
        let Self::Dragging {
            origin, current, ..
        } = self
        else {
            return None;
        };
        *current = point;
        Some(Rect::from_corners(*origin, point))
    }

    /// Ends the drag. Boxes whose sides do not both exceed `min_size` are
    /// abandoned and any edited area is handed back for restoration.
    pub fn pointer_up(&mut self, point: Point, min_size: f64) -> SelectionOutcome {
        let Self::Dragging {
            area_type,
            editing,
            origin,
            ..
        } = *self
        else {
            return SelectionOutcome::Ignored;
        };
        *self = Self::Idle;

        let rect = Rect::from_corners(origin, point);
        if rect.width > min_size && rect.height > min_size {
            SelectionOutcome::Committed {
                rect,
                area_type,
                editing: editing.map(|target| target.id()),
            }
        } else {
            SelectionOutcome::Abandoned {
                restore: editing.map(|target| target.original),
            }
        }
    }

    /// Ends the gesture if it is editing `id`, dropping the held area.
    pub fn discard_edit(&mut self, id: AreaId) -> bool {
        if self.editing_id() != Some(id) {
            return false;
        }
        *self = Self::Idle;
        true
    }

    /// Flips the type of the area held by an edit of `id`. The gesture
    /// follows, so a redraw commits with the new type.
    pub fn toggle_edited_type(&mut self, id: AreaId, scroll_y: f64) -> bool {
        match self {
            Self::Armed {
                area_type,
                editing: Some(target),
            }
            | Self::Dragging {
                area_type,
                editing: Some(target),
                ..
            } if target.id() == id => {
                target.original.area.toggle_type(scroll_y);
                *area_type = target.original.area.kind();
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) -> SelectionOutcome {
        match std::mem::take(self) {
            Self::Idle => SelectionOutcome::Ignored,
            Self::Armed { editing, .. } | Self::Dragging { editing, .. } => {
                SelectionOutcome::Abandoned {
                    restore: editing.map(|target| target.original),
                }
            }
        }
    }
}
