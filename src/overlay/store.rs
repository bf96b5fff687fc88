use crate::overlay::geometry::Rect;
use crate::overlay::model::{Area, AreaId, AreaType};

/// An area lifted out of the store while it is being redrawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TakenArea {
    pub index: usize,
    pub area: Area,
}

/// Ordered set of areas for one page context.
///
/// Ids grow monotonically and only restart at 1 after [`AreaStore::reset_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct AreaStore {
    areas: Vec<Area>,
    next_id: AreaId,
}

impl Default for AreaStore {
    fn default() -> Self {
        Self {
            areas: Vec::new(),
            next_id: 1,
        }
    }
}

impl AreaStore {
    pub fn from_areas(areas: Vec<Area>) -> Self {
        let mut store = Self::default();
        for area in areas {
            if store.find(area.id).is_some() {
                tracing::warn!(area_id = area.id, "dropping duplicate persisted area");
                continue;
            }
            store.next_id = store.next_id.max(area.id.saturating_add(1));
            store.areas.push(area);
        }
        store
    }

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn next_id(&self) -> AreaId {
        self.next_id
    }

    pub fn find(&self, id: AreaId) -> Option<&Area> {
        self.areas.iter().find(|area| area.id == id)
    }

    /// Appends an area drawn at `rect` (viewport coordinates).
    ///
    /// When `editing` names an id, that id is reused and any record still
    /// holding it is replaced; otherwise a fresh id is allocated.
    pub fn add(
        &mut self,
        rect: Rect,
        kind: AreaType,
        scroll_y: f64,
        editing: Option<AreaId>,
    ) -> Area {
        let id = match editing {
            Some(id) => {
                self.areas.retain(|area| area.id != id);
                self.next_id = self.next_id.max(id.saturating_add(1));
                id
            }
            None => {
                let id = self.next_id;
                self.next_id = self.next_id.saturating_add(1);
                id
            }
        };
        let area = Area::new(id, rect, kind, scroll_y);
        self.areas.push(area);
        area
    }

    pub fn toggle_type(&mut self, id: AreaId, scroll_y: f64) -> bool {
        let Some(area) = self.areas.iter_mut().find(|area| area.id == id) else {
            return false;
        };
        area.toggle_type(scroll_y);
        true
    }

    pub fn delete(&mut self, id: AreaId) -> bool {
        let before = self.areas.len();
        self.areas.retain(|area| area.id != id);
        self.areas.len() != before
    }

    pub fn take(&mut self, id: AreaId) -> Option<TakenArea> {
        let index = self.areas.iter().position(|area| area.id == id)?;
        let area = self.areas.remove(index);
        Some(TakenArea { index, area })
    }

    /// Puts a taken area back where it was, unless its id was reused meanwhile.
    pub fn restore(&mut self, taken: TakenArea) {
        if self.find(taken.area.id).is_some() {
            return;
        }
        let index = taken.index.min(self.areas.len());
        self.areas.insert(index, taken.area);
    }

    pub fn reset_all(&mut self) {
        self.areas.clear();
        self.next_id = 1;
    }
}
