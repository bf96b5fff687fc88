use crate::config::EngineConfig;
use crate::overlay::geometry::{Point, Viewport};
use crate::overlay::messages::{Request, Response, Status};
use crate::overlay::model::{Area, AreaId, AreaType};
use crate::overlay::render::{OverlaySurface, RenderDriver, RenderInputs};
use crate::overlay::selection::{EditTarget, SelectionOutcome, SelectionState};
use crate::overlay::store::{AreaStore, TakenArea};
use crate::page::PageContext;
use crate::settings::Settings;
use crate::storage::KeyValueStore;
use serde_json::Value;

/// The engine instance resident in one page context.
///
/// Every event runs to completion: state is updated, persisted (best
/// effort) and the overlay re-rendered before the handler returns.
pub struct PageSession<S, O> {
    page: PageContext,
    config: EngineConfig,
    settings: Settings,
    areas: AreaStore,
    selection: SelectionState,
    driver: RenderDriver,
    storage: S,
    surface: O,
    viewport: Viewport,
    scroll_y: f64,
}

impl<S: KeyValueStore, O: OverlaySurface> PageSession<S, O> {
    pub fn load(
        page: PageContext,
        config: EngineConfig,
        storage: S,
        surface: O,
        viewport: Viewport,
        scroll_y: f64,
    ) -> Self {
        let settings = Settings::load(&storage);
        let areas = AreaStore::from_areas(load_areas(&storage, &page));
        tracing::info!(
            page_key = %page.key(),
            areas = areas.len(),
            monochrome = settings.monochrome,
            "page session started"
        );

        let mut session = Self {
            page,
            config,
            settings,
            areas,
            selection: SelectionState::Idle,
            driver: RenderDriver::default(),
            storage,
            surface,
            viewport,
            scroll_y,
        };
        session
            .surface
            .set_engagement_hidden(session.settings.hide_engagement);
        session.render();
        session
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn areas(&self) -> &[Area] {
        self.areas.areas()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn surface(&self) -> &O {
        &self.surface
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn handle(&mut self, request: Request) -> Option<Response> {
        tracing::debug!(page_key = %self.page.key(), ?request, "handling request");
        match request {
            Request::Ping => Some(Response::Status {
                status: Status::Ok,
                page_key: self.page.key(),
            }),
            Request::UpdateSettings { settings } => {
                self.settings = settings;
                self.surface.set_engagement_hidden(settings.hide_engagement);
                self.render();
                None
            }
            Request::ToggleSelectionMode { area_type } => {
                self.begin_selection(area_type, None);
                None
            }
            Request::ResetArea => {
                // A pending edit belongs to the set being cleared.
                let _ = self.selection.cancel();
                self.surface.set_selection(self.selection.visual());
                self.areas.reset_all();
                self.commit_areas();
                Some(self.areas_response())
            }
            Request::GetAreas => Some(self.areas_response()),
            Request::DeleteArea { area_id } => {
                let was_editing = self.selection.discard_edit(area_id);
                if was_editing {
                    self.surface.set_selection(self.selection.visual());
                }
                if self.areas.delete(area_id) || was_editing {
                    tracing::info!(area_id, was_editing, "area deleted");
                    self.commit_areas();
                }
                Some(self.areas_response())
            }
            Request::EditArea { area_id } => {
                self.edit_area(area_id);
                None
            }
            Request::ToggleAreaType { area_id } => {
                let toggled = self.areas.toggle_type(area_id, self.scroll_y)
                    || self.selection.toggle_edited_type(area_id, self.scroll_y);
                if toggled {
                    tracing::info!(area_id, "area type toggled");
                    self.commit_areas();
                }
                Some(self.areas_response())
            }
        }
    }

    pub fn on_scroll(&mut self, scroll_y: f64) {
        self.scroll_y = scroll_y;
        self.render();
    }

    pub fn on_resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.render();
    }

    pub fn on_pointer_down(&mut self, point: Point) {
        if self.selection.pointer_down(point) {
            self.surface.set_selection(self.selection.visual());
        }
    }

    pub fn on_pointer_move(&mut self, point: Point) {
        if self.selection.pointer_move(point).is_some() {
            self.surface.set_selection(self.selection.visual());
        }
    }

    pub fn on_pointer_up(&mut self, point: Point) {
        let outcome = self.selection.pointer_up(point, self.config.min_area_size);
        self.finish_selection(outcome);
    }

    /// Escape key: abandons the gesture and restores an area being edited.
    pub fn on_escape(&mut self) {
        let outcome = self.selection.cancel();
        self.finish_selection(outcome);
    }

    pub fn on_pointer_leave(&mut self) {
        if matches!(self.selection, SelectionState::Dragging { .. }) {
            let outcome = self.selection.cancel();
            self.finish_selection(outcome);
        }
    }

    /// Recomputes and applies the overlay. Returns whether the surface changed.
    pub fn render(&mut self) -> bool {
        let inputs = RenderInputs {
            enabled: self.settings.monochrome,
            native_bypass: self.page.is_native_bypass(&self.config.native_bypass_hosts),
            areas: self.areas.areas(),
            viewport: self.viewport,
            scroll_y: self.scroll_y,
        };
        self.driver.render(&inputs, &mut self.surface)
    }

    fn begin_selection(&mut self, area_type: AreaType, editing: Option<EditTarget>) {
        if let Some(interrupted) = self.selection.begin(area_type, editing) {
            self.restore_edit(interrupted);
        }
        self.surface.set_selection(self.selection.visual());
    }

    fn edit_area(&mut self, area_id: AreaId) {
        // Put back any area already being edited before looking up the new one.
        if let SelectionOutcome::Abandoned {
            restore: Some(previous),
        } = self.selection.cancel()
        {
            self.areas.restore(previous);
        }

        let Some(original) = self.areas.take(area_id) else {
            tracing::debug!(area_id, "edit requested for unknown area");
            self.surface.set_selection(self.selection.visual());
            self.render();
            return;
        };
        let display = original.area.viewport_rect(self.scroll_y);
        self.begin_selection(original.area.kind(), Some(EditTarget { original, display }));
        self.render();
    }

    fn finish_selection(&mut self, outcome: SelectionOutcome) {
        match outcome {
            SelectionOutcome::Ignored => return,
            SelectionOutcome::Committed {
                rect,
                area_type,
                editing,
            } => {
                let area = self.areas.add(rect, area_type, self.scroll_y, editing);
                tracing::info!(area_id = area.id, ?area_type, edited = editing.is_some(), "area committed");
                self.commit_areas();
            }
            SelectionOutcome::Abandoned { restore } => {
                if let Some(original) = restore {
                    self.restore_edit(original);
                }
            }
        }
        self.surface.set_selection(self.selection.visual());
    }

    fn restore_edit(&mut self, original: TakenArea) {
        tracing::debug!(area_id = original.area.id, "restoring area after abandoned edit");
        self.areas.restore(original);
        self.render();
    }

    fn commit_areas(&mut self) {
        self.persist_areas();
        self.render();
    }

    // Fire and forget: a failed write is logged and the in-memory state stands.
    // An area held by a pending edit is written in its original slot.
    fn persist_areas(&mut self) {
        let key = self.page.storage_key();
        let mut areas = self.areas.areas().to_vec();
        if let Some(target) = self.selection.edit_target() {
            let TakenArea { index, area } = target.original;
            areas.insert(index.min(areas.len()), area);
        }
        let value = match serde_json::to_value(&areas) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(?err, key = %key, "failed to serialize areas");
                return;
            }
        };
        if let Err(err) = self.storage.set(&key, value) {
            tracing::warn!(?err, key = %key, "failed to persist areas");
        }
    }

    fn areas_response(&self) -> Response {
        Response::Areas {
            areas: self.areas.areas().to_vec(),
            page_key: self.page.key(),
        }
    }
}

fn load_areas<S: KeyValueStore + ?Sized>(storage: &S, page: &PageContext) -> Vec<Area> {
    let key = page.storage_key();
    let records = match storage.get(&key) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(records)) => records,
        Some(other) => {
            tracing::warn!(key = %key, value = %other, "persisted areas are not a list; starting empty");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Area>(record) {
            Ok(area) => Some(area),
            Err(err) => {
                tracing::warn!(%err, key = %key, "dropping malformed persisted area");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::geometry::Rect;
    use crate::overlay::render::{HeadlessSurface, OverlayFrame};
    use crate::overlay::selection::SelectionVisual;
    use crate::storage::MemoryStore;
    use anyhow::anyhow;
    use serde_json::json;

    fn page() -> PageContext {
        PageContext::new("example.com", "/article")
    }

    fn session_with(store: MemoryStore) -> PageSession<MemoryStore, HeadlessSurface> {
        PageSession::load(
            page(),
            EngineConfig::default(),
            store,
            HeadlessSurface::default(),
            Viewport::new(1000.0, 800.0),
            0.0,
        )
    }

    fn drag(session: &mut PageSession<MemoryStore, HeadlessSurface>, from: Point, to: Point) {
        session.on_pointer_down(from);
        session.on_pointer_move(to);
        session.on_pointer_up(to);
    }

    fn ids<S: KeyValueStore, O: OverlaySurface>(session: &PageSession<S, O>) -> Vec<AreaId> {
        session.areas().iter().map(|a| a.id).collect()
    }

    #[test]
    fn fresh_page_is_fully_covered() {
        let session = session_with(MemoryStore::new());
        assert_eq!(
            session.surface().frame,
            OverlayFrame::Panels(vec![Rect::new(0.0, 0.0, 1000.0, 800.0)])
        );
        assert!(session.surface().engagement_hidden);
    }

    #[test]
    fn drag_creates_and_persists_area() {
        let mut session = session_with(MemoryStore::new());
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        assert_eq!(session.surface().selection, SelectionVisual::Armed);

        drag(&mut session, Point::new(100.0, 100.0), Point::new(300.0, 300.0));

        assert_eq!(ids(&session), vec![1]);
        assert_eq!(session.surface().selection, SelectionVisual::Off);
        assert_eq!(session.surface().frame.panels().len(), 4);
        let stored = session.storage().get("areas_example.com/article").expect("persisted");
        assert_eq!(stored.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn fixed_area_scrolls_with_page() {
        let mut session = session_with(MemoryStore::new());
        session.on_scroll(500.0);
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Fixed,
        });
        drag(&mut session, Point::new(0.0, 100.0), Point::new(200.0, 300.0));

        let area = session.areas()[0];
        assert_eq!(area.viewport_rect(500.0).y, 100.0);

        session.on_scroll(550.0);
        assert_eq!(
            session.surface().frame.panels()[0],
            Rect::new(0.0, 0.0, 1000.0, 50.0)
        );
    }

    #[test]
    fn tiny_drag_creates_nothing() {
        let mut session = session_with(MemoryStore::new());
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        drag(&mut session, Point::new(100.0, 100.0), Point::new(105.0, 400.0));
        assert!(session.areas().is_empty());
        assert!(!session.selection().is_active());
        assert!(session.storage().get("areas_example.com/article").is_none());
    }

    #[test]
    fn edit_commit_keeps_id() {
        let mut session = session_with(MemoryStore::new());
        for x in [0.0, 400.0] {
            session.handle(Request::ToggleSelectionMode {
                area_type: AreaType::Floating,
            });
            drag(&mut session, Point::new(x, 0.0), Point::new(x + 100.0, 100.0));
        }

        session.handle(Request::EditArea { area_id: 1 });
        assert_eq!(ids(&session), vec![2]);
        assert_eq!(
            session.surface().selection,
            SelectionVisual::Box(Rect::new(0.0, 0.0, 100.0, 100.0))
        );

        drag(&mut session, Point::new(50.0, 500.0), Point::new(250.0, 700.0));
        assert_eq!(ids(&session), vec![2, 1]);
        assert_eq!(
            session.areas()[1].viewport_rect(0.0),
            Rect::new(50.0, 500.0, 200.0, 200.0)
        );
    }

    #[test]
    fn abandoned_edit_restores_area() {
        let mut session = session_with(MemoryStore::new());
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Fixed,
        });
        drag(&mut session, Point::new(10.0, 10.0), Point::new(110.0, 110.0));
        let before = session.areas().to_vec();
        let frame_before = session.surface().frame.clone();

        session.handle(Request::EditArea { area_id: 1 });
        assert!(session.areas().is_empty());
        session.on_escape();

        assert_eq!(session.areas(), before.as_slice());
        assert_eq!(session.surface().frame, frame_before);
        assert_eq!(session.surface().selection, SelectionVisual::Off);
    }

    #[test]
    fn pointer_leaving_mid_drag_restores_area() {
        let mut session = session_with(MemoryStore::new());
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        drag(&mut session, Point::new(10.0, 10.0), Point::new(110.0, 110.0));

        session.handle(Request::EditArea { area_id: 1 });
        session.on_pointer_down(Point::new(0.0, 0.0));
        session.on_pointer_leave();
        assert_eq!(ids(&session), vec![1]);
        assert!(!session.selection().is_active());
    }

    #[test]
    fn edit_of_unknown_area_is_a_no_op() {
        let mut session = session_with(MemoryStore::new());
        assert_eq!(session.handle(Request::EditArea { area_id: 9 }), None);
        assert!(!session.selection().is_active());
    }

    #[test]
    fn reset_then_add_starts_at_id_one() {
        let mut session = session_with(MemoryStore::new());
        for x in [0.0, 300.0] {
            session.handle(Request::ToggleSelectionMode {
                area_type: AreaType::Floating,
            });
            drag(&mut session, Point::new(x, 0.0), Point::new(x + 100.0, 100.0));
        }

        let response = session.handle(Request::ResetArea).expect("reset response");
        assert_eq!(response.areas(), Some(&[][..]));
        assert_eq!(
            session.storage().get("areas_example.com/article"),
            Some(json!([]))
        );

        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        drag(&mut session, Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        assert_eq!(ids(&session), vec![1]);
    }

    #[test]
    fn delete_unknown_id_leaves_areas_unchanged() {
        let mut session = session_with(MemoryStore::new());
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        drag(&mut session, Point::new(0.0, 0.0), Point::new(100.0, 100.0));

        let response = session.handle(Request::DeleteArea { area_id: 77 });
        assert_eq!(response.and_then(|r| r.areas().map(<[Area]>::len)), Some(1));
    }

    #[test]
    fn toggle_type_twice_restores_display() {
        let mut session = session_with(MemoryStore::new());
        session.on_scroll(120.0);
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        drag(&mut session, Point::new(0.0, 40.0), Point::new(100.0, 140.0));
        let frame = session.surface().frame.clone();

        session.handle(Request::ToggleAreaType { area_id: 1 });
        assert_eq!(session.areas()[0].kind(), AreaType::Fixed);
        assert_eq!(session.surface().frame, frame);

        session.handle(Request::ToggleAreaType { area_id: 1 });
        assert_eq!(session.areas()[0].kind(), AreaType::Floating);
        assert_eq!(session.areas()[0].viewport_rect(120.0).y, 40.0);
    }

    #[test]
    fn settings_update_hides_overlay_and_engagement() {
        let mut session = session_with(MemoryStore::new());
        session.handle(Request::UpdateSettings {
            settings: Settings {
                monochrome: false,
                hide_engagement: false,
            },
        });
        assert_eq!(session.surface().frame, OverlayFrame::Hidden);
        assert!(!session.surface().engagement_hidden);
    }

    #[test]
    fn native_bypass_page_renders_nothing() {
        let session = PageSession::load(
            PageContext::new("x.com", "/home"),
            EngineConfig::default(),
            MemoryStore::new(),
            HeadlessSurface::default(),
            Viewport::new(1000.0, 800.0),
            0.0,
        );
        assert_eq!(session.surface().frame, OverlayFrame::Hidden);
    }

    #[test]
    fn malformed_persisted_state_loads_as_empty() {
        let store = MemoryStore::new()
            .with_value("areas_example.com/article", json!({"not": "a list"}))
            .with_value("monochrome", json!(42));
        let session = session_with(store);
        assert!(session.areas().is_empty());
        assert!(session.settings().monochrome);
    }

    #[test]
    fn bad_records_are_dropped_individually() {
        let store = MemoryStore::new().with_value(
            "areas_example.com/article",
            json!([
                {"id": 3, "x": 10, "y": 10, "width": 50, "height": 50, "type": "floating"},
                {"id": 4, "x": 10, "y": 10, "width": -5, "height": 50, "type": "floating"},
                "garbage"
            ]),
        );
        let mut session = session_with(store);
        assert_eq!(ids(&session), vec![3]);

        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        drag(&mut session, Point::new(200.0, 200.0), Point::new(300.0, 300.0));
        assert_eq!(ids(&session), vec![3, 4]);
    }

    fn stored_areas(session: &PageSession<MemoryStore, HeadlessSurface>) -> Vec<Area> {
        let value = session
            .storage()
            .get("areas_example.com/article")
            .expect("areas persisted");
        serde_json::from_value(value).expect("stored areas parse")
    }

    #[test]
    fn deleting_the_area_being_edited_survives_escape() {
        let mut session = session_with(MemoryStore::new());
        for x in [0.0, 400.0] {
            session.handle(Request::ToggleSelectionMode {
                area_type: AreaType::Floating,
            });
            drag(&mut session, Point::new(x, 0.0), Point::new(x + 100.0, 100.0));
        }

        session.handle(Request::EditArea { area_id: 1 });
        let response = session
            .handle(Request::DeleteArea { area_id: 1 })
            .expect("delete response");
        assert_eq!(response.areas().map(<[Area]>::len), Some(1));
        assert!(!session.selection().is_active());
        assert_eq!(session.surface().selection, SelectionVisual::Off);

        session.on_escape();
        assert_eq!(ids(&session), vec![2]);
        let stored: Vec<_> = stored_areas(&session).iter().map(|a| a.id).collect();
        assert_eq!(stored, vec![2]);
    }

    #[test]
    fn toggling_the_area_being_edited_survives_escape() {
        let mut session = session_with(MemoryStore::new());
        session.on_scroll(200.0);
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        drag(&mut session, Point::new(10.0, 60.0), Point::new(110.0, 160.0));
        let frame = session.surface().frame.clone();

        session.handle(Request::EditArea { area_id: 1 });
        session.handle(Request::ToggleAreaType { area_id: 1 });
        let stored = stored_areas(&session);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind(), AreaType::Fixed);

        session.on_escape();
        assert_eq!(session.areas().len(), 1);
        assert_eq!(session.areas()[0].kind(), AreaType::Fixed);
        assert_eq!(session.areas()[0].viewport_rect(200.0).y, 60.0);
        assert_eq!(session.surface().frame, frame);
        assert_eq!(stored_areas(&session)[0].kind(), AreaType::Fixed);
    }

    #[test]
    fn persisted_ids_at_the_limit_do_not_break_loading() {
        let store = MemoryStore::new().with_value(
            "areas_example.com/article",
            json!([
                {"id": u64::MAX, "x": 10, "y": 10, "width": 50, "height": 50, "type": "floating"},
                {"id": 0, "x": 10, "y": 10, "width": 50, "height": 50, "type": "floating"}
            ]),
        );
        let mut session = session_with(store);
        assert!(session.areas().is_empty());

        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        drag(&mut session, Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        assert_eq!(ids(&session), vec![1]);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Option<Value> {
            None
        }

        fn set(&mut self, _key: &str, _value: Value) -> anyhow::Result<()> {
            Err(anyhow!("quota exceeded"))
        }
    }

    #[test]
    fn persistence_failure_keeps_in_memory_state() {
        let mut session = PageSession::load(
            page(),
            EngineConfig::default(),
            FailingStore,
            HeadlessSurface::default(),
            Viewport::new(1000.0, 800.0),
            0.0,
        );
        session.handle(Request::ToggleSelectionMode {
            area_type: AreaType::Floating,
        });
        session.on_pointer_down(Point::new(0.0, 0.0));
        session.on_pointer_up(Point::new(100.0, 100.0));
        assert_eq!(ids(&session), vec![1]);
        assert_eq!(session.surface().frame.panels().len(), 2);
    }
}
