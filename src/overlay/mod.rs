pub mod geometry;
pub mod messages;
pub mod model;
pub mod render;
pub mod selection;
pub mod session;
pub mod store;

pub use geometry::{compute_overlay_rects, Point, Rect, Viewport};
pub use messages::{Request, Response};
pub use model::{Anchor, Area, AreaId, AreaType};
pub use render::{HeadlessSurface, OverlayFrame, OverlaySurface, RenderDriver};
pub use session::PageSession;
pub use store::AreaStore;
