//! Isometric projection and pointer hit-testing
//!
//! World `(x, y, z)` maps to a screen rectangle whose size follows the
//! viewport width and camera zoom. The visible top of a tile is a diamond
//! inside the upper part of that rectangle; the rest is the tile's side face.
//! Because neighbouring rectangles overlap heavily, hit-testing runs against
//! the diamond, not the rectangle.

use crate::config::ViewportConfig;
use crate::generator::lattice::HALF_STEP;
use crate::spatial_hash::{Extent, TileId};
use crate::tile::Tile;

/// Tiles spanning the viewport width at zoom 1.
pub const TILES_ACROSS: f32 = 16.0;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
const ZOOM_IN_FACTOR: f32 = 1.1;
const ZOOM_OUT_FACTOR: f32 = 0.9;

const SQRT_3: f32 = 1.732_050_8;

/// Slack for points lying exactly on a diamond edge.
const EDGE_EPSILON: f32 = 1e-3;

/// Screen size in pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl From<ViewportConfig> for Viewport {
    fn from(config: ViewportConfig) -> Self {
        Self::new(config.width, config.height)
    }
}

/// Camera pan (screen pixels) and zoom
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub z: f32,
    zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { x: 0.0, z: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    pub fn new(x: f32, z: f32, zoom: f32) -> Self {
        Self {
            x,
            z,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.z)
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom, clamped to the allowed range. Returns whether it changed.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom == self.zoom {
            return false;
        }
        self.zoom = zoom;
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.zoom >= MAX_ZOOM {
            return false;
        }
        self.set_zoom(self.zoom * ZOOM_IN_FACTOR)
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom <= MIN_ZOOM {
            return false;
        }
        self.set_zoom(self.zoom * ZOOM_OUT_FACTOR)
    }
}

/// On-screen tile dimensions for one viewport/zoom combination
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileMetrics {
    /// Base size: viewport width / 16 * zoom
    pub size: f32,
    /// Width of the tile rectangle
    pub width: f32,
    /// Height of the tile rectangle (top diamond plus side face)
    pub height: f32,
}

impl TileMetrics {
    pub fn new(viewport: &Viewport, zoom: f32) -> Self {
        let size = viewport.width / TILES_ACROSS * zoom;
        Self {
            size,
            width: size / SQRT_3,
            height: size / 2.0,
        }
    }

    /// Vertical extent of the top diamond.
    pub fn diamond_height(&self) -> f32 {
        self.width / SQRT_3
    }

    /// Tiles this small cannot be hit-tested (edge slopes would divide by zero).
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.diamond_height() <= 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn relative_to(&self, origin: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Axis-aligned screen rectangle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl ScreenRect {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        self.x1 <= point.x && point.x <= self.x2 && self.y1 <= point.y && point.y <= self.y2
    }
}

/// Slopes (rise over run) of the four diamond edges
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeSlopes {
    pub north_west: f32,
    pub north_east: f32,
    pub south_west: f32,
    pub south_east: f32,
}

/// The visible top face of a tile
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Diamond {
    pub up: ScreenPoint,
    pub down: ScreenPoint,
    pub left: ScreenPoint,
    pub right: ScreenPoint,
}

impl Diamond {
    pub fn centroid(&self) -> ScreenPoint {
        ScreenPoint::new(
            (self.left.x + self.right.x) / 2.0,
            (self.up.y + self.down.y) / 2.0,
        )
    }

    /// Corners relative to the left corner: `(up, down, right)`.
    fn normalized(&self) -> (ScreenPoint, ScreenPoint, ScreenPoint) {
        (
            self.up.relative_to(self.left),
            self.down.relative_to(self.left),
            self.right.relative_to(self.left),
        )
    }

    pub fn slopes(&self) -> EdgeSlopes {
        let (up, down, right) = self.normalized();
        EdgeSlopes {
            north_west: up.y / up.x,
            north_east: (right.y - up.y) / (right.x - up.x),
            south_west: down.y / down.x,
            south_east: (right.y - down.y) / (right.x - down.x),
        }
    }

    /// Exact point-in-diamond test.
    ///
    /// The point passes when a vertical ray puts it below the upper edges and
    /// above the lower edges, and a horizontal ray puts it right of the left
    /// edges and left of the right edges.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        let (up, down, right) = self.normalized();
        let q = point.relative_to(self.left);
        let s = self.slopes();

        let upper_y = if q.x <= up.x {
            s.north_west * q.x
        } else {
            up.y + s.north_east * (q.x - up.x)
        };
        let lower_y = if q.x <= down.x {
            s.south_west * q.x
        } else {
            down.y + s.south_east * (q.x - down.x)
        };
        let left_x = if q.y <= 0.0 {
            q.y / s.north_west
        } else {
            q.y / s.south_west
        };
        let right_x = if q.y <= right.y {
            up.x + (q.y - up.y) / s.north_east
        } else {
            down.x + (q.y - down.y) / s.south_east
        };

        let inside_up = q.y >= upper_y - EDGE_EPSILON;
        let inside_down = q.y <= lower_y + EDGE_EPSILON;
        let inside_left = q.x >= left_x - EDGE_EPSILON;
        let inside_right = q.x <= right_x + EDGE_EPSILON;

        inside_up && inside_down && inside_left && inside_right
    }

    /// Whether `point` lies in the diamond swept straight down by `depth`
    /// pixels: the top face plus the visible side faces below it.
    pub fn swept_contains(&self, point: ScreenPoint, depth: f32) -> bool {
        if point.x < self.left.x - EDGE_EPSILON || point.x > self.right.x + EDGE_EPSILON {
            return false;
        }
        point.y >= self.upper_edge_y(point.x) - EDGE_EPSILON
            && point.y <= self.lower_edge_y(point.x) + depth.max(0.0) + EDGE_EPSILON
    }

    fn upper_edge_y(&self, x: f32) -> f32 {
        let s = self.slopes();
        if x <= self.up.x {
            self.left.y + s.north_west * (x - self.left.x)
        } else {
            self.up.y + s.north_east * (x - self.up.x)
        }
    }

    fn lower_edge_y(&self, x: f32) -> f32 {
        let s = self.slopes();
        if x <= self.down.x {
            self.left.y + s.south_west * (x - self.left.x)
        } else {
            self.down.y + s.south_east * (x - self.down.x)
        }
    }
}

/// Projection state: viewport, camera and the derived tile metrics.
///
/// Metrics are cached; anything that changes zoom or viewport must call
/// [`IsoProjection::recompute_dimensions`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsoProjection {
    viewport: Viewport,
    camera: Camera,
    metrics: TileMetrics,
}

impl IsoProjection {
    pub fn new(viewport: Viewport, camera: Camera) -> Self {
        Self {
            viewport,
            camera,
            metrics: TileMetrics::new(&viewport, camera.zoom()),
        }
    }

    pub fn recompute_dimensions(&mut self) {
        self.metrics = TileMetrics::new(&self.viewport, self.camera.zoom());
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn metrics(&self) -> TileMetrics {
        self.metrics
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.recompute_dimensions();
    }

    pub fn set_camera_position(&mut self, x: f32, z: f32) {
        self.camera.x = x;
        self.camera.z = z;
    }

    /// Replace the camera zoom. Returns whether it changed.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        let changed = self.camera.set_zoom(zoom);
        if changed {
            self.recompute_dimensions();
        }
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.camera.zoom_in();
        if changed {
            self.recompute_dimensions();
        }
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.camera.zoom_out();
        if changed {
            self.recompute_dimensions();
        }
        changed
    }

    /// Top-left of the tile rectangle ignoring the camera pan.
    pub fn project_absolute(&self, x: f32, y: f32, z: f32) -> ScreenPoint {
        let m = &self.metrics;
        ScreenPoint::new(
            x * m.width,
            z * m.height * (2.0 / 3.0) - y * m.height / 3.0,
        )
    }

    /// Top-left of the tile rectangle on screen, whether visible or not.
    pub fn project(&self, x: f32, y: f32, z: f32) -> ScreenPoint {
        let p = self.project_absolute(x, y, z);
        ScreenPoint::new(p.x - self.camera.x, p.y - self.camera.z)
    }

    /// Top-left of the tile rectangle, or `None` when the rectangle does not
    /// intersect the viewport.
    pub fn world_to_screen(&self, x: f32, y: f32, z: f32) -> Option<ScreenPoint> {
        let p = self.project(x, y, z);
        let m = &self.metrics;
        if p.x + m.width < 0.0 || p.x > self.viewport.width {
            return None;
        }
        if p.y + m.height < 0.0 || p.y > self.viewport.height {
            return None;
        }
        Some(p)
    }

    pub fn bounding_box(&self, x: f32, y: f32, z: f32) -> Option<ScreenRect> {
        let p = self.world_to_screen(x, y, z)?;
        Some(self.rect_at(p))
    }

    fn rect_at(&self, p: ScreenPoint) -> ScreenRect {
        ScreenRect {
            x1: p.x,
            y1: p.y,
            x2: p.x + self.metrics.width,
            y2: p.y + self.metrics.height,
        }
    }

    /// Centre of the top diamond, ignoring the camera pan.
    pub fn middle_point_absolute(&self, x: f32, y: f32, z: f32) -> ScreenPoint {
        let p = self.project_absolute(x, y, z);
        self.middle_of(p)
    }

    fn middle_of(&self, p: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            p.x + self.metrics.width / 2.0,
            p.y + self.metrics.diamond_height() / 2.0,
        )
    }

    fn diamond_at(&self, p: ScreenPoint) -> Diamond {
        let rect = self.rect_at(p);
        let middle = self.middle_of(p);
        Diamond {
            up: ScreenPoint::new(middle.x, rect.y1),
            down: ScreenPoint::new(middle.x, p.y + self.metrics.diamond_height()),
            left: ScreenPoint::new(rect.x1, middle.y),
            right: ScreenPoint::new(rect.x2, middle.y),
        }
    }

    /// Top diamond of a visible tile.
    pub fn diamond(&self, x: f32, y: f32, z: f32) -> Option<Diamond> {
        let p = self.world_to_screen(x, y, z)?;
        Some(self.diamond_at(p))
    }

    /// Whether the screen point falls on the top diamond of the tile at
    /// `(x, y, z)`. Off-screen and degenerate tiles are never hit.
    pub fn contains(&self, x: f32, y: f32, z: f32, point: ScreenPoint) -> bool {
        if self.metrics.is_degenerate() {
            return false;
        }
        let Some(p) = self.world_to_screen(x, y, z) else {
            return false;
        };
        if !self.rect_at(p).contains(point) {
            return false;
        }
        self.diamond_at(p).contains(point)
    }

    /// Columns whose tile rectangles can cover `point`, for tiles between
    /// heights `min_y` and `max_y`. Bounds are widened to whole half-steps.
    ///
    /// `None` when the metrics are degenerate.
    pub fn candidate_area(&self, point: ScreenPoint, min_y: f32, max_y: f32) -> Option<Extent> {
        if self.metrics.is_degenerate() {
            return None;
        }
        let m = &self.metrics;
        let ax = point.x + self.camera.x;
        let ay = point.y + self.camera.z;
        let row = m.height * (2.0 / 3.0);

        // x * w <= ax <= x * w + w
        let min_x = ax / m.width - 1.0;
        let max_x = ax / m.width;
        // top = z * row - y * h / 3, and top <= ay <= top + h
        let min_z = (ay - m.height + min_y * m.height / 3.0) / row;
        let max_z = (ay + max_y * m.height / 3.0) / row;

        let down = |v: f32| (v / HALF_STEP).floor() * HALF_STEP;
        let up = |v: f32| (v / HALF_STEP).ceil() * HALF_STEP;
        Some(Extent {
            min_x: down(min_x),
            max_x: up(max_x),
            min_z: down(min_z),
            max_z: up(max_z),
        })
    }

    /// Screen height of a tile's side face below its diamond.
    pub fn face_depth(&self) -> f32 {
        self.metrics.height - self.metrics.diamond_height()
    }
}

/// Choose among tiles whose diamond contains the pointer: greatest `z`
/// first, then greatest `y`.
pub fn topmost<'a, I>(candidates: I) -> Option<TileId>
where
    I: IntoIterator<Item = (TileId, &'a Tile)>,
{
    candidates
        .into_iter()
        .max_by(|(_, a), (_, b)| a.z.total_cmp(&b.z).then(a.y.total_cmp(&b.y)))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn projection() -> IsoProjection {
        IsoProjection::new(Viewport::new(1600.0, 900.0), Camera::default())
    }

    #[test]
    fn test_metrics_follow_zoom() {
        let mut proj = projection();
        assert_relative_eq!(proj.metrics().size, 100.0);
        assert_relative_eq!(proj.metrics().width, 100.0 / SQRT_3, epsilon = 1e-4);
        assert_relative_eq!(proj.metrics().height, 50.0);

        assert!(proj.set_zoom(2.0));
        assert_relative_eq!(proj.metrics().size, 200.0);
    }

    #[test]
    fn test_projection_formula() {
        let mut proj = projection();
        proj.set_camera_position(10.0, 20.0);
        let m = proj.metrics();

        let p = proj.project(3.0, 6.0, 4.5);
        assert_relative_eq!(p.x, 3.0 * m.width - 10.0, epsilon = 1e-3);
        assert_relative_eq!(p.y, 4.5 * m.height * 2.0 / 3.0 - 6.0 * m.height / 3.0 - 20.0, epsilon = 1e-3);
    }

    #[test]
    fn test_off_screen_tiles_have_no_position() {
        let proj = projection();
        assert!(proj.world_to_screen(0.0, 0.0, 0.0).is_some());
        assert!(proj.world_to_screen(-5.0, 0.0, 0.0).is_none());
        assert!(proj.world_to_screen(0.0, 0.0, 500.0).is_none());
    }

    #[test]
    fn test_centroid_hits_and_rectangle_corner_misses() {
        let proj = projection();
        let diamond = proj.diamond(0.0, 0.0, 0.0).unwrap();
        let rect = proj.bounding_box(0.0, 0.0, 0.0).unwrap();

        assert!(proj.contains(0.0, 0.0, 0.0, diamond.centroid()));

        let corner = ScreenPoint::new(rect.x1 + 1.0, rect.y1 + 1.0);
        assert!(rect.contains(corner));
        assert!(!proj.contains(0.0, 0.0, 0.0, corner));

        // Side face below the diamond is not part of the top
        let face = ScreenPoint::new(diamond.down.x, rect.y2 - 1.0);
        assert!(!proj.contains(0.0, 0.0, 0.0, face));
    }

    #[test]
    fn test_diamond_corners_are_inside() {
        let proj = projection();
        let d = proj.diamond(1.0, 0.0, 1.0).unwrap();
        for corner in [d.up, d.down, d.left, d.right] {
            assert!(d.contains(corner), "{:?}", corner);
        }
        assert!(!d.contains(ScreenPoint::new(d.right.x + 1.0, d.right.y)));
        assert!(!d.contains(ScreenPoint::new(d.up.x, d.up.y - 1.0)));
    }

    #[test]
    fn test_each_edge_rejects_points_beyond_it() {
        let proj = projection();
        let d = proj.diamond(1.0, 0.0, 1.0).unwrap();
        let c = d.centroid();
        let quarter_w = (d.right.x - d.left.x) / 4.0;
        let quarter_h = (d.down.y - d.up.y) / 4.0;

        // Just outside each edge near its midpoint
        let nw = ScreenPoint::new(c.x - quarter_w - 2.0, c.y - quarter_h - 2.0);
        let ne = ScreenPoint::new(c.x + quarter_w + 2.0, c.y - quarter_h - 2.0);
        let sw = ScreenPoint::new(c.x - quarter_w - 2.0, c.y + quarter_h + 2.0);
        let se = ScreenPoint::new(c.x + quarter_w + 2.0, c.y + quarter_h + 2.0);
        for p in [nw, ne, sw, se] {
            assert!(!d.contains(p), "{:?} should be outside", p);
        }

        // Just inside each edge
        let inner = [
            ScreenPoint::new(c.x - quarter_w + 2.0, c.y - quarter_h + 2.0),
            ScreenPoint::new(c.x + quarter_w - 2.0, c.y + quarter_h - 2.0),
        ];
        for p in inner {
            assert!(d.contains(p), "{:?} should be inside", p);
        }
    }

    #[test]
    fn test_slopes_are_symmetric() {
        let d = projection().diamond(0.0, 0.0, 0.0).unwrap();
        let s = d.slopes();
        assert!(s.north_west < 0.0);
        assert!(s.south_west > 0.0);
        assert_relative_eq!(s.north_west, -s.north_east, epsilon = 1e-4);
        assert_relative_eq!(s.south_west, -s.south_east, epsilon = 1e-4);
    }

    #[test]
    fn test_degenerate_metrics_are_not_hittable() {
        let proj = IsoProjection::new(Viewport::new(0.0, 900.0), Camera::default());
        assert!(proj.metrics().is_degenerate());
        assert!(!proj.contains(0.0, 0.0, 0.0, ScreenPoint::new(0.0, 0.0)));
    }

    #[test]
    fn test_candidate_area_holds_every_covering_column() {
        let mut proj = projection();
        proj.set_camera_position(35.0, -200.0);
        let columns = [(0.0, 0.0), (2.5, 3.5), (7.0, 1.0), (4.5, 9.5)];

        for (x, z) in columns {
            for y in [0.0, 3.0, 8.0] {
                let centre = proj.diamond(x, y, z).unwrap().centroid();
                let area = proj.candidate_area(centre, 0.0, 8.0).unwrap();
                assert!(area.min_x <= x && x <= area.max_x, "x {} outside {:?}", x, area);
                assert!(area.min_z <= z && z <= area.max_z, "z {} outside {:?}", z, area);
            }
        }

        let area = proj.candidate_area(ScreenPoint::new(300.0, 200.0), 0.0, 8.0).unwrap();
        assert!(area.max_x - area.min_x <= 2.0);
        assert_eq!(area.min_x % 0.5, 0.0);
        assert_eq!(area.max_z % 0.5, 0.0);
    }

    #[test]
    fn test_degenerate_metrics_have_no_candidate_area() {
        let proj = IsoProjection::new(Viewport::new(0.0, 900.0), Camera::default());
        assert!(proj.candidate_area(ScreenPoint::new(10.0, 10.0), 0.0, 8.0).is_none());
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::default();
        for _ in 0..50 {
            camera.zoom_in();
        }
        assert_eq!(camera.zoom(), MAX_ZOOM);
        assert!(!camera.zoom_in());

        for _ in 0..50 {
            camera.zoom_out();
        }
        assert_eq!(camera.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_swept_diamond_covers_side_face() {
        let proj = projection();
        let d = proj.diamond(0.0, 0.0, 0.0).unwrap();
        let rect = proj.bounding_box(0.0, 0.0, 0.0).unwrap();
        let face = ScreenPoint::new(d.down.x, rect.y2 - 1.0);

        assert!(!d.contains(face));
        assert!(d.swept_contains(face, proj.face_depth()));
        assert!(!d.swept_contains(ScreenPoint::new(rect.x1 + 1.0, rect.y1 + 1.0), proj.face_depth()));
    }

    #[test]
    fn test_topmost_prefers_front_then_tall() {
        use crate::tile::TileType;
        let back_tall = Tile::new(0.0, 9.0, 0.0, TileType::Grass);
        let front_low = Tile::new(0.5, 2.0, 0.5, TileType::Grass);
        let front_high = Tile::new(0.5, 3.0, 0.5, TileType::Grass);

        let picked = topmost([
            (TileId(0), &back_tall),
            (TileId(1), &front_low),
            (TileId(2), &front_high),
        ]);
        assert_eq!(picked, Some(TileId(2)));
        assert_eq!(topmost(std::iter::empty()), None);
    }
}
