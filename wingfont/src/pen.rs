//! Pens for collecting outlines into [kurbo] paths.

use kurbo::{Affine, BezPath, Rect, Shape};
use skrifa::outline::OutlinePen;

/// Records a glyph outline, as drawn by skrifa in font units.
#[derive(Debug, Default)]
pub struct OutlineRecorder(BezPath);

impl OutlineRecorder {
    pub fn finish(self) -> BezPath {
        self.0
    }
}

fn pt(x: f32, y: f32) -> (f64, f64) {
    (x.into(), y.into())
}

impl OutlinePen for OutlineRecorder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(pt(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(pt(x, y));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.0.quad_to(pt(cx0, cy0), pt(x, y));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.0.curve_to(pt(cx0, cy0), pt(cx1, cy1), pt(x, y));
    }

    fn close(&mut self) {
        self.0.close_path();
    }
}

/// Accumulates transformed outlines and the union of their bounds.
///
/// A canvas created with [`Canvas::measure`] only tracks bounds; this is
/// what the measuring passes use.
#[derive(Clone, Debug)]
pub struct Canvas {
    path: Option<BezPath>,
    bounds: Option<Rect>,
}

impl Canvas {
    /// A canvas that keeps the drawn outlines.
    pub fn new() -> Canvas {
        Canvas {
            path: Some(BezPath::new()),
            bounds: None,
        }
    }

    /// A canvas that only tracks bounds.
    pub fn measure() -> Canvas {
        Canvas {
            path: None,
            bounds: None,
        }
    }

    /// Draw `outline` under `transform`.
    pub fn draw(&mut self, outline: &BezPath, transform: Affine) {
        if outline.elements().is_empty() {
            return;
        }
        let transformed = transform * outline.clone();
        let bbox = transformed.bounding_box();
        self.bounds = Some(match self.bounds {
            Some(bounds) => bounds.union(bbox),
            None => bbox,
        });
        if let Some(path) = self.path.as_mut() {
            path.extend(transformed.elements().iter().copied());
        }
    }

    /// The union of everything drawn so far, or `None` if nothing was drawn.
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn into_path(self) -> BezPath {
        self.path.unwrap_or_default()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}
