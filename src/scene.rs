use std::sync::Arc;

use crate::shape::{ImageShape, Shape};

#[derive(Debug, Clone, Default)]
pub struct ClipStack(Arc<Vec<String>>);

impl ClipStack {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(&self, path: String) -> Self {
        let mut paths = Vec::with_capacity(self.0.len() + 1);
        paths.extend(self.0.iter().cloned());
        paths.push(path);
        Self(Arc::new(paths))
    }

    pub fn paths(&self) -> &[String] {
        &self.0
    }

    pub fn same(&self, other: &ClipStack) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub enum SceneItem {
    Shape(Shape),
    TextGroupBegin { clips: ClipStack },
    TextGroupEnd,
}

// The last shape waits in `pending` so a following stroke can fold into it.
#[derive(Debug, Default)]
pub struct Scene {
    items: Vec<SceneItem>,
    pending: Option<Shape>,
    merged: usize,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_shape(&mut self, shape: Shape) -> bool {
        if let Some(pending) = self.pending.as_mut() {
            if pending.can_merge(&shape) {
                pending.merge(&shape);
                self.merged += 1;
                return true;
            }
        }
        self.flush_pending();
        self.pending = Some(shape);
        false
    }

    pub fn push_marker(&mut self, item: SceneItem) {
        self.flush_pending();
        self.items.push(item);
    }

    fn flush_pending(&mut self) {
        if let Some(shape) = self.pending.take() {
            self.items.push(SceneItem::Shape(shape));
        }
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.items
            .iter()
            .filter_map(|item| match item {
                SceneItem::Shape(shape) => Some(shape),
                _ => None,
            })
            .chain(self.pending.iter())
    }

    pub fn shape_count(&self) -> usize {
        self.shapes().count()
    }

    pub fn merged_count(&self) -> usize {
        self.merged
    }

    pub fn into_items(mut self) -> Vec<SceneItem> {
        self.flush_pending();
        self.items
    }
}

pub(crate) fn images_mut(items: &mut [SceneItem]) -> impl Iterator<Item = &mut ImageShape> {
    items.iter_mut().filter_map(|item| match item {
        SceneItem::Shape(Shape::Image(image)) => Some(image),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;
    use crate::shape::{Paint, PathShape, RenderState, StrokeStyle};

    fn path_shape(state: &RenderState, path: &str, paint: Paint) -> Shape {
        Shape::Path(PathShape {
            path: path.to_string(),
            state: state.clone(),
            paint,
        })
    }

    fn state() -> RenderState {
        RenderState {
            matrix: Arc::new(Matrix::identity()),
            clips: ClipStack::empty(),
        }
    }

    #[test]
    fn clip_stacks_compare_by_identity() {
        let root = ClipStack::empty();
        let a = root.with("M0,0L1,1z".to_string());
        let b = root.with("M0,0L1,1z".to_string());
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert_eq!(a.paths(), b.paths());
        assert!(root.paths().is_empty());
        assert_eq!(a.with("M2,2z".to_string()).paths().len(), 2);
    }

    #[test]
    fn fill_then_stroke_collapses_into_pending_shape() {
        let state = state();
        let mut scene = Scene::new();
        assert!(!scene.push_shape(path_shape(&state, "M0,0L1,0z", Paint::fill("red", 1.0))));
        let stroke = Paint::stroke(StrokeStyle::default(), 1.0);
        assert!(scene.push_shape(path_shape(&state, "M0,0L1,0z", stroke)));
        assert_eq!(scene.shape_count(), 1);
        assert_eq!(scene.merged_count(), 1);
    }

    #[test]
    fn markers_flush_the_pending_shape() {
        let state = state();
        let mut scene = Scene::new();
        scene.push_shape(path_shape(&state, "M0,0z", Paint::fill("red", 1.0)));
        scene.push_marker(SceneItem::TextGroupEnd);
        let stroke = Paint::stroke(StrokeStyle::default(), 1.0);
        assert!(!scene.push_shape(path_shape(&state, "M0,0z", stroke)));
        let items = scene.into_items();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[1], SceneItem::TextGroupEnd));
    }
}
