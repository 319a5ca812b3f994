use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::assets::{HttpImageLoader, ImageLoader, ImageSource, resolve_remote_images};
use crate::debug::DebugLogger;
use crate::error::SvgCanvasError;
use crate::escape::{TextEscaper, XmlEscaper};
use crate::font::{FontMetricsProvider, FontRegistry};
use crate::matrix::Matrix;
use crate::metrics::SceneMetrics;
use crate::path::{PathBuilder, rect_path};
use crate::perf::PerfLogger;
use crate::scene::{ClipStack, Scene, SceneItem};
use crate::serialize::serialize_scene;
use crate::shape::{ImageShape, Paint, PathShape, RenderState, Shape, SourceRect, StrokeStyle, TextShape};
use crate::types::{FontSpec, LineCap, LineJoin, TextAlign, TextBaseline, TextMetrics};

const DEFAULT_FONT: &str = "10px sans-serif";

#[derive(Debug, Clone)]
struct GraphicsState {
    font: String,
    fill_style: String,
    stroke_style: String,
    line_width: f64,
    line_cap: LineCap,
    line_join: LineJoin,
    global_alpha: f64,
    text_align: TextAlign,
    text_baseline: TextBaseline,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT.to_string(),
            fill_style: "black".to_string(),
            stroke_style: "black".to_string(),
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            global_alpha: 1.0,
            text_align: TextAlign::Start,
            text_baseline: TextBaseline::Alphabetic,
        }
    }
}

#[derive(Debug, Clone)]
struct SavedState {
    style: GraphicsState,
    matrix: Arc<Matrix>,
    clips: ClipStack,
}

pub(crate) struct Collaborators {
    pub escaper: Arc<dyn TextEscaper>,
    pub fonts: Arc<dyn FontMetricsProvider>,
    pub loader: Arc<dyn ImageLoader>,
    pub resolve_remote_images: bool,
    pub debug: Option<Arc<DebugLogger>>,
    pub perf: Option<Arc<PerfLogger>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            escaper: Arc::new(XmlEscaper),
            fonts: Arc::new(FontRegistry::new()),
            loader: Arc::new(HttpImageLoader::new()),
            resolve_remote_images: cfg!(feature = "remote"),
            debug: None,
            perf: None,
        }
    }
}

pub struct SvgCanvas {
    width: f64,
    height: f64,
    state: GraphicsState,
    matrix: Arc<Matrix>,
    clips: ClipStack,
    root_clips: ClipStack,
    save_stack: Vec<SavedState>,
    path: PathBuilder,
    scene: Scene,
    services: Collaborators,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_collaborators(width, height, Collaborators::default())
    }

    pub(crate) fn with_collaborators(width: f64, height: f64, services: Collaborators) -> Self {
        let root_clips = ClipStack::empty();
        Self {
            width,
            height,
            state: GraphicsState::default(),
            matrix: Arc::new(Matrix::identity()),
            clips: root_clips.clone(),
            root_clips,
            save_stack: Vec::new(),
            path: PathBuilder::new(),
            scene: Scene::new(),
            services,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn shape_count(&self) -> usize {
        self.scene.shape_count()
    }

    pub fn merged_count(&self) -> usize {
        self.scene.merged_count()
    }

    pub fn save(&mut self) {
        self.save_stack.push(SavedState {
            style: self.state.clone(),
            matrix: self.matrix.clone(),
            clips: self.clips.clone(),
        });
    }

    pub fn restore(&mut self) {
        let Some(saved) = self.save_stack.pop() else {
            return;
        };
        self.state = saved.style;
        self.matrix = saved.matrix;
        self.clips = saved.clips;
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.matrix = Arc::new(self.matrix.scale(sx, sy));
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.matrix = Arc::new(self.matrix.translate(tx, ty));
    }

    pub fn rotate(&mut self, theta: f64) {
        self.matrix = Arc::new(self.matrix.rotate(theta));
    }

    pub fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        let other = Matrix::new(a, c, b, d, e, f);
        self.matrix = Arc::new(self.matrix.multiply(&other));
    }

    pub fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.matrix = Arc::new(Matrix::new(a, c, b, d, e, f));
    }

    pub fn reset_transform(&mut self) {
        self.matrix = Arc::new(Matrix::identity());
    }

    pub fn current_transform(&self) -> Matrix {
        *self.matrix
    }

    pub fn begin_path(&mut self) {
        self.path.clear();
    }

    pub fn clip(&mut self) {
        self.clips = self.clips.with(self.path.to_device_space_path());
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.path.move_to(&self.matrix, x, y);
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.path.line_to(&self.matrix, x, y);
    }

    pub fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.path.quadratic_curve_to(&self.matrix, cx, cy, x, y);
    }

    pub fn bezier_curve_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.path
            .bezier_curve_to(&self.matrix, c1x, c1y, c2x, c2y, x, y);
    }

    pub fn arc(&mut self, x: f64, y: f64, r: f64, start: f64, end: f64, anticlockwise: bool) {
        self.path
            .arc(&self.matrix, x, y, r, start, end, anticlockwise);
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.path.rect(&self.matrix, x, y, w, h);
    }

    pub fn close_path(&mut self) {
        self.path.close_path();
    }

    pub fn fill(&mut self) {
        let path = self.path.to_user_space_path(&self.matrix);
        self.add_path(path, self.fill_paint());
    }

    pub fn stroke(&mut self) {
        let path = self.path.to_user_space_path(&self.matrix);
        self.add_path(path, self.stroke_paint());
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.add_path(rect_path(x, y, w, h), self.fill_paint());
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.add_path(rect_path(x, y, w, h), self.stroke_paint());
    }

    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let state = RenderState {
            matrix: self.matrix.clone(),
            clips: self.root_clips.clone(),
        };
        self.add_shape(Shape::Path(PathShape {
            path: rect_path(x, y, w, h),
            state,
            paint: Paint::fill("white", 1.0),
        }));
    }

    pub fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let paint = self.fill_paint();
        self.add_text(text, x, y, paint);
    }

    pub fn stroke_text(&mut self, text: &str, x: f64, y: f64) {
        let paint = self.stroke_paint();
        self.add_text(text, x, y, paint);
    }

    pub fn begin_text_group(&mut self) {
        self.scene.push_marker(SceneItem::TextGroupBegin {
            clips: self.clips.clone(),
        });
    }

    pub fn end_text_group(&mut self) {
        self.scene.push_marker(SceneItem::TextGroupEnd);
    }

    pub fn measure_text(&self, text: &str) -> TextMetrics {
        let font = FontSpec::parse(&self.state.font);
        self.services.fonts.measure_text(&font, text)
    }

    pub fn draw_image(&mut self, source: &ImageSource, args: &[f64]) {
        let (source_rect, dx, dy, size) = match *args {
            [dx, dy] => (None, dx, dy, None),
            [dx, dy, dw, dh] => (None, dx, dy, Some((dw, dh))),
            [sx, sy, sw, sh, dx, dy, dw, dh] => (
                Some(SourceRect { sx, sy, sw, sh }),
                dx,
                dy,
                Some((dw, dh)),
            ),
            _ => return,
        };
        let info = match source.describe() {
            Ok(info) => info,
            Err(err) => {
                if let Some(logger) = self.services.debug.as_deref() {
                    let message = err.to_string();
                    logger.log_event("image.decode_failed", &[("error", message.as_str())]);
                }
                return;
            }
        };
        let width = info.width as f64;
        let height = info.height as f64;
        let (dw, dh) = size.unwrap_or((width, height));
        let state = self.render_state();
        self.add_shape(Shape::Image(ImageShape {
            src: info.src,
            width,
            height,
            dx,
            dy,
            dw,
            dh,
            source: source_rect,
            alpha: self.state.global_alpha,
            state,
        }));
    }

    pub fn draw_image_at(&mut self, source: &ImageSource, dx: f64, dy: f64) {
        self.draw_image(source, &[dx, dy]);
    }

    pub fn draw_image_scaled(&mut self, source: &ImageSource, dx: f64, dy: f64, dw: f64, dh: f64) {
        self.draw_image(source, &[dx, dy, dw, dh]);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_image_region(
        &mut self,
        source: &ImageSource,
        sx: f64,
        sy: f64,
        sw: f64,
        sh: f64,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) {
        self.draw_image(source, &[sx, sy, sw, sh, dx, dy, dw, dh]);
    }

    pub fn font(&self) -> &str {
        &self.state.font
    }

    pub fn set_font(&mut self, font: impl Into<String>) {
        self.state.font = font.into();
    }

    pub fn fill_style(&self) -> &str {
        &self.state.fill_style
    }

    pub fn set_fill_style(&mut self, color: impl Into<String>) {
        self.state.fill_style = color.into();
    }

    pub fn stroke_style(&self) -> &str {
        &self.state.stroke_style
    }

    pub fn set_stroke_style(&mut self, color: impl Into<String>) {
        self.state.stroke_style = color.into();
    }

    pub fn line_width(&self) -> f64 {
        self.state.line_width
    }

    pub fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
    }

    pub fn line_cap(&self) -> LineCap {
        self.state.line_cap
    }

    pub fn set_line_cap(&mut self, cap: LineCap) {
        self.state.line_cap = cap;
    }

    pub fn line_join(&self) -> LineJoin {
        self.state.line_join
    }

    pub fn set_line_join(&mut self, join: LineJoin) {
        self.state.line_join = join;
    }

    pub fn global_alpha(&self) -> f64 {
        self.state.global_alpha
    }

    pub fn set_global_alpha(&mut self, alpha: f64) {
        if (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    pub fn text_align(&self) -> TextAlign {
        self.state.text_align
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        self.state.text_align = align;
    }

    pub fn text_baseline(&self) -> TextBaseline {
        self.state.text_baseline
    }

    pub fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state.text_baseline = baseline;
    }

    pub fn finish(self) -> String {
        self.finish_with_metrics().0
    }

    pub fn finish_with_metrics(self) -> (String, SceneMetrics) {
        let SvgCanvas {
            width,
            height,
            scene,
            services,
            ..
        } = self;
        let merged_count = scene.merged_count();
        let mut items = scene.into_items();

        let mut unresolved_images = 0;
        let mut resolve_ms = 0.0;
        if services.resolve_remote_images {
            let start = Instant::now();
            let outcomes = resolve_remote_images(&mut items, services.loader.as_ref());
            resolve_ms = start.elapsed().as_secs_f64() * 1000.0;
            if let Some(perf) = services.perf.as_deref() {
                perf.log_span_ms("images.resolve", resolve_ms);
            }
            for outcome in outcomes {
                let Some(err) = outcome.error else {
                    continue;
                };
                unresolved_images += 1;
                if let Some(logger) = services.debug.as_deref() {
                    let message = err.to_string();
                    logger.log_event(
                        "image.resolve_failed",
                        &[("url", outcome.url.as_str()), ("error", message.as_str())],
                    );
                }
            }
        }

        let start = Instant::now();
        let (svg, stats) = serialize_scene(width, height, &items, services.escaper.as_ref());
        let serialize_ms = start.elapsed().as_secs_f64() * 1000.0;

        let metrics = SceneMetrics {
            shape_count: stats.shape_count,
            merged_count,
            group_count: stats.group_count,
            text_group_count: stats.text_group_count,
            clip_path_count: stats.clip_path_count,
            image_count: stats.image_count,
            unresolved_images,
            resolve_ms,
            serialize_ms,
            output_bytes: svg.len(),
        };
        if let Some(perf) = services.perf.as_deref() {
            perf.log_span_ms("scene.serialize", serialize_ms);
            perf.log_counts(
                "finish",
                &[
                    ("shapes", metrics.shape_count as u64),
                    ("merged", metrics.merged_count as u64),
                    ("groups", metrics.group_count as u64),
                    ("clip_paths", metrics.clip_path_count as u64),
                    ("images", metrics.image_count as u64),
                    ("bytes", metrics.output_bytes as u64),
                ],
            );
            perf.flush();
        }
        if let Some(logger) = services.debug.as_deref() {
            logger.emit_summary("finish");
            logger.flush();
        }
        (svg, metrics)
    }

    pub fn finish_to_writer<W: Write>(self, mut writer: W) -> Result<SceneMetrics, SvgCanvasError> {
        let (svg, metrics) = self.finish_with_metrics();
        writer.write_all(svg.as_bytes())?;
        writer.flush()?;
        Ok(metrics)
    }

    pub fn finish_to_file(self, path: impl AsRef<Path>) -> Result<SceneMetrics, SvgCanvasError> {
        let file = File::create(path)?;
        self.finish_to_writer(BufWriter::new(file))
    }

    fn render_state(&self) -> RenderState {
        RenderState {
            matrix: self.matrix.clone(),
            clips: self.clips.clone(),
        }
    }

    fn fill_paint(&self) -> Paint {
        Paint::fill(self.state.fill_style.clone(), self.state.global_alpha)
    }

    fn stroke_paint(&self) -> Paint {
        Paint::stroke(
            StrokeStyle {
                color: self.state.stroke_style.clone(),
                width: self.state.line_width,
                join: self.state.line_join,
                cap: self.state.line_cap,
            },
            self.state.global_alpha,
        )
    }

    fn add_path(&mut self, path: String, paint: Paint) {
        let state = self.render_state();
        self.add_shape(Shape::Path(PathShape { path, state, paint }));
    }

    fn add_text(&mut self, text: &str, x: f64, y: f64, paint: Paint) {
        let state = self.render_state();
        self.add_shape(Shape::Text(TextShape {
            text: text.to_string(),
            x,
            y,
            font: self.state.font.clone(),
            align: self.state.text_align,
            baseline: self.state.text_baseline,
            state,
            paint,
        }));
    }

    fn add_shape(&mut self, shape: Shape) {
        let kind = match &shape {
            Shape::Path(_) => "shape.path",
            Shape::Text(_) => "shape.text",
            Shape::Image(_) => "shape.image",
        };
        let merged = self.scene.push_shape(shape);
        if let Some(logger) = self.services.debug.as_deref() {
            logger.increment(kind, 1);
            if merged {
                logger.increment("scene.merge", 1);
            }
        }
    }
}
