mod assets;
mod canvas;
mod debug;
mod error;
mod escape;
mod font;
mod matrix;
mod metrics;
mod path;
mod perf;
mod scene;
mod serialize;
mod shape;
mod types;

pub use assets::{
    FetchedImage, HttpImageLoader, ImageInfo, ImageLoader, ImageSource, data_uri,
    is_remote_source, sniff_mime,
};
pub use canvas::SvgCanvas;
use canvas::Collaborators;
use debug::DebugLogger;
pub use error::SvgCanvasError;
pub use escape::{TextEscaper, XmlEscaper};
pub use font::{FontMetricsProvider, FontRegistry};
pub use matrix::Matrix;
pub use metrics::SceneMetrics;
use perf::PerfLogger;
use std::path::PathBuf;
use std::sync::Arc;
pub use types::{FontSpec, LineCap, LineJoin, Point, TextAlign, TextBaseline, TextMetrics};

const DEFAULT_WIDTH: f64 = 300.0;
const DEFAULT_HEIGHT: f64 = 150.0;

impl SvgCanvas {
    pub fn builder() -> SvgCanvasBuilder {
        SvgCanvasBuilder::new()
    }
}

pub struct SvgCanvasBuilder {
    width: f64,
    height: f64,
    font_dirs: Vec<PathBuf>,
    font_files: Vec<PathBuf>,
    font_metrics: Option<Arc<dyn FontMetricsProvider>>,
    text_escaper: Option<Arc<dyn TextEscaper>>,
    image_loader: Option<Arc<dyn ImageLoader>>,
    resolve_remote_images: bool,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
}

impl SvgCanvasBuilder {
    pub fn new() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            font_dirs: Vec::new(),
            font_files: Vec::new(),
            font_metrics: None,
            text_escaper: None,
            image_loader: None,
            resolve_remote_images: cfg!(feature = "remote"),
            debug_path: None,
            perf_path: None,
        }
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn register_font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn register_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_files.push(path.into());
        self
    }

    pub fn font_metrics(mut self, provider: Arc<dyn FontMetricsProvider>) -> Self {
        self.font_metrics = Some(provider);
        self
    }

    pub fn text_escaper(mut self, escaper: Arc<dyn TextEscaper>) -> Self {
        self.text_escaper = Some(escaper);
        self
    }

    pub fn image_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.image_loader = Some(loader);
        self
    }

    // When disabled, remote image URLs are written to the document unchanged.
    pub fn resolve_remote_images(mut self, enabled: bool) -> Self {
        self.resolve_remote_images = enabled;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SvgCanvas, SvgCanvasError> {
        if !self.width.is_finite() || !self.height.is_finite() {
            return Err(SvgCanvasError::InvalidConfiguration(
                "surface size must be finite".to_string(),
            ));
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(SvgCanvasError::InvalidConfiguration(format!(
                "surface size must not be negative (got {}x{})",
                self.width, self.height
            )));
        }
        let fonts = match self.font_metrics {
            Some(provider) => provider,
            None => {
                let mut registry = FontRegistry::new();
                for dir in &self.font_dirs {
                    registry.register_dir(dir);
                }
                for file in &self.font_files {
                    registry.register_file(file);
                }
                Arc::new(registry) as Arc<dyn FontMetricsProvider>
            }
        };
        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        let perf = match self.perf_path {
            Some(path) => Some(Arc::new(PerfLogger::new(path)?)),
            None => None,
        };
        let services = Collaborators {
            escaper: self.text_escaper.unwrap_or_else(|| Arc::new(XmlEscaper)),
            fonts,
            loader: self
                .image_loader
                .unwrap_or_else(|| Arc::new(HttpImageLoader::new())),
            resolve_remote_images: self.resolve_remote_images,
            debug,
            perf,
        };
        Ok(SvgCanvas::with_collaborators(
            self.width,
            self.height,
            services,
        ))
    }
}

impl Default for SvgCanvasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("svgcanvas_{name}_{nanos}.log"))
    }

    struct Shouting;

    impl TextEscaper for Shouting {
        fn escape_text(&self, raw: &str) -> String {
            XmlEscaper.escape_text(&raw.to_uppercase())
        }
    }

    struct FixedMetrics;

    impl FontMetricsProvider for FixedMetrics {
        fn measure_text(&self, font: &FontSpec, text: &str) -> TextMetrics {
            TextMetrics {
                width: font.size * text.len() as f64,
                ascent: 1.0,
                descent: 1.0,
            }
        }
    }

    #[test]
    fn defaults_match_a_fresh_canvas_element() {
        let canvas = SvgCanvas::builder().build().unwrap();
        assert_eq!((canvas.width(), canvas.height()), (300.0, 150.0));
        let svg = canvas.finish();
        assert!(svg.contains("<svg width=\"300px\" height=\"150px\""));
    }

    #[test]
    fn rejects_unusable_sizes() {
        for (w, h) in [(f64::NAN, 1.0), (1.0, f64::INFINITY), (-1.0, 5.0)] {
            let err = SvgCanvas::builder().size(w, h).build().err().unwrap();
            assert!(matches!(err, SvgCanvasError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn log_path_errors_surface_from_build() {
        let err = SvgCanvas::builder()
            .debug_log("/nonexistent-dir/debug.log")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SvgCanvasError::Io(_)));
    }

    #[test]
    fn custom_collaborators_are_used() {
        let mut canvas = SvgCanvas::builder()
            .text_escaper(Arc::new(Shouting))
            .font_metrics(Arc::new(FixedMetrics))
            .build()
            .unwrap();
        assert_eq!(canvas.measure_text("abcd").width, 40.0);
        canvas.fill_text("hi", 0.0, 0.0);
        assert!(canvas.finish().contains(">HI</text>"));
    }

    #[test]
    fn disabled_resolution_keeps_remote_urls() {
        let mut canvas = SvgCanvas::builder()
            .resolve_remote_images(false)
            .build()
            .unwrap();
        canvas.draw_image_at(
            &ImageSource::url("https://example.com/a.png?x=1&y=2", 8, 8),
            0.0,
            0.0,
        );
        let (svg, metrics) = canvas.finish_with_metrics();
        assert_eq!(metrics.unresolved_images, 0);
        assert!(svg.contains("xlink:href=\"https://example.com/a.png?x=1&amp;y=2\""));
    }

    #[test]
    fn debug_log_records_counters_and_merges() {
        let path = temp_path("debug_session");
        let mut canvas = SvgCanvas::builder().debug_log(&path).build().unwrap();
        canvas.rect(0.0, 0.0, 1.0, 1.0);
        canvas.fill();
        canvas.stroke();
        canvas.fill_text("t", 0.0, 0.0);
        canvas.draw_image_at(&ImageSource::Encoded(vec![0, 0]), 0.0, 0.0);
        canvas.finish();

        let log = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert!(lines[0].starts_with("{\"type\":\"image.decode_failed\",\"error\":"));
        assert_eq!(
            lines[1],
            "{\"type\":\"debug.summary\",\"context\":\"finish\",\"counts\":{\"scene.merge\":1,\"shape.path\":2,\"shape.text\":1}}"
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn perf_log_records_finish_spans() {
        let path = temp_path("perf_session");
        let mut canvas = SvgCanvas::builder().perf_log(&path).build().unwrap();
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0);
        let metrics = canvas
            .finish_to_writer(std::io::sink())
            .unwrap();
        assert_eq!(metrics.shape_count, 1);

        let log = std::fs::read_to_string(&path).unwrap();
        assert!(log.contains("\"name\":\"images.resolve\""));
        assert!(log.contains("\"name\":\"scene.serialize\""));
        assert!(log.contains("\"name\":\"finish\",\"counts\":{\"shapes\":1,"));
        let _ = std::fs::remove_file(&path);
        let hot = path.with_file_name(format!(
            "{}_hot.log",
            path.file_stem().unwrap().to_str().unwrap()
        ));
        let _ = std::fs::remove_file(hot);
    }
}
