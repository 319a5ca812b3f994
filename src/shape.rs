use std::sync::Arc;

use crate::escape::{TextEscaper, escape_attr};
use crate::matrix::Matrix;
use crate::scene::ClipStack;
use crate::types::{FontSpec, LineCap, LineJoin, Point, TextAlign, TextBaseline, fmt_num};

#[derive(Debug, Clone)]
pub struct RenderState {
    pub matrix: Arc<Matrix>,
    pub clips: ClipStack,
}

impl RenderState {
    pub fn same(&self, other: &RenderState) -> bool {
        Arc::ptr_eq(&self.matrix, &other.matrix) && self.clips.same(&other.clips)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    pub join: LineJoin,
    pub cap: LineCap,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: "black".to_string(),
            width: 1.0,
            join: LineJoin::Miter,
            cap: LineCap::Butt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub fill: Option<String>,
    pub stroke: Option<StrokeStyle>,
    pub alpha: f64,
}

impl Paint {
    pub fn fill(color: impl Into<String>, alpha: f64) -> Self {
        Self {
            fill: Some(color.into()),
            stroke: None,
            alpha,
        }
    }

    pub fn stroke(stroke: StrokeStyle, alpha: f64) -> Self {
        Self {
            fill: None,
            stroke: Some(stroke),
            alpha,
        }
    }

    fn can_absorb(&self, candidate: &Paint) -> bool {
        self.alpha == 1.0
            && candidate.alpha == 1.0
            && self.stroke.is_none()
            && candidate.fill.is_none()
            && candidate.stroke.is_some()
    }

    fn style_attrs(&self) -> Vec<String> {
        let mut attrs = Vec::with_capacity(7);
        attrs.push(format!("fill=\"{}\"", paint_value(self.fill.as_deref())));
        attrs.push(format!(
            "stroke=\"{}\"",
            paint_value(self.stroke.as_ref().map(|s| s.color.as_str()))
        ));
        if let Some(stroke) = &self.stroke {
            attrs.push(format!("stroke-width=\"{}\"", fmt_num(stroke.width)));
            attrs.push(format!("stroke-linejoin=\"{}\"", stroke.join.as_str()));
            attrs.push(format!("stroke-linecap=\"{}\"", stroke.cap.as_str()));
        }
        if self.alpha != 1.0 {
            if self.stroke.is_some() {
                attrs.push(format!("stroke-opacity=\"{}\"", fmt_num(self.alpha)));
            }
            if self.fill.is_some() {
                attrs.push(format!("fill-opacity=\"{}\"", fmt_num(self.alpha)));
            }
        }
        attrs
    }
}

fn paint_value(color: Option<&str>) -> String {
    match color {
        None => "none".to_string(),
        Some("") => "black".to_string(),
        Some(color) => escape_attr(color),
    }
}

#[derive(Debug, Clone)]
pub struct PathShape {
    pub path: String,
    pub state: RenderState,
    pub paint: Paint,
}

impl PathShape {
    pub fn to_svg(&self) -> String {
        let mut attrs = vec![format!("d=\"{}\"", self.path)];
        attrs.extend(self.paint.style_attrs());
        format!("<path {} />", attrs.join(" "))
    }
}

#[derive(Debug, Clone)]
pub struct TextShape {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font: String,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub state: RenderState,
    pub paint: Paint,
}

impl TextShape {
    fn same_run(&self, other: &TextShape) -> bool {
        self.text == other.text
            && self.font == other.font
            && self.align == other.align
            && self.baseline == other.baseline
    }

    pub fn to_svg(&self, escaper: &dyn TextEscaper) -> String {
        self.to_tag("text", None, escaper)
    }

    pub fn to_tspan_svg(&self, matrix: &Matrix, escaper: &dyn TextEscaper) -> String {
        self.to_tag("tspan", Some(matrix), escaper)
    }

    fn to_tag(&self, tag: &str, matrix: Option<&Matrix>, escaper: &dyn TextEscaper) -> String {
        let font = FontSpec::parse(&self.font);
        let origin = Point::new(self.x, self.y);
        let (scale, position) = match matrix {
            Some(matrix) => (matrix.average_scale(), matrix.convert(origin)),
            None => (1.0, origin),
        };
        let mut attrs = self.paint.style_attrs();
        attrs.push(format!("x=\"{}px\"", fmt_num(position.x)));
        attrs.push(format!("y=\"{}px\"", fmt_num(position.y)));
        attrs.push(format!("font-size=\"{}px\"", fmt_num(scale * font.size)));
        attrs.push(format!("font-family=\"{}\"", escape_attr(&font.family)));
        attrs.push(format!(
            "dominant-baseline=\"{}\"",
            self.baseline.dominant_baseline()
        ));
        attrs.push(format!("text-anchor=\"{}\"", self.align.text_anchor()));
        if let Some(style) = &font.style {
            attrs.push(format!("font-style=\"{}\"", escape_attr(style)));
        }
        if let Some(weight) = &font.weight {
            attrs.push(format!("font-weight=\"{}\"", escape_attr(weight)));
        }
        format!(
            "<{tag} {}>{}</{tag}>",
            attrs.join(" "),
            escaper.escape_text(&self.text)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRect {
    pub sx: f64,
    pub sy: f64,
    pub sw: f64,
    pub sh: f64,
}

#[derive(Debug, Clone)]
pub struct ImageShape {
    pub src: String,
    pub width: f64,
    pub height: f64,
    pub dx: f64,
    pub dy: f64,
    pub dw: f64,
    pub dh: f64,
    pub source: Option<SourceRect>,
    pub alpha: f64,
    pub state: RenderState,
}

impl ImageShape {
    pub fn to_svg(&self, clip_id: Option<&str>) -> String {
        let href = escape_attr(&self.src);
        let alpha = fmt_num(self.alpha);
        let (Some(source), Some(id)) = (self.source, clip_id) else {
            return format!(
                "<image xlink:href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" opacity=\"{}\" />",
                href,
                fmt_num(self.dx),
                fmt_num(self.dy),
                fmt_num(self.dw),
                fmt_num(self.dh),
                alpha
            );
        };
        let (dx, dy, dw, dh) = (self.dx, self.dy, self.dw, self.dh);
        let clip = format!(
            "<clipPath id=\"{id}\"><path d=\"M{},{}L{},{}L{},{}L{},{}z\" /></clipPath>",
            fmt_num(dx),
            fmt_num(dy),
            fmt_num(dx + dw),
            fmt_num(dy),
            fmt_num(dx + dw),
            fmt_num(dy + dh),
            fmt_num(dx),
            fmt_num(dy + dh)
        );
        let image = format!(
            "<image xlink:href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" opacity=\"{}\" />",
            href,
            fmt_num(-source.sx * dw / source.sw),
            fmt_num(-source.sy * dh / source.sh),
            fmt_num(self.width * dw / source.sw),
            fmt_num(self.height * dh / source.sh),
            alpha
        );
        [
            clip,
            format!("<g clip-path=\"url(#{id})\">"),
            format!("<g transform=\"translate({},{})\">", fmt_num(dx), fmt_num(dy)),
            image,
            "</g></g>".to_string(),
        ]
        .join("\n")
    }
}

#[derive(Debug, Clone)]
pub enum Shape {
    Path(PathShape),
    Text(TextShape),
    Image(ImageShape),
}

impl Shape {
    pub fn state(&self) -> &RenderState {
        match self {
            Shape::Path(shape) => &shape.state,
            Shape::Text(shape) => &shape.state,
            Shape::Image(shape) => &shape.state,
        }
    }

    pub fn can_merge(&self, candidate: &Shape) -> bool {
        match (self, candidate) {
            (Shape::Path(a), Shape::Path(b)) => {
                a.path == b.path && a.state.same(&b.state) && a.paint.can_absorb(&b.paint)
            }
            (Shape::Text(a), Shape::Text(b)) => {
                a.same_run(b) && a.state.same(&b.state) && a.paint.can_absorb(&b.paint)
            }
            _ => false,
        }
    }

    // Only valid after `can_merge` returned true.
    pub fn merge(&mut self, candidate: &Shape) {
        let stroke = match candidate {
            Shape::Path(shape) => shape.paint.stroke.clone(),
            Shape::Text(shape) => shape.paint.stroke.clone(),
            Shape::Image(_) => return,
        };
        match self {
            Shape::Path(shape) => shape.paint.stroke = stroke,
            Shape::Text(shape) => shape.paint.stroke = stroke,
            Shape::Image(_) => {}
        }
    }
}
