// Half-way cases go towards positive infinity so clip strings compare stably.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

pub fn fmt_num(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub(crate) fn to_path_coords(self) -> String {
        format!("{},{}", fmt_num(round2(self.x)), fmt_num(round2(self.y)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "butt" => Some(LineCap::Butt),
            "round" => Some(LineCap::Round),
            "square" => Some(LineCap::Square),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineJoin::Miter => "miter",
            LineJoin::Round => "round",
            LineJoin::Bevel => "bevel",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "miter" => Some(LineJoin::Miter),
            "round" => Some(LineJoin::Round),
            "bevel" => Some(LineJoin::Bevel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Left,
    Right,
    Center,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Start => "start",
            TextAlign::End => "end",
            TextAlign::Left => "left",
            TextAlign::Right => "right",
            TextAlign::Center => "center",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "start" => Some(TextAlign::Start),
            "end" => Some(TextAlign::End),
            "left" => Some(TextAlign::Left),
            "right" => Some(TextAlign::Right),
            "center" => Some(TextAlign::Center),
            _ => None,
        }
    }

    pub fn text_anchor(&self) -> &'static str {
        match self {
            TextAlign::Start | TextAlign::Left => "start",
            TextAlign::End | TextAlign::Right => "end",
            TextAlign::Center => "middle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    Top,
    Hanging,
    Middle,
    #[default]
    Alphabetic,
    Ideographic,
    Bottom,
}

impl TextBaseline {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextBaseline::Top => "top",
            TextBaseline::Hanging => "hanging",
            TextBaseline::Middle => "middle",
            TextBaseline::Alphabetic => "alphabetic",
            TextBaseline::Ideographic => "ideographic",
            TextBaseline::Bottom => "bottom",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top" => Some(TextBaseline::Top),
            "hanging" => Some(TextBaseline::Hanging),
            "middle" => Some(TextBaseline::Middle),
            "alphabetic" => Some(TextBaseline::Alphabetic),
            "ideographic" => Some(TextBaseline::Ideographic),
            "bottom" => Some(TextBaseline::Bottom),
            _ => None,
        }
    }

    pub fn dominant_baseline(&self) -> &'static str {
        match self {
            TextBaseline::Top => "text-before-edge",
            TextBaseline::Middle => "central",
            TextBaseline::Bottom => "text-after-edge",
            other => other.as_str(),
        }
    }
}

const DEFAULT_FONT_SIZE: f64 = 10.0;
const DEFAULT_FONT_FAMILY: &str = "sans-serif";

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub size: f64,
    pub family: String,
    pub style: Option<String>,
    pub weight: Option<String>,
}

impl FontSpec {
    pub fn parse(raw: &str) -> Self {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let size_index = tokens.iter().position(|token| is_size_token(token));
        let Some(size_index) = size_index else {
            return Self {
                size: DEFAULT_FONT_SIZE,
                family: if raw.trim().is_empty() {
                    DEFAULT_FONT_FAMILY.to_string()
                } else {
                    raw.trim().to_string()
                },
                style: None,
                weight: None,
            };
        };

        let mut style = None;
        let mut weight = None;
        for token in &tokens[..size_index] {
            classify_modifier(token, &mut style, &mut weight);
        }

        let mut rest: Vec<&str> = tokens[size_index + 1..].to_vec();
        // Trailing style keyword, e.g. "10px Arial italic".
        if rest.len() > 1 {
            if let Some(last) = rest.last() {
                if is_style_keyword(last) {
                    style = Some(last.to_ascii_lowercase());
                    rest.pop();
                }
            }
        }
        let family = if rest.is_empty() {
            DEFAULT_FONT_FAMILY.to_string()
        } else {
            rest.join(" ")
        };

        Self {
            size: parse_leading_number(tokens[size_index]).unwrap_or(DEFAULT_FONT_SIZE),
            family,
            style,
            weight,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            size: DEFAULT_FONT_SIZE,
            family: DEFAULT_FONT_FAMILY.to_string(),
            style: None,
            weight: None,
        }
    }
}

fn is_size_token(token: &str) -> bool {
    let starts_numeric = token
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_digit() || ch == '.');
    starts_numeric && !token.chars().all(|ch| ch.is_ascii_digit())
}

fn is_style_keyword(token: &str) -> bool {
    matches!(
        token.to_ascii_lowercase().as_str(),
        "italic" | "oblique" | "normal"
    )
}

fn classify_modifier(token: &str, style: &mut Option<String>, weight: &mut Option<String>) {
    let lower = token.to_ascii_lowercase();
    match lower.as_str() {
        "italic" | "oblique" => *style = Some(lower),
        "bold" | "bolder" | "lighter" => *weight = Some(lower),
        _ if lower.chars().all(|ch| ch.is_ascii_digit()) => *weight = Some(lower),
        _ => {}
    }
}

fn parse_leading_number(token: &str) -> Option<f64> {
    let end = token
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_digit() || *ch == '.'))
        .map(|(idx, _)| idx)
        .unwrap_or(token.len());
    token[..end].parse::<f64>().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f64,
    pub ascent: f64,
    pub descent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_numbers_like_markup_expects() {
        assert_eq!(fmt_num(10.0), "10");
        assert_eq!(fmt_num(-0.0), "0");
        assert_eq!(fmt_num(0.25), "0.25");
        assert_eq!(fmt_num(-3.5), "-3.5");
    }

    #[test]
    fn rounds_half_way_towards_positive_infinity() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(-1.125), -1.12);
        assert_eq!(round2(1.125), 1.13);
        assert_eq!(round2(0.1 + 0.2), 0.3);
        assert_eq!(Point::new(-0.001, 2.0).to_path_coords(), "0,2");
    }

    #[test]
    fn parses_default_canvas_font() {
        let font = FontSpec::parse("10px sans-serif");
        assert_eq!(font.size, 10.0);
        assert_eq!(font.family, "sans-serif");
        assert_eq!(font.style, None);
    }

    #[test]
    fn parses_style_and_weight_modifiers() {
        let font = FontSpec::parse("italic 700 12.5px Times New Roman");
        assert_eq!(font.size, 12.5);
        assert_eq!(font.family, "Times New Roman");
        assert_eq!(font.style.as_deref(), Some("italic"));
        assert_eq!(font.weight.as_deref(), Some("700"));

        let trailing = FontSpec::parse("14px Arial italic");
        assert_eq!(trailing.family, "Arial");
        assert_eq!(trailing.style.as_deref(), Some("italic"));
    }

    #[test]
    fn font_without_size_falls_back_to_defaults() {
        let font = FontSpec::parse("serif");
        assert_eq!(font.size, 10.0);
        assert_eq!(font.family, "serif");
    }

    #[test]
    fn text_attribute_conversions() {
        assert_eq!(TextAlign::Center.text_anchor(), "middle");
        assert_eq!(TextAlign::Right.text_anchor(), "end");
        assert_eq!(TextBaseline::Top.dominant_baseline(), "text-before-edge");
        assert_eq!(TextBaseline::Hanging.dominant_baseline(), "hanging");
        assert_eq!(LineJoin::from_str(" Bevel "), Some(LineJoin::Bevel));
        assert_eq!(LineCap::from_str("wide"), None);
    }
}
