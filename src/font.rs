use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::error::SvgCanvasError;
use crate::types::{FontSpec, TextMetrics};

pub trait FontMetricsProvider: Send + Sync {
    fn measure_text(&self, font: &FontSpec, text: &str) -> TextMetrics;
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    font_index: usize,
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, f64>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &TextWidthKey) -> Option<f64> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: f64) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

#[derive(Debug)]
struct RegisteredFont {
    data: Vec<u8>,
    units_per_em: f64,
    ascender: f64,
    descender: f64,
}

#[derive(Debug)]
pub struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    lookup: HashMap<String, usize>,
    text_width_cache: Mutex<TextWidthCache>,
}

const FALLBACK_ADVANCE_EM: f64 = 0.6;
const FALLBACK_ASCENT_EM: f64 = 0.8;
const FALLBACK_DESCENT_EM: f64 = 0.2;

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
            text_width_cache: Mutex::new(TextWidthCache::new(20_000)),
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn register_dir(&mut self, path: impl AsRef<Path>) {
        let Ok(entries) = fs::read_dir(path.as_ref()) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                self.register_file(path);
            }
        }
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
            return;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" {
            return;
        }
        let Ok(data) = fs::read(path) else {
            return;
        };
        let stem = path.file_stem().and_then(|v| v.to_str()).map(str::to_string);
        let _ = self.register_bytes(data, stem);
    }

    pub fn register_bytes(
        &mut self,
        data: Vec<u8>,
        source_name: Option<String>,
    ) -> Result<String, SvgCanvasError> {
        let source = source_name.unwrap_or_else(|| "EmbeddedFont".to_string());
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(SvgCanvasError::InvalidConfiguration(format!(
                "invalid font data for {source}"
            )));
        };
        let names = font_names(&face, source);
        let units_per_em = face.units_per_em().max(1) as f64;
        let ascender = face.ascender() as f64;
        let descender = face.descender() as f64;

        let index = self.fonts.len();
        self.fonts.push(RegisteredFont {
            data,
            units_per_em,
            ascender,
            descender,
        });
        for name in &names {
            let key = normalize_name(name);
            if key.is_empty() || self.lookup.contains_key(&key) {
                continue;
            }
            self.lookup.insert(key, index);
        }
        Ok(names.into_iter().next().unwrap_or_default())
    }

    fn resolve(&self, family: &str) -> Option<usize> {
        family
            .split(',')
            .map(normalize_name)
            .find_map(|key| self.lookup.get(&key).copied())
    }

    fn measure_width(&self, index: usize, font: &FontSpec, text: &str) -> f64 {
        let key = TextWidthKey {
            font_index: index,
            size_milli: (font.size * 1000.0).round() as i64,
            text: text.to_string(),
        };
        if let Ok(cache) = self.text_width_cache.lock() {
            if let Some(value) = cache.get(&key) {
                return value;
            }
        }
        let registered = &self.fonts[index];
        let Ok(face) = ttf_parser::Face::parse(&registered.data, 0) else {
            return fallback_width(font, text);
        };
        let mut units = 0.0;
        for ch in text.chars() {
            let advance = face
                .glyph_index(ch)
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map(|adv| adv as f64)
                .unwrap_or(registered.units_per_em * FALLBACK_ADVANCE_EM);
            units += advance;
        }
        let value = units * font.size / registered.units_per_em;
        if let Ok(mut cache) = self.text_width_cache.lock() {
            cache.insert(key, value);
        }
        value
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontMetricsProvider for FontRegistry {
    fn measure_text(&self, font: &FontSpec, text: &str) -> TextMetrics {
        let Some(index) = self.resolve(&font.family) else {
            return TextMetrics {
                width: fallback_width(font, text),
                ascent: font.size * FALLBACK_ASCENT_EM,
                descent: font.size * FALLBACK_DESCENT_EM,
            };
        };
        let registered = &self.fonts[index];
        TextMetrics {
            width: self.measure_width(index, font, text),
            ascent: registered.ascender * font.size / registered.units_per_em,
            descent: -registered.descender * font.size / registered.units_per_em,
        }
    }
}

fn fallback_width(font: &FontSpec, text: &str) -> f64 {
    font.size * FALLBACK_ADVANCE_EM * text.chars().count() as f64
}

fn font_names(face: &ttf_parser::Face<'_>, source: String) -> Vec<String> {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;
    let mut post = None;
    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        match entry.name_id {
            name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => {
                if family.is_none() {
                    family = Some(name);
                }
            }
            name_id::FULL_NAME => {
                if full.is_none() {
                    full = Some(name);
                }
            }
            name_id::POST_SCRIPT_NAME => {
                if post.is_none() {
                    post = Some(name);
                }
            }
            _ => {}
        }
    }

    let mut names = Vec::new();
    for candidate in [family, full, post, Some(source)].into_iter().flatten() {
        if !names.contains(&candidate) {
            names.push(candidate);
        }
    }
    names
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}
