use std::collections::HashMap;
use std::sync::Arc;

use crate::escape::TextEscaper;
use crate::matrix::Matrix;
use crate::scene::{ClipStack, SceneItem};
use crate::shape::Shape;
use crate::types::fmt_num;

const XML_HEADER: &str = "<?xml version=\"1.0\" standalone=\"no\"?>";

#[derive(Debug, Default)]
struct ClipRegistry {
    ids: HashMap<String, usize>,
    paths: Vec<String>,
}

impl ClipRegistry {
    fn intern(&mut self, path: &str) -> usize {
        if let Some(id) = self.ids.get(path) {
            return *id;
        }
        let id = self.paths.len();
        self.ids.insert(path.to_string(), id);
        self.paths.push(path.to_string());
        id
    }

    fn intern_all(&mut self, clips: &ClipStack) -> Vec<usize> {
        clips.paths().iter().map(|path| self.intern(path)).collect()
    }

    fn definitions(&self) -> impl Iterator<Item = String> + '_ {
        self.paths
            .iter()
            .enumerate()
            .map(|(id, path)| format!("<clipPath id=\"c{id}\"><path d=\"{path}\" /></clipPath>"))
    }
}

enum GroupKind {
    Transform(Arc<Matrix>),
    Text { frame: Option<Matrix> },
}

struct Group {
    kind: GroupKind,
    begin: String,
    end: &'static str,
    clips: ClipStack,
    clip_ids: Vec<usize>,
    objects: Vec<String>,
}

impl Group {
    fn accepts(&self, matrix: &Arc<Matrix>, clips: &ClipStack) -> bool {
        match &self.kind {
            GroupKind::Transform(own) => Arc::ptr_eq(own, matrix) && self.clips.same(clips),
            GroupKind::Text { .. } => false,
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for id in &self.clip_ids {
            out.push_str(&format!("<g clip-path=\"url(#c{id})\">"));
        }
        out.push_str(&self.begin);
        for object in &self.objects {
            out.push_str(object);
        }
        out.push_str(self.end);
        for _ in &self.clip_ids {
            out.push_str("</g>");
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SerializeStats {
    pub shape_count: usize,
    pub group_count: usize,
    pub text_group_count: usize,
    pub clip_path_count: usize,
    pub image_count: usize,
}

pub(crate) fn serialize_scene(
    width: f64,
    height: f64,
    items: &[SceneItem],
    escaper: &dyn TextEscaper,
) -> (String, SerializeStats) {
    let mut registry = ClipRegistry::default();
    let mut groups: Vec<Group> = Vec::new();
    let mut stats = SerializeStats::default();
    // Index into `groups` of the group shapes may still join.
    let mut open: Option<usize> = None;
    let mut text_run: Option<usize> = None;
    let mut image_clip_seq = 0usize;

    for item in items {
        let shape = match item {
            SceneItem::TextGroupBegin { clips } => {
                let clip_ids = registry.intern_all(clips);
                groups.push(Group {
                    kind: GroupKind::Text { frame: None },
                    begin: "<text>".to_string(),
                    end: "</text>",
                    clips: clips.clone(),
                    clip_ids,
                    objects: Vec::new(),
                });
                stats.text_group_count += 1;
                text_run = Some(groups.len() - 1);
                open = None;
                continue;
            }
            SceneItem::TextGroupEnd => {
                text_run = None;
                open = None;
                continue;
            }
            SceneItem::Shape(shape) => shape,
        };

        stats.shape_count += 1;
        let state = shape.state();
        let clip_ids = registry.intern_all(&state.clips);

        if let (Some(index), Shape::Text(text)) = (text_run, shape) {
            let group = &mut groups[index];
            if let GroupKind::Text { frame } = &mut group.kind {
                let frame = match *frame {
                    Some(frame) => frame,
                    None => {
                        let rotation = state.matrix.average_rotation();
                        group.begin = format!(
                            "<text transform=\"{}\">",
                            Matrix::identity().rotate(rotation).to_transform()
                        );
                        *frame.insert(Matrix::identity().rotate(-rotation))
                    }
                };
                group
                    .objects
                    .push(text.to_tspan_svg(&frame.multiply(&state.matrix), escaper));
            }
            continue;
        }
        // Anything else ends the text run.
        text_run = None;

        let markup = match shape {
            Shape::Path(path) => path.to_svg(),
            Shape::Text(text) => text.to_svg(escaper),
            Shape::Image(image) => {
                stats.image_count += 1;
                if image.source.is_some() {
                    let id = format!("i{image_clip_seq}");
                    image_clip_seq += 1;
                    image.to_svg(Some(&id))
                } else {
                    image.to_svg(None)
                }
            }
        };

        match open {
            Some(index) if groups[index].accepts(&state.matrix, &state.clips) => {
                groups[index].objects.push(markup);
            }
            _ => {
                groups.push(Group {
                    kind: GroupKind::Transform(state.matrix.clone()),
                    begin: format!("<g transform=\"{}\">", state.matrix.to_transform()),
                    end: "</g>",
                    clips: state.clips.clone(),
                    clip_ids,
                    objects: vec![markup],
                });
                open = Some(groups.len() - 1);
            }
        }
    }

    stats.group_count = groups.len();
    stats.clip_path_count = registry.paths.len();

    let mut lines = Vec::with_capacity(groups.len() + registry.paths.len() + 3);
    lines.push(XML_HEADER.to_string());
    lines.push(format!(
        "<svg width=\"{}px\" height=\"{}px\" version=\"1.1\" xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">",
        fmt_num(width),
        fmt_num(height)
    ));
    lines.extend(registry.definitions());
    lines.extend(groups.iter().map(Group::render));
    lines.push("</svg>".to_string());
    (lines.join("\n"), stats)
}
