#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMetrics {
    pub shape_count: usize,
    pub merged_count: usize,
    pub group_count: usize,
    pub text_group_count: usize,
    pub clip_path_count: usize,
    pub image_count: usize,
    pub unresolved_images: usize,
    pub resolve_ms: f64,
    pub serialize_ms: f64,
    pub output_bytes: usize,
}
