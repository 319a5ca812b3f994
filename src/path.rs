use std::f64::consts::PI;

use crate::matrix::Matrix;
use crate::types::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    segments: Vec<PathSegment>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn move_to(&mut self, matrix: &Matrix, x: f64, y: f64) {
        self.segments
            .push(PathSegment::MoveTo(matrix.convert(Point::new(x, y))));
    }

    pub fn line_to(&mut self, matrix: &Matrix, x: f64, y: f64) {
        self.segments
            .push(PathSegment::LineTo(matrix.convert(Point::new(x, y))));
    }

    pub fn quadratic_curve_to(&mut self, matrix: &Matrix, cx: f64, cy: f64, x: f64, y: f64) {
        self.segments.push(PathSegment::QuadTo(
            matrix.convert(Point::new(cx, cy)),
            matrix.convert(Point::new(x, y)),
        ));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn bezier_curve_to(
        &mut self,
        matrix: &Matrix,
        c1x: f64,
        c1y: f64,
        c2x: f64,
        c2y: f64,
        x: f64,
        y: f64,
    ) {
        self.segments.push(PathSegment::CubicTo(
            matrix.convert(Point::new(c1x, c1y)),
            matrix.convert(Point::new(c2x, c2y)),
            matrix.convert(Point::new(x, y)),
        ));
    }

    pub fn close_path(&mut self) {
        self.segments.push(PathSegment::Close);
    }

    pub fn rect(&mut self, matrix: &Matrix, x: f64, y: f64, w: f64, h: f64) {
        self.move_to(matrix, x, y);
        self.line_to(matrix, x + w, y);
        self.line_to(matrix, x + w, y + h);
        self.line_to(matrix, x, y + h);
        self.close_path();
    }

    // Six quadratic segments per half turn regardless of radius.
    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &mut self,
        matrix: &Matrix,
        cx: f64,
        cy: f64,
        r: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) {
        let (th1, th2) = normalize_sweep(start, end, anticlockwise);
        let steps = (((th2 - th1).abs() * 6.0 / PI).ceil()) as usize;
        for i in 0..steps {
            let t1 = th1 + (th2 - th1) * i as f64 / steps as f64;
            let t2 = th1 + (th2 - th1) * (i + 1) as f64 / steps as f64;
            let end_point = Point::new(cx + r * libm::cos(t2), cy + r * libm::sin(t2));
            let mid_angle = (t1 + t2) / 2.0;
            let control_radius = r / libm::cos((t2 - t1) / 2.0);
            let control = Point::new(
                cx + control_radius * libm::cos(mid_angle),
                cy + control_radius * libm::sin(mid_angle),
            );
            if i == 0 {
                let first = matrix.convert(Point::new(
                    cx + r * libm::cos(t1),
                    cy + r * libm::sin(t1),
                ));
                if self.is_empty() {
                    self.segments.push(PathSegment::MoveTo(first));
                } else {
                    self.segments.push(PathSegment::LineTo(first));
                }
            }
            self.quadratic_curve_to(matrix, control.x, control.y, end_point.x, end_point.y);
        }
    }

    pub fn to_device_space_path(&self) -> String {
        self.render(|p| p)
    }

    pub fn to_user_space_path(&self, matrix: &Matrix) -> String {
        self.render(|p| matrix.reverse_convert(p))
    }

    fn render(&self, map: impl Fn(Point) -> Point) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                PathSegment::MoveTo(p) => {
                    out.push('M');
                    out.push_str(&map(*p).to_path_coords());
                }
                PathSegment::LineTo(p) => {
                    out.push('L');
                    out.push_str(&map(*p).to_path_coords());
                }
                PathSegment::QuadTo(c, p) => {
                    out.push('Q');
                    out.push_str(&map(*c).to_path_coords());
                    out.push(',');
                    out.push_str(&map(*p).to_path_coords());
                }
                PathSegment::CubicTo(c1, c2, p) => {
                    out.push('C');
                    out.push_str(&map(*c1).to_path_coords());
                    out.push(',');
                    out.push_str(&map(*c2).to_path_coords());
                    out.push(',');
                    out.push_str(&map(*p).to_path_coords());
                }
                PathSegment::Close => out.push('z'),
            }
        }
        out
    }
}

pub fn rect_path(x: f64, y: f64, w: f64, h: f64) -> String {
    let corners = [
        Point::new(x, y),
        Point::new(x + w, y),
        Point::new(x + w, y + h),
        Point::new(x, y + h),
    ];
    let mut out = String::new();
    for (idx, corner) in corners.iter().enumerate() {
        out.push(if idx == 0 { 'M' } else { 'L' });
        out.push_str(&corner.to_path_coords());
    }
    out.push('z');
    out
}

fn normalize_sweep(start: f64, mut end: f64, anticlockwise: bool) -> (f64, f64) {
    let turn = 2.0 * PI;
    if anticlockwise {
        if start < end {
            end -= ((end - start) / turn).ceil() * turn;
        }
        if end <= start - turn {
            end = start - turn;
        }
    } else {
        if end < start {
            end += ((start - end) / turn).ceil() * turn;
        }
        if end >= start + turn {
            end = start + turn;
        }
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn quad_point(p0: Point, c: Point, p1: Point, t: f64) -> Point {
        let u = 1.0 - t;
        Point::new(
            u * u * p0.x + 2.0 * u * t * c.x + t * t * p1.x,
            u * u * p0.y + 2.0 * u * t * c.y + t * t * p1.y,
        )
    }

    #[test]
    fn triangle_renders_in_both_spaces_on_identity() {
        let m = Matrix::identity();
        let mut path = PathBuilder::new();
        path.move_to(&m, 0.0, 0.0);
        path.line_to(&m, 10.0, 0.0);
        path.line_to(&m, 10.0, 10.0);
        path.close_path();
        assert_eq!(path.to_device_space_path(), "M0,0L10,0L10,10z");
        assert_eq!(path.to_user_space_path(&m), "M0,0L10,0L10,10z");
    }

    #[test]
    fn device_space_bakes_transform_and_user_space_removes_it() {
        let m = Matrix::identity().translate(5.0, 5.0).scale(2.0, 2.0);
        let mut path = PathBuilder::new();
        path.rect(&m, 1.0, 1.0, 2.0, 3.0);
        assert_eq!(path.to_device_space_path(), "M7,7L11,7L11,13L7,13z");
        assert_eq!(path.to_user_space_path(&m), "M1,1L3,1L3,4L1,4z");
    }

    #[test]
    fn curves_separate_points_with_commas() {
        let m = Matrix::identity();
        let mut path = PathBuilder::new();
        path.move_to(&m, 0.0, 0.0);
        path.quadratic_curve_to(&m, 1.0, 2.0, 3.0, 4.0);
        path.bezier_curve_to(&m, 5.0, 6.0, 7.0, 8.0, 9.005, 10.0);
        assert_eq!(path.to_device_space_path(), "M0,0Q1,2,3,4C5,6,7,8,9.01,10");
    }

    #[test]
    fn rect_path_matches_builder_rect() {
        let m = Matrix::identity();
        let mut path = PathBuilder::new();
        path.rect(&m, 0.0, 0.0, 2.0, 2.0);
        assert_eq!(rect_path(0.0, 0.0, 2.0, 2.0), path.to_user_space_path(&m));
        assert_eq!(rect_path(0.0, 0.0, 2.0, 2.0), "M0,0L2,0L2,2L0,2z");
    }

    #[test]
    fn quarter_arc_stays_close_to_circle() {
        let r = 100.0;
        let mut path = PathBuilder::new();
        path.arc(&Matrix::identity(), 0.0, 0.0, r, 0.0, FRAC_PI_2, false);
        let segments = path.segments();
        assert_eq!(segments.len(), 4);
        let PathSegment::MoveTo(mut current) = segments[0] else {
            panic!("arc on an empty path must start with a move");
        };
        assert!((current.x - r).abs() < 1e-9 && current.y.abs() < 1e-9);

        let mut max_error: f64 = 0.0;
        for segment in &segments[1..] {
            let PathSegment::QuadTo(control, end) = *segment else {
                panic!("arc must be made of quadratic segments");
            };
            for step in 0..=20 {
                let p = quad_point(current, control, end, step as f64 / 20.0);
                let error = (p.x.hypot(p.y) - r).abs();
                max_error = max_error.max(error);
            }
            current = end;
        }
        assert!(max_error < r * 0.005, "max error {max_error}");
        assert!(current.x.abs() < 1e-9 && (current.y - r).abs() < 1e-9);
    }

    #[test]
    fn arc_mid_path_continues_with_line() {
        let m = Matrix::identity();
        let mut path = PathBuilder::new();
        path.move_to(&m, 0.0, 0.0);
        path.arc(&m, 0.0, 0.0, 10.0, 0.0, PI, false);
        assert!(matches!(path.segments()[1], PathSegment::LineTo(_)));
        assert_eq!(path.segments().len(), 2 + 6);
    }

    #[test]
    fn sweep_normalization_respects_direction() {
        let (s, e) = normalize_sweep(0.0, FRAC_PI_2, true);
        assert_eq!(s, 0.0);
        assert!((e - (FRAC_PI_2 - 2.0 * PI)).abs() < 1e-12);

        let (_, e) = normalize_sweep(0.0, -FRAC_PI_2, false);
        assert!((e - (2.0 * PI - FRAC_PI_2)).abs() < 1e-12);

        let (_, e) = normalize_sweep(0.0, 10.0 * PI, false);
        assert_eq!(e, 2.0 * PI);

        let (_, e) = normalize_sweep(1.0, -20.0, true);
        assert_eq!(e, 1.0 - 2.0 * PI);
    }

    #[test]
    fn full_circle_uses_twelve_segments() {
        let mut path = PathBuilder::new();
        path.arc(&Matrix::identity(), 5.0, 5.0, 1.0, 0.0, 2.0 * PI, false);
        assert_eq!(path.segments().len(), 13);
    }
}
