use crate::types::{Point, fmt_num};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub xx: f64,
    pub xy: f64,
    pub yx: f64,
    pub yy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        xx: 1.0,
        xy: 0.0,
        yx: 0.0,
        yy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(xx: f64, xy: f64, yx: f64, yy: f64, tx: f64, ty: f64) -> Self {
        Self {
            xx,
            xy,
            yx,
            yy,
            tx,
            ty,
        }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        Self {
            xx: self.xx * sx,
            xy: self.xy * sy,
            yx: self.yx * sx,
            yy: self.yy * sy,
            tx: self.tx,
            ty: self.ty,
        }
    }

    pub fn translate(&self, tx: f64, ty: f64) -> Self {
        Self {
            xx: self.xx,
            xy: self.xy,
            yx: self.yx,
            yy: self.yy,
            tx: self.tx + tx * self.xx + ty * self.xy,
            ty: self.ty + tx * self.yx + ty * self.yy,
        }
    }

    pub fn rotate(&self, theta: f64) -> Self {
        let cos = libm::cos(theta);
        let sin = libm::sin(theta);
        Self {
            xx: self.xx * cos + self.xy * sin,
            xy: -self.xx * sin + self.xy * cos,
            yx: self.yx * cos + self.yy * sin,
            yy: -self.yx * sin + self.yy * cos,
            tx: self.tx,
            ty: self.ty,
        }
    }

    pub fn multiply(&self, other: &Matrix) -> Self {
        Self {
            xx: self.xx * other.xx + self.xy * other.yx,
            xy: self.xx * other.xy + self.xy * other.yy,
            yx: self.yx * other.xx + self.yy * other.yx,
            yy: self.yx * other.xy + self.yy * other.yy,
            tx: self.xx * other.tx + self.xy * other.ty + self.tx,
            ty: self.yx * other.tx + self.yy * other.ty + self.ty,
        }
    }

    pub fn convert(&self, point: Point) -> Point {
        Point {
            x: point.x * self.xx + point.y * self.xy + self.tx,
            y: point.x * self.yx + point.y * self.yy + self.ty,
        }
    }

    // A singular linear part yields non-finite coordinates.
    pub fn reverse_convert(&self, point: Point) -> Point {
        let d = self.determinant();
        let x = point.x - self.tx;
        let y = point.y - self.ty;
        Point {
            x: (self.yy * x - self.xy * y) / d,
            y: (-self.yx * x + self.xx * y) / d,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.xy * self.yx
    }

    pub fn average_scale(&self) -> f64 {
        let sum = self.xx * self.xx + self.xy * self.xy + self.yx * self.yx + self.yy * self.yy;
        libm::sqrt(sum) / std::f64::consts::SQRT_2
    }

    pub fn average_rotation(&self) -> f64 {
        libm::atan2(self.yx, self.xx)
    }

    pub fn to_transform(&self) -> String {
        format!(
            "matrix({},{},{},{},{},{})",
            fmt_num(self.xx),
            fmt_num(self.yx),
            fmt_num(self.xy),
            fmt_num(self.yy),
            fmt_num(self.tx),
            fmt_num(self.ty)
        )
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    fn sample_matrices() -> Vec<Matrix> {
        vec![
            Matrix::identity(),
            Matrix::identity().translate(3.0, -4.0),
            Matrix::identity().scale(2.0, 0.5).rotate(0.7),
            Matrix::new(1.5, -0.3, 0.8, 2.2, 10.0, -7.5),
            Matrix::identity().rotate(PI / 3.0).translate(5.0, 5.0).scale(-1.0, 3.0),
        ]
    }

    fn sample_points() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 2.0),
            Point::new(-13.25, 7.5),
            Point::new(1000.0, -0.001),
        ]
    }

    #[test]
    fn translate_happens_in_local_frame() {
        for m in sample_matrices() {
            for p in sample_points() {
                let moved = m.translate(4.0, -2.5).convert(p);
                let expected = m.convert(Point::new(p.x + 4.0, p.y - 2.5));
                assert!(close(moved, expected), "{m:?} {p:?}");
            }
        }
    }

    #[test]
    fn scale_and_rotate_happen_in_local_frame() {
        for m in sample_matrices() {
            for p in sample_points() {
                let scaled = m.scale(2.0, -3.0).convert(p);
                assert!(close(scaled, m.convert(Point::new(p.x * 2.0, p.y * -3.0))));

                let theta = 0.4;
                let rotated = m.rotate(theta).convert(p);
                let local = Point::new(
                    p.x * theta.cos() - p.y * theta.sin(),
                    p.x * theta.sin() + p.y * theta.cos(),
                );
                assert!(close(rotated, m.convert(local)));
            }
        }
    }

    #[test]
    fn multiply_nests_other_inside_self() {
        let outer = Matrix::identity().rotate(0.3).translate(2.0, 1.0);
        let inner = Matrix::new(2.0, 0.5, -0.25, 1.0, 4.0, -3.0);
        for p in sample_points() {
            let composed = outer.multiply(&inner).convert(p);
            assert!(close(composed, outer.convert(inner.convert(p))));
        }
    }

    #[test]
    fn reverse_convert_round_trips() {
        for m in sample_matrices() {
            assert!(m.determinant() != 0.0);
            for p in sample_points() {
                assert!(close(m.reverse_convert(m.convert(p)), p), "{m:?} {p:?}");
            }
        }
    }

    #[test]
    fn singular_matrix_produces_non_finite_points() {
        let m = Matrix::identity().scale(0.0, 1.0);
        let p = m.reverse_convert(Point::new(1.0, 1.0));
        assert!(!p.x.is_finite() || !p.y.is_finite());
    }

    #[test]
    fn average_scale_and_rotation() {
        let m = Matrix::identity().scale(3.0, 3.0).rotate(FRAC_PI_2);
        assert!((m.average_scale() - 3.0).abs() < 1e-12);
        assert!((m.average_rotation() - FRAC_PI_2).abs() < 1e-12);

        let skewed = Matrix::identity().scale(1.0, 7.0);
        assert!((skewed.average_scale() - 5.0).abs() < 1e-12);
        assert_eq!(skewed.average_rotation(), 0.0);
    }

    #[test]
    fn transform_attribute_uses_svg_order() {
        let m = Matrix::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(m.to_transform(), "matrix(1,3,2,4,5,6)");
        assert_eq!(
            Matrix::identity().translate(5.0, 5.0).to_transform(),
            "matrix(1,0,0,1,5,5)"
        );
    }
}
