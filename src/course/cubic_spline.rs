//! Natural cubic spline interpolation
//!
//! One spline per axis, parameterized by cumulative chord length. The
//! tridiagonal coefficient system is assembled and solved with nalgebra.

extern crate nalgebra as na;

use crate::common::{NavError, NavResult};

/// 1D natural cubic spline through (x, y) knots
#[derive(Debug, Clone)]
pub(crate) struct Spline1D {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    x: Vec<f64>,
}

impl Spline1D {
    pub(crate) fn new(x: &[f64], y: &[f64]) -> NavResult<Self> {
        let nx = x.len();
        if nx < 2 || y.len() != nx {
            return Err(NavError::InvalidParameter(
                "spline needs at least two knots with matching lengths".to_string(),
            ));
        }
        let mut h: Vec<f64> = Vec::with_capacity(nx - 1);
        for i in 0..nx - 1 {
            let hi = x[i + 1] - x[i];
            if hi <= 0.0 {
                return Err(NavError::InvalidParameter(
                    "spline knots must be strictly increasing".to_string(),
                ));
            }
            h.push(hi);
        }

        let a = y.to_vec();
        let a_mat = Self::coefficient_matrix(&h);
        let b_vec = Self::rhs_vector(&h, &a);

        let a_inv = a_mat.try_inverse().ok_or_else(|| {
            NavError::InvalidParameter("singular spline coefficient matrix".to_string())
        })?;
        let c_na = a_inv * b_vec;

        let c: Vec<f64> = c_na.iter().copied().collect();
        let mut b: Vec<f64> = Vec::with_capacity(nx - 1);
        let mut d: Vec<f64> = Vec::with_capacity(nx - 1);
        for i in 0..nx - 1 {
            d.push((c[i + 1] - c[i]) / (3.0 * h[i]));
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
        }

        Ok(Spline1D { a, b, c, d, x: x.to_vec() })
    }

    pub(crate) fn value(&self, t: f64) -> f64 {
        let i = self.segment_index(t);
        let dx = t - self.x[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    pub(crate) fn first_derivative(&self, t: f64) -> f64 {
        let i = self.segment_index(t);
        let dx = t - self.x[i];
        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx.powi(2)
    }

    pub(crate) fn second_derivative(&self, t: f64) -> f64 {
        let i = self.segment_index(t);
        let dx = t - self.x[i];
        2.0 * self.c[i] + 6.0 * self.d[i] * dx
    }

    /// Binary search for the segment containing `t`, clamped to the knot range
    fn segment_index(&self, t: f64) -> usize {
        let n = self.x.len();
        if t <= self.x[0] {
            return 0;
        }
        if t >= self.x[n - 1] {
            return n - 2;
        }
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.x[mid] <= t {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    fn coefficient_matrix(h: &[f64]) -> na::DMatrix<f64> {
        let nx = h.len() + 1;
        let mut a = na::DMatrix::zeros(nx, nx);
        a[(0, 0)] = 1.0;
        for i in 0..nx - 1 {
            if i != nx - 2 {
                a[(i + 1, i + 1)] = 2.0 * (h[i] + h[i + 1]);
            }
            a[(i + 1, i)] = h[i];
            a[(i, i + 1)] = h[i];
        }
        a[(0, 1)] = 0.0;
        a[(nx - 1, nx - 2)] = 0.0;
        a[(nx - 1, nx - 1)] = 1.0;
        a
    }

    fn rhs_vector(h: &[f64], a: &[f64]) -> na::DVector<f64> {
        let nx = h.len() + 1;
        let mut b = na::DVector::zeros(nx);
        for i in 0..nx - 2 {
            b[i + 1] =
                3.0 * (a[i + 2] - a[i + 1]) / h[i + 1] - 3.0 * (a[i + 1] - a[i]) / h[i];
        }
        b
    }
}

/// 2D curve built from per-axis cubic splines over cumulative chord length
#[derive(Debug, Clone)]
pub struct CubicSpline2D {
    s: Vec<f64>,
    sx: Spline1D,
    sy: Spline1D,
}

impl CubicSpline2D {
    pub fn new(x: &[f64], y: &[f64]) -> NavResult<Self> {
        let s = Self::chord_lengths(x, y)?;
        let sx = Spline1D::new(&s, x)?;
        let sy = Spline1D::new(&s, y)?;
        Ok(CubicSpline2D { s, sx, sy })
    }

    fn chord_lengths(x: &[f64], y: &[f64]) -> NavResult<Vec<f64>> {
        if x.len() < 2 || x.len() != y.len() {
            return Err(NavError::InvalidParameter(
                "2D spline needs at least two points".to_string(),
            ));
        }
        let mut s = Vec::with_capacity(x.len());
        s.push(0.0);
        for i in 0..x.len() - 1 {
            let ds = ((x[i + 1] - x[i]).powi(2) + (y[i + 1] - y[i]).powi(2)).sqrt();
            s.push(s[i] + ds);
        }
        Ok(s)
    }

    pub fn total_length(&self) -> f64 {
        *self.s.last().unwrap_or(&0.0)
    }

    pub fn position(&self, s: f64) -> (f64, f64) {
        (self.sx.value(s), self.sy.value(s))
    }

    pub fn yaw(&self, s: f64) -> f64 {
        self.sy.first_derivative(s).atan2(self.sx.first_derivative(s))
    }

    pub fn curvature(&self, s: f64) -> f64 {
        let dx = self.sx.first_derivative(s);
        let ddx = self.sx.second_derivative(s);
        let dy = self.sy.first_derivative(s);
        let ddy = self.sy.second_derivative(s);
        (ddy * dx - ddx * dy) / (dx.powi(2) + dy.powi(2)).powf(1.5)
    }
}
