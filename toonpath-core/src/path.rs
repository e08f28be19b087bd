//! Interpolating Catmull-Rom curves through a fixed list of control points.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;

/// Knot spacing of the Catmull-Rom spline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    /// Alpha 0.5. No cusps or self-intersections within a segment.
    #[default]
    Centripetal,
    /// Alpha 1.
    Chordal,
    /// Uniform knots with an explicit tension.
    CatmullRom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathOptions {
    pub closed: bool,
    pub curve: CurveType,
    /// Only used by [`CurveType::CatmullRom`].
    pub tension: f32,
    /// Sample by arc length so equal progress steps cover equal distance.
    pub constant_speed: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self { closed: false, curve: CurveType::Centripetal, tension: 0.5, constant_speed: false }
    }
}

const ARC_DIVISIONS: usize = 200;
const DEGENERATE_TANGENT: f32 = 1e-6;
pub const MAX_COORDINATE: f32 = 1e18;

#[derive(Debug, Clone, PartialEq)]
pub struct ControlPath {
    points: Vec<Vec3>,
    options: PathOptions,
    /// Cumulative chord lengths at `i / ARC_DIVISIONS`, present when sampling by arc length.
    arc_lengths: Option<Vec<f32>>,
}

impl ControlPath {
    /// Open centripetal path.
    pub fn new(points: &[Vec3]) -> Result<Self, ConstructionError> {
        Self::with_options(points, PathOptions::default())
    }

    pub fn with_options(points: &[Vec3], options: PathOptions) -> Result<Self, ConstructionError> {
        if points.len() < 2 {
            return Err(ConstructionError::TooFewPoints(points.len()));
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(ConstructionError::NonFinitePoint { index });
        }
        // squared knot distances must stay finite in f32
        if let Some(index) = points.iter().position(|p| p.abs().max_element() > MAX_COORDINATE) {
            return Err(ConstructionError::PointOutOfRange { index });
        }
        if !options.tension.is_finite() {
            return Err(ConstructionError::InvalidTension(options.tension));
        }
        let mut path = Self { points: points.to_vec(), options, arc_lengths: None };
        if options.constant_speed {
            path.arc_lengths = Some(path.measure());
        }
        Ok(path)
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn options(&self) -> PathOptions {
        self.options
    }

    pub fn is_closed(&self) -> bool {
        self.options.closed
    }

    /// Approximate length, summed over short chords.
    pub fn length(&self) -> f32 {
        match &self.arc_lengths {
            Some(table) => table.last().copied().unwrap_or(0.0),
            None => self.measure().last().copied().unwrap_or(0.0),
        }
    }

    /// Position at progress `p`, clamped to `[0, 1]`.
    ///
    /// `p = 0` is exactly the first control point. `p = 1` is exactly the last one
    /// for open paths and the first one again for closed paths.
    pub fn sample(&self, p: f32) -> Vec3 {
        let u = self.curve_parameter(p);
        let segment = self.locate(u);
        if segment.weight == 0.0 {
            return segment.p1;
        }
        if segment.weight == 1.0 {
            return segment.p2;
        }
        segment.eval(self.options, segment.weight)
    }

    /// Unit tangent at progress `p`, or `None` where the curve does not move.
    ///
    /// At the ends this is the one-sided derivative of the first/last segment.
    pub fn tangent(&self, p: f32) -> Option<Vec3> {
        let u = self.curve_parameter(p);
        let segment = self.locate(u);
        let derivative = segment.derivative(self.options, segment.weight);
        let length = derivative.length();
        if !length.is_finite() || length < DEGENERATE_TANGENT {
            return None;
        }
        Some(derivative / length)
    }

    fn segment_count(&self) -> usize {
        if self.options.closed {
            self.points.len()
        } else {
            self.points.len() - 1
        }
    }

    fn curve_parameter(&self, p: f32) -> f32 {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        match &self.arc_lengths {
            Some(table) if p > 0.0 && p < 1.0 => reparameterize(table, p),
            _ => p,
        }
    }

    fn measure(&self) -> Vec<f32> {
        let mut table = Vec::with_capacity(ARC_DIVISIONS + 1);
        let mut total = 0.0;
        let mut last = self.raw_point(0.0);
        table.push(0.0);
        for i in 1..=ARC_DIVISIONS {
            let current = self.raw_point(i as f32 / ARC_DIVISIONS as f32);
            total += current.distance(last);
            table.push(total);
            last = current;
        }
        table
    }

    fn raw_point(&self, u: f32) -> Vec3 {
        let segment = self.locate(u);
        segment.eval(self.options, segment.weight)
    }

    fn locate(&self, u: f32) -> Segment {
        let n = self.points.len();
        let closed = self.options.closed;
        let scaled = self.segment_count() as f32 * u;
        let mut index = scaled.floor() as usize;
        let mut weight = scaled - index as f32;
        if !closed && index >= n - 1 {
            index = n - 2;
            weight = 1.0;
        }
        let at = |i: usize| self.points[i % n];
        let p0 = if closed || index > 0 { at(index + n - 1) } else { 2.0 * self.points[0] - self.points[1] };
        let p3 = if closed || index + 2 < n { at(index + 2) } else { 2.0 * self.points[n - 1] - self.points[n - 2] };
        Segment { p0, p1: at(index), p2: at(index + 1), p3, weight, scale: self.segment_count() as f32 }
    }
}

/// Map an arc-length fraction to the curve parameter with the same travelled distance.
fn reparameterize(table: &[f32], fraction: f32) -> f32 {
    let total = table.last().copied().unwrap_or(0.0);
    if total <= 0.0 {
        return fraction;
    }
    let target = fraction * total;
    let upper = table.partition_point(|len| *len < target).clamp(1, table.len() - 1);
    let lower = upper - 1;
    let span = table[upper] - table[lower];
    let local = if span > 0.0 { (target - table[lower]) / span } else { 0.0 };
    (lower as f32 + local) / (table.len() - 1) as f32
}

struct Segment {
    p0: Vec3,
    p1: Vec3,
    p2: Vec3,
    p3: Vec3,
    weight: f32,
    /// d(segment parameter)/d(curve parameter).
    scale: f32,
}

impl Segment {
    /// Hermite coefficients `c0 + c1 t + c2 t^2 + c3 t^3` between p1 and p2.
    fn coefficients(&self, options: PathOptions) -> [Vec3; 4] {
        let (t1, t2) = match options.curve {
            CurveType::CatmullRom => (options.tension * (self.p2 - self.p0), options.tension * (self.p3 - self.p1)),
            CurveType::Centripetal | CurveType::Chordal => {
                let exponent = if options.curve == CurveType::Centripetal { 0.25 } else { 0.5 };
                let knot = |a: Vec3, b: Vec3| a.distance_squared(b).powf(exponent);
                let mut dt1 = knot(self.p1, self.p2);
                let mut dt0 = knot(self.p0, self.p1);
                let mut dt2 = knot(self.p2, self.p3);
                if dt1 < 1e-4 {
                    dt1 = 1.0;
                }
                if dt0 < 1e-4 {
                    dt0 = dt1;
                }
                if dt2 < 1e-4 {
                    dt2 = dt1;
                }
                let t1 = (self.p1 - self.p0) / dt0 - (self.p2 - self.p0) / (dt0 + dt1) + (self.p2 - self.p1) / dt1;
                let t2 = (self.p2 - self.p1) / dt1 - (self.p3 - self.p1) / (dt1 + dt2) + (self.p3 - self.p2) / dt2;
                (t1 * dt1, t2 * dt1)
            }
        };
        let x0 = self.p1;
        let x1 = self.p2;
        [x0, t1, -3.0 * x0 + 3.0 * x1 - 2.0 * t1 - t2, 2.0 * x0 - 2.0 * x1 + t1 + t2]
    }

    fn eval(&self, options: PathOptions, t: f32) -> Vec3 {
        let [c0, c1, c2, c3] = self.coefficients(options);
        c0 + t * (c1 + t * (c2 + t * c3))
    }

    fn derivative(&self, options: PathOptions, t: f32) -> Vec3 {
        let [_, c1, c2, c3] = self.coefficients(options);
        (c1 + t * (2.0 * c2 + 3.0 * t * c3)) * self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courier() -> Vec<Vec3> {
        vec![Vec3::new(0.0, 0.5, -4.0), Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.5, 0.5, 2.5)]
    }

    #[test]
    fn endpoints_are_exact() {
        for curve in [CurveType::Centripetal, CurveType::Chordal, CurveType::CatmullRom] {
            for constant_speed in [false, true] {
                let options = PathOptions { curve, constant_speed, ..PathOptions::default() };
                let path = ControlPath::with_options(&courier(), options).unwrap();
                assert_eq!(path.sample(0.0), courier()[0]);
                assert_eq!(path.sample(1.0), courier()[2]);
            }
        }
    }

    #[test]
    fn interior_knots_are_interpolated() {
        let path = ControlPath::new(&courier()).unwrap();
        assert_eq!(path.sample(0.5), courier()[1]);
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let path = ControlPath::new(&courier()).unwrap();
        assert_eq!(path.sample(-3.0), courier()[0]);
        assert_eq!(path.sample(7.0), courier()[2]);
        assert_eq!(path.sample(f32::NAN), courier()[0]);
    }

    #[test]
    fn boundary_tangents_are_finite_and_unit() {
        let path = ControlPath::new(&courier()).unwrap();
        for p in [0.0, 1.0] {
            let t = path.tangent(p).unwrap();
            assert!(t.is_finite());
            assert!((t.length() - 1.0).abs() < 1e-5);
        }
        // leaving the first point heading towards +z
        assert!(path.tangent(0.0).unwrap().z > 0.0);
    }

    #[test]
    fn two_point_path_is_a_segment() {
        let path = ControlPath::new(&[Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]).unwrap();
        assert!(path.sample(0.25).abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
        assert!(path.tangent(0.7).unwrap().abs_diff_eq(Vec3::X, 1e-5));
        assert!((path.length() - 2.0).abs() < 1e-3);
    }

    #[test]
    fn coincident_points_have_no_tangent() {
        let path = ControlPath::new(&[Vec3::ONE, Vec3::ONE]).unwrap();
        assert_eq!(path.tangent(0.5), None);
        assert_eq!(path.sample(0.5), Vec3::ONE);
    }

    #[test]
    fn closed_path_returns_home() {
        let square = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 0.0, 1.0), Vec3::Z];
        let path = ControlPath::with_options(&square, PathOptions { closed: true, ..Default::default() }).unwrap();
        assert_eq!(path.sample(1.0), square[0]);
        assert_eq!(path.sample(0.25), square[1]);
        assert!(path.tangent(1.0).is_some());
    }

    #[test]
    fn constant_speed_spreads_samples_evenly() {
        let uneven = [Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)];
        let even = ControlPath::with_options(&uneven, PathOptions { constant_speed: true, ..Default::default() }).unwrap();
        let mid = even.sample(0.5);
        assert!((mid.x - even.length() * 0.5).abs() < 0.1);
    }

    #[test]
    fn construction_errors() {
        assert_eq!(ControlPath::new(&[Vec3::ZERO]), Err(ConstructionError::TooFewPoints(1)));
        assert_eq!(ControlPath::new(&[]), Err(ConstructionError::TooFewPoints(0)));
        assert_eq!(
            ControlPath::new(&[Vec3::ZERO, Vec3::new(f32::INFINITY, 0.0, 0.0)]),
            Err(ConstructionError::NonFinitePoint { index: 1 })
        );
    }

    #[test]
    fn huge_coordinates_are_rejected_and_large_ones_sample_cleanly() {
        let far = [Vec3::ZERO, Vec3::new(1e19, 0.0, 0.0), Vec3::new(2e19, 1e19, 0.0)];
        assert_eq!(ControlPath::new(&far), Err(ConstructionError::PointOutOfRange { index: 1 }));

        let wide = [Vec3::ZERO, Vec3::new(1e18, 0.0, 0.0), Vec3::new(1e18, 1e18, 0.0)];
        for curve in [CurveType::Centripetal, CurveType::Chordal] {
            let path = ControlPath::with_options(&wide, PathOptions { curve, ..Default::default() }).unwrap();
            for i in 1..10 {
                let p = i as f32 / 10.0;
                assert!(path.sample(p).is_finite(), "{curve:?} at {p}");
                assert!(path.tangent(p).is_some_and(|t| t.is_finite()), "{curve:?} at {p}");
            }
        }
    }
}
