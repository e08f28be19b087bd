//! Animators that drive one node's transform from a [`Timing`] and an [`AnimationState`].

use glam::{Mat3, Quat, Vec3};

use crate::error::ConstructionError;
use crate::path::ControlPath;
use crate::scene::{SceneNode, Transform};
use crate::timeline::{AnimationState, Easing, LoopMode, Playback, Timing};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub progress: f64,
    pub position: Vec3,
    /// Unit tangent, `None` where the path is degenerate.
    pub direction: Option<Vec3>,
}

/// Moves a node along a [`ControlPath`], facing its local +Z the way it travels.
#[derive(Debug, Clone)]
pub struct PathAnimator {
    path: ControlPath,
    timing: Timing,
    state: AnimationState,
}

impl PathAnimator {
    /// Ping-pong or hard-looping animator over an open centripetal path.
    pub fn new(points: &[Vec3], duration: f64, ping_pong: bool, easing: Easing) -> Result<Self, ConstructionError> {
        let loop_mode = if ping_pong { LoopMode::PingPong } else { LoopMode::Repeat };
        Ok(Self::from_parts(ControlPath::new(points)?, Timing::new(duration, loop_mode, easing)?))
    }

    pub fn from_parts(path: ControlPath, timing: Timing) -> Self {
        Self { path, timing, state: AnimationState::running() }
    }

    pub fn path(&self) -> &ControlPath {
        &self.path
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Resume forward from the current position in the pass.
    pub fn start(&mut self) {
        if !self.state.is_running() {
            self.state.playback = Playback::Forward;
        }
    }

    pub fn stop(&mut self) {
        self.state.playback = Playback::Stopped;
    }

    pub fn sample(&self, progress: f64) -> PathSample {
        let p = progress as f32;
        PathSample { progress, position: self.path.sample(p), direction: self.path.tangent(p) }
    }

    /// Advance by `dt` seconds and pose `target`. Stopped animators leave it alone.
    pub fn tick(&mut self, dt: f64, target: &mut SceneNode) -> Option<PathSample> {
        self.tick_transform(dt, &mut target.transform)
    }

    pub fn tick_transform(&mut self, dt: f64, transform: &mut Transform) -> Option<PathSample> {
        if !self.state.is_running() {
            return None;
        }
        self.state = self.state.step(dt, &self.timing);
        let sample = self.sample(self.state.progress);
        transform.translation = sample.position;
        // the way back faces down the reversed tangent
        let heading = match self.state.playback {
            Playback::Backward => sample.direction.map(|dir| -dir),
            _ => sample.direction,
        };
        match heading.and_then(|dir| look_rotation(dir, Vec3::Y)) {
            Some(rotation) => transform.rotation = rotation,
            None => log::debug!("degenerate tangent at p={:.4}, keeping previous orientation", sample.progress),
        }
        Some(sample)
    }
}

/// Rotation taking local +Z onto `forward`, keeping local +Y as close to `up` as possible.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
    let z = forward.try_normalize()?;
    let x = up
        .cross(z)
        .try_normalize()
        .or_else(|| Vec3::Z.cross(z).try_normalize())
        .or_else(|| Vec3::X.cross(z).try_normalize())?;
    let y = z.cross(x);
    Some(Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize())
}

/// Turns a node about a fixed axis, e.g. one full revolution every ten seconds.
#[derive(Debug, Clone)]
pub struct SpinAnimator {
    axis: Vec3,
    /// Radians covered by one pass.
    angle: f32,
    timing: Timing,
    state: AnimationState,
    base: Option<Quat>,
}

impl SpinAnimator {
    pub fn new(axis: Vec3, angle: f32, timing: Timing) -> Result<Self, ConstructionError> {
        let axis = axis.try_normalize().ok_or(ConstructionError::InvalidAxis)?;
        if !angle.is_finite() {
            return Err(ConstructionError::InvalidAngle(angle));
        }
        Ok(Self { axis, angle, timing, state: AnimationState::running(), base: None })
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn stop(&mut self) {
        self.state.playback = Playback::Stopped;
    }

    /// Rotation is relative to the target's orientation at the first tick.
    pub fn tick(&mut self, dt: f64, target: &mut SceneNode) -> Option<f64> {
        if !self.state.is_running() {
            return None;
        }
        let base = *self.base.get_or_insert(target.transform.rotation);
        self.state = self.state.step(dt, &self.timing);
        let turn = Quat::from_axis_angle(self.axis, self.angle * self.state.progress as f32);
        target.transform.rotation = (turn * base).normalize();
        Some(self.state.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courier() -> [Vec3; 3] {
        [Vec3::new(0.0, 0.5, -4.0), Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.5, 0.5, 2.5)]
    }

    #[test]
    fn ping_pong_reaches_each_end() {
        let points = courier();
        let mut animator = PathAnimator::new(&points, 8.0, true, Easing::Linear).unwrap();
        let mut node = SceneNode::group("courier");
        let mut last = None;
        for _ in 0..8 {
            last = animator.tick(0.5, &mut node);
        }
        let at_turn = last.unwrap();
        assert_eq!(at_turn.progress, 1.0);
        assert_eq!(node.transform.translation, points[2]);
        assert_eq!(animator.state().playback, Playback::Backward);
        for _ in 0..8 {
            last = animator.tick(0.5, &mut node);
        }
        assert_eq!(last.unwrap().progress, 0.0);
        assert_eq!(node.transform.translation, points[0]);
        assert_eq!(animator.state().playback, Playback::Forward);
    }

    #[test]
    fn sixty_hz_ticks_land_near_the_ends() {
        let points = courier();
        let mut animator = PathAnimator::new(&points, 8.0, true, Easing::SineInOut).unwrap();
        let mut node = SceneNode::group("courier");
        for _ in 0..240 {
            animator.tick(1.0 / 60.0, &mut node);
        }
        assert!(node.transform.translation.abs_diff_eq(points[2], 1e-3));
        for _ in 0..240 {
            animator.tick(1.0 / 60.0, &mut node);
        }
        assert!(node.transform.translation.abs_diff_eq(points[0], 1e-3));
    }

    #[test]
    fn node_faces_along_the_tangent() {
        let mut animator = PathAnimator::new(&courier(), 4.0, false, Easing::Linear).unwrap();
        let mut node = SceneNode::group("courier");
        let sample = animator.tick(1.3, &mut node).unwrap();
        let facing = node.transform.rotation * Vec3::Z;
        assert!(facing.abs_diff_eq(sample.direction.unwrap(), 1e-4));
    }

    #[test]
    fn degenerate_tangent_keeps_orientation() {
        let still = [Vec3::ONE, Vec3::ONE];
        let mut animator = PathAnimator::new(&still, 1.0, false, Easing::Linear).unwrap();
        let mut node = SceneNode::group("parked");
        let before = Quat::from_rotation_y(0.7);
        node.transform.rotation = before;
        let sample = animator.tick(0.3, &mut node).unwrap();
        assert_eq!(sample.direction, None);
        assert_eq!(node.transform.rotation, before);
        assert!(node.transform.rotation.is_finite());
        assert_eq!(node.transform.translation, Vec3::ONE);
    }

    #[test]
    fn stopped_animator_leaves_target_alone() {
        let mut animator = PathAnimator::new(&courier(), 2.0, false, Easing::Linear).unwrap();
        let mut node = SceneNode::group("courier");
        animator.tick(0.5, &mut node);
        let pose = node.transform;
        animator.stop();
        assert!(animator.tick(0.5, &mut node).is_none());
        assert_eq!(node.transform, pose);
        animator.start();
        assert!(animator.tick(0.5, &mut node).is_some());
    }

    #[test]
    fn construction_is_validated() {
        assert_eq!(
            PathAnimator::new(&[Vec3::ZERO], 8.0, true, Easing::Linear).unwrap_err(),
            ConstructionError::TooFewPoints(1)
        );
        assert_eq!(
            PathAnimator::new(&courier(), 0.0, true, Easing::Linear).unwrap_err(),
            ConstructionError::InvalidDuration(0.0)
        );
    }

    #[test]
    fn look_rotation_handles_vertical_forward() {
        let q = look_rotation(Vec3::Y, Vec3::Y).unwrap();
        assert!((q * Vec3::Z).abs_diff_eq(Vec3::Y, 1e-5));
        assert!(look_rotation(Vec3::ZERO, Vec3::Y).is_none());
        assert!(look_rotation(Vec3::Z, Vec3::Y).unwrap().abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn spin_turns_a_full_revolution_per_pass() {
        let timing = Timing::new(10.0, LoopMode::Repeat, Easing::Linear).unwrap();
        let mut spin = SpinAnimator::new(Vec3::Y, std::f32::consts::TAU, timing).unwrap();
        let mut node = SceneNode::group("stars");
        spin.tick(2.5, &mut node);
        let quarter = node.transform.rotation * Vec3::Z;
        assert!(quarter.abs_diff_eq(Vec3::X, 1e-5));
        spin.tick(7.5, &mut node);
        assert!((node.transform.rotation * Vec3::Z).abs_diff_eq(Vec3::Z, 1e-5));
        assert!(SpinAnimator::new(Vec3::ZERO, 1.0, timing).is_err());
        assert_eq!(
            SpinAnimator::new(Vec3::Y, f32::NAN, timing).unwrap_err().to_string(),
            "spin angle must be finite, got NaN"
        );
    }

    #[test]
    fn node_faces_where_it_drives_on_both_legs() {
        let mut animator = PathAnimator::new(&courier(), 8.0, true, Easing::Linear).unwrap();
        let mut node = SceneNode::group("courier");
        let check = |t_from: f64, animator: &mut PathAnimator, node: &mut SceneNode| {
            let before = node.transform.translation;
            animator.tick(0.01, node);
            let motion = (node.transform.translation - before).normalize();
            let facing = node.transform.rotation * Vec3::Z;
            assert!(motion.dot(facing) > 0.99, "t={t_from}: motion={motion} facing={facing}");
        };
        animator.tick(1.0, &mut node);
        check(1.0, &mut animator, &mut node);
        animator.tick(3.99, &mut node);
        assert_eq!(animator.state().playback, Playback::Backward);
        check(5.0, &mut animator, &mut node);
        animator.tick(1.5, &mut node);
        check(6.5, &mut animator, &mut node);
    }
}
