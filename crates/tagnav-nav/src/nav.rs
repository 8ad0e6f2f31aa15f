use std::time::Duration;

use tagnav_proto::{Command, Observation};
use tracing::{debug, info, warn};

use crate::{MarkerCalibration, NavError, Pose, Waypoint, WaypointSequencer};

pub const DEFAULT_ASCEND_THRESHOLD_M: f64 = 0.1;
pub const DEFAULT_ALIGN_TOLERANCE_M: f64 = 0.025;
pub const DEFAULT_DESCEND_DWELL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavState {
    Acquire,
    SetTarget,
    Ascend,
    AlignX,
    AlignY,
    Descend,
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavParams {
    /// Marker z (sensor frame) above which the platform counts as airborne.
    pub ascend_threshold_m: f64,
    pub align_tolerance_m: f64,
    /// Blind wait after `descend` before `arrived` is announced.
    pub descend_dwell: Duration,
}

impl Default for NavParams {
    fn default() -> Self {
        Self {
            ascend_threshold_m: DEFAULT_ASCEND_THRESHOLD_M,
            align_tolerance_m: DEFAULT_ALIGN_TOLERANCE_M,
            descend_dwell: DEFAULT_DESCEND_DWELL,
        }
    }
}

impl NavParams {
    pub fn validate(&self) -> Result<(), NavError> {
        if !(self.ascend_threshold_m.is_finite() && self.ascend_threshold_m > 0.0) {
            return Err(NavError::InvalidConfig("ascend threshold must be > 0"));
        }
        if !(self.align_tolerance_m.is_finite() && self.align_tolerance_m > 0.0) {
            return Err(NavError::InvalidConfig("align tolerance must be > 0"));
        }
        if self.descend_dwell.is_zero() {
            return Err(NavError::InvalidConfig("descend dwell must be > 0"));
        }
        Ok(())
    }
}

/// What the scheduler must do, in order, after a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Say(Command),
    /// Hold the tick handler for this long with no feedback.
    Dwell(Duration),
}

/// Everything that changes while navigating. Owned by the tick handler only.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    state: NavState,
    pose: Option<Pose>,
    target: Option<Waypoint>,
    sequencer: WaypointSequencer,
    terminal: bool,
}

impl Session {
    pub fn new(sequencer: WaypointSequencer) -> Self {
        Self {
            state: NavState::Acquire,
            pose: None,
            target: None,
            sequencer,
            terminal: false,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn pose(&self) -> Option<Pose> {
        self.pose
    }

    pub fn target(&self) -> Option<&Waypoint> {
        self.target.as_ref()
    }

    pub fn cursor(&self) -> usize {
        self.sequencer.cursor()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn require_target(&self) -> Result<&Waypoint, NavError> {
        self.target.as_ref().ok_or(NavError::InvalidState {
            state: self.state,
            reason: "no active target",
        })
    }

    /// One tick of the navigation table.
    ///
    /// Pure: `self` is left untouched and the successor is returned together
    /// with the directives for the scheduler. On error nothing is applied.
    pub fn transition(
        &self,
        params: &NavParams,
        calibration: &MarkerCalibration,
        obs: Option<&Observation>,
    ) -> Result<(Session, Vec<Directive>), NavError> {
        if self.terminal != (self.state == NavState::Complete) {
            return Err(NavError::InvalidState {
                state: self.state,
                reason: "terminal flag out of sync with state",
            });
        }

        let mut next = self.clone();
        let mut out = Vec::new();

        match self.state {
            NavState::Acquire => match obs {
                Some(o) => {
                    next.pose = Some(calibration.estimate(o)?);
                    next.state = NavState::SetTarget;
                }
                None => out.push(Directive::Say(Command::NoSignal)),
            },

            NavState::SetTarget => match self.sequencer.next() {
                Some(wp) => {
                    next.target = Some(wp.clone());
                    next.state = NavState::Ascend;
                }
                None => {
                    next.target = None;
                    next.terminal = true;
                    next.state = NavState::Complete;
                }
            },

            NavState::Ascend => {
                self.require_target()?;
                match obs {
                    Some(o) if o.translation.z > params.ascend_threshold_m => {
                        next.state = NavState::AlignX;
                    }
                    _ => out.push(Directive::Say(Command::Ascend)),
                }
            }

            NavState::AlignX | NavState::AlignY => {
                let goal = self.require_target()?.pose;
                if let Some(o) = obs {
                    next.pose = Some(calibration.estimate(o)?);
                }
                let pose = next.pose.ok_or(NavError::InvalidState {
                    state: self.state,
                    reason: "aligning without a pose",
                })?;

                let on_x = self.state == NavState::AlignX;
                let (current, wanted) = if on_x { (pose.x, goal.x) } else { (pose.y, goal.y) };
                let (towards, away, done) = if on_x {
                    (Command::MovePositiveX, Command::MoveNegativeX, NavState::AlignY)
                } else {
                    (Command::MovePositiveY, Command::MoveNegativeY, NavState::Descend)
                };

                out.push(Directive::Say(if current < wanted { towards } else { away }));
                if (current - wanted).abs() < params.align_tolerance_m {
                    next.state = done;
                }
            }

            // The marker leaves the camera's view on the way down, so there is
            // nothing to confirm against: announce, wait, assume arrival.
            NavState::Descend => {
                self.require_target()?;
                out.push(Directive::Say(Command::Descend));
                out.push(Directive::Dwell(params.descend_dwell));
                out.push(Directive::Say(Command::Arrived));
                next.sequencer.advance();
                next.state = NavState::SetTarget;
            }

            NavState::Complete => out.push(Directive::Say(Command::Complete)),
        }

        Ok((next, out))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavOutput {
    pub state: NavState,
    pub directives: Vec<Directive>,
}

impl NavOutput {
    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.directives.iter().filter_map(|d| match d {
            Directive::Say(c) => Some(*c),
            Directive::Dwell(_) => None,
        })
    }

    /// True once `complete` has been announced; the scheduler stops here.
    pub fn halted(&self) -> bool {
        self.commands().any(|c| c == Command::Complete)
    }
}

pub struct NavEngine {
    calibration: MarkerCalibration,
    params: NavParams,
    session: Session,
}

impl NavEngine {
    pub fn new(calibration: MarkerCalibration, route: Vec<Waypoint>, params: NavParams) -> Self {
        Self {
            calibration,
            params,
            session: Session::new(WaypointSequencer::new(route)),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn params(&self) -> &NavParams {
        &self.params
    }

    pub fn step(&mut self, obs: Option<&Observation>) -> Result<NavOutput, NavError> {
        let (next, directives) = self.session.transition(&self.params, &self.calibration, obs)?;

        let from = self.session.state;
        if from != next.state {
            info!("nav: {:?} -> {:?}", from, next.state);
        }
        if from == NavState::SetTarget {
            match next.target() {
                Some(wp) => info!(
                    "nav: target {} ({:.4}, {:.4}), {}/{}",
                    wp.label,
                    wp.pose.x,
                    wp.pose.y,
                    next.cursor() + 1,
                    next.sequencer.len()
                ),
                None => info!("nav: all {} destinations visited", next.sequencer.len()),
            }
        }
        if from == NavState::Descend {
            warn!(
                "nav: descent committed blind for {:?}; arrival is assumed, not observed",
                self.params.descend_dwell
            );
        }
        if let Some(p) = next.pose {
            debug!("nav: pose=({:.4}, {:.4}) state={:?}", p.x, p.y, next.state);
        }

        self.session = next;
        Ok(NavOutput { state: self.session.state, directives })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::default_marker_table;
    use tagnav_proto::Vec3;

    fn calibration() -> MarkerCalibration {
        MarkerCalibration::from_table(&default_marker_table()).unwrap()
    }

    fn at_origin(label: &str) -> Waypoint {
        Waypoint { label: label.to_string(), pose: Pose::new(0.0, 0.0) }
    }

    fn engine(route: Vec<Waypoint>) -> NavEngine {
        NavEngine::new(calibration(), route, NavParams::default())
    }

    /// Observation of ID4 that yields world pose (x, y).
    fn seen_at(x: f64, y: f64, z: f64) -> Observation {
        Observation::now("ID4", Vec3::new(-x, y, z))
    }

    fn session_in(state: NavState, pose: Option<Pose>, target: Option<Waypoint>) -> Session {
        let route: Vec<Waypoint> = target.iter().cloned().collect();
        Session {
            state,
            pose,
            target,
            sequencer: WaypointSequencer::new(route),
            terminal: state == NavState::Complete,
        }
    }

    fn says(out: &NavOutput) -> Vec<Command> {
        out.commands().collect()
    }

    #[test]
    fn test_acquire_without_signal() {
        let mut nav = engine(vec![at_origin("A")]);
        for _ in 0..3 {
            let out = nav.step(None).unwrap();
            assert_eq!(says(&out), [Command::NoSignal]);
            assert_eq!(out.state, NavState::Acquire);
        }
        assert!(nav.session().pose().is_none());
    }

    #[test]
    fn test_acquire_stores_pose() {
        let mut nav = engine(vec![at_origin("A")]);
        let out = nav.step(Some(&seen_at(0.2, -0.1, 0.0))).unwrap();
        assert!(out.directives.is_empty());
        assert_eq!(out.state, NavState::SetTarget);
        assert_eq!(nav.session().pose(), Some(Pose::new(0.2, -0.1)));
    }

    #[test]
    fn test_set_target_pops_without_advancing() {
        let mut nav = engine(vec![at_origin("A"), at_origin("B")]);
        nav.step(Some(&seen_at(0.0, 0.0, 0.0))).unwrap();
        let out = nav.step(None).unwrap();
        assert!(out.directives.is_empty());
        assert_eq!(out.state, NavState::Ascend);
        assert_eq!(nav.session().target().unwrap().label, "A");
        assert_eq!(nav.session().cursor(), 0);
    }

    #[test]
    fn test_empty_route_completes() {
        let mut nav = engine(Vec::new());
        nav.step(Some(&seen_at(0.0, 0.0, 0.0))).unwrap();
        let out = nav.step(None).unwrap();
        assert_eq!(out.state, NavState::Complete);
        assert!(!out.halted());
        assert!(nav.session().is_terminal());

        let out = nav.step(None).unwrap();
        assert_eq!(says(&out), [Command::Complete]);
        assert!(out.halted());
    }

    #[test]
    fn test_ascend_guard() {
        let s = session_in(NavState::Ascend, Some(Pose::default()), Some(at_origin("A")));
        let p = NavParams::default();
        let cal = calibration();

        for obs in [None, Some(seen_at(0.0, 0.0, 0.05)), Some(seen_at(0.0, 0.0, 0.1))] {
            let (next, out) = s.transition(&p, &cal, obs.as_ref()).unwrap();
            assert_eq!(out, [Directive::Say(Command::Ascend)]);
            assert_eq!(next.state(), NavState::Ascend);
        }

        let (next, out) = s.transition(&p, &cal, Some(&seen_at(0.0, 0.0, 0.11))).unwrap();
        assert!(out.is_empty());
        assert_eq!(next.state(), NavState::AlignX);
    }

    #[test]
    fn test_align_x_convergence() {
        let s = session_in(NavState::AlignX, Some(Pose::default()), Some(at_origin("A")));
        let p = NavParams::default();
        let cal = calibration();

        let (s, out) = s.transition(&p, &cal, Some(&seen_at(0.1, 0.0, 0.3))).unwrap();
        assert_eq!(out, [Directive::Say(Command::MoveNegativeX)]);
        assert_eq!(s.state(), NavState::AlignX);

        let (s, out) = s.transition(&p, &cal, Some(&seen_at(0.05, 0.0, 0.3))).unwrap();
        assert_eq!(out, [Directive::Say(Command::MoveNegativeX)]);
        assert_eq!(s.state(), NavState::AlignX);

        let (s, _) = s.transition(&p, &cal, Some(&seen_at(0.02, 0.0, 0.3))).unwrap();
        assert_eq!(s.state(), NavState::AlignY);
    }

    #[test]
    fn test_align_x_below_target_moves_positive() {
        let s = session_in(NavState::AlignX, Some(Pose::default()), Some(at_origin("A")));
        let (_, out) = s
            .transition(&NavParams::default(), &calibration(), Some(&seen_at(-0.2, 0.0, 0.3)))
            .unwrap();
        assert_eq!(out, [Directive::Say(Command::MovePositiveX)]);
    }

    #[test]
    fn test_align_uses_last_pose_when_signal_lost() {
        let s = session_in(NavState::AlignY, Some(Pose::new(0.0, 0.3)), Some(at_origin("A")));
        let (next, out) = s.transition(&NavParams::default(), &calibration(), None).unwrap();
        assert_eq!(out, [Directive::Say(Command::MoveNegativeY)]);
        assert_eq!(next.pose(), Some(Pose::new(0.0, 0.3)));
        assert_eq!(next.state(), NavState::AlignY);
    }

    #[test]
    fn test_align_y_converges_to_descend() {
        let s = session_in(NavState::AlignY, Some(Pose::default()), Some(at_origin("A")));
        let (next, out) = s
            .transition(&NavParams::default(), &calibration(), Some(&seen_at(0.0, -0.01, 0.3)))
            .unwrap();
        assert_eq!(out, [Directive::Say(Command::MovePositiveY)]);
        assert_eq!(next.state(), NavState::Descend);
    }

    #[test]
    fn test_descend_commits_blind() {
        let s = session_in(NavState::Descend, Some(Pose::default()), Some(at_origin("A")));
        let p = NavParams { descend_dwell: Duration::from_millis(1500), ..NavParams::default() };

        for obs in [None, Some(seen_at(5.0, 5.0, 0.0))] {
            let (next, out) = s.transition(&p, &calibration(), obs.as_ref()).unwrap();
            assert_eq!(
                out,
                [
                    Directive::Say(Command::Descend),
                    Directive::Dwell(Duration::from_millis(1500)),
                    Directive::Say(Command::Arrived),
                ]
            );
            assert_eq!(next.state(), NavState::SetTarget);
            assert_eq!(next.cursor(), 1);
            // observations during descent are ignored
            assert_eq!(next.pose(), s.pose());
        }
    }

    #[test]
    fn test_complete_is_stable() {
        let mut nav = engine(Vec::new());
        nav.step(Some(&seen_at(0.0, 0.0, 0.0))).unwrap();
        nav.step(None).unwrap();
        let frozen = nav.session().clone();

        let unknown = Observation::now("ID9", Vec3::default());
        for obs in [None, Some(seen_at(1.0, 1.0, 1.0)), Some(unknown)] {
            let out = nav.step(obs.as_ref()).unwrap();
            assert_eq!(out.directives, [Directive::Say(Command::Complete)]);
            assert_eq!(nav.session(), &frozen);
        }
    }

    #[test]
    fn test_unknown_marker_is_fatal_and_pure() {
        let mut nav = engine(vec![at_origin("A")]);
        let before = nav.session().clone();
        let err = nav.step(Some(&Observation::now("ID7", Vec3::default()))).unwrap_err();
        assert_eq!(err, NavError::UnknownMarker("ID7".into()));
        assert_eq!(nav.session(), &before);
    }

    #[test]
    fn test_invalid_state_without_target() {
        for state in [NavState::Ascend, NavState::AlignX, NavState::AlignY, NavState::Descend] {
            let s = session_in(state, Some(Pose::default()), None);
            let err = s.transition(&NavParams::default(), &calibration(), None).unwrap_err();
            assert!(matches!(err, NavError::InvalidState { state: st, .. } if st == state));
        }
    }

    #[test]
    fn test_invalid_state_align_without_pose() {
        let s = session_in(NavState::AlignX, None, Some(at_origin("A")));
        let err = s.transition(&NavParams::default(), &calibration(), None).unwrap_err();
        assert!(matches!(err, NavError::InvalidState { .. }));
    }

    #[test]
    fn test_invalid_state_terminal_mismatch() {
        let mut s = session_in(NavState::Acquire, None, None);
        s.terminal = true;
        let err = s.transition(&NavParams::default(), &calibration(), None).unwrap_err();
        assert!(matches!(err, NavError::InvalidState { state: NavState::Acquire, .. }));
    }

    #[test]
    fn test_params_validate() {
        assert!(NavParams::default().validate().is_ok());
        let bad = NavParams { align_tolerance_m: 0.0, ..NavParams::default() };
        assert!(bad.validate().is_err());
        let bad = NavParams { descend_dwell: Duration::ZERO, ..NavParams::default() };
        assert!(bad.validate().is_err());
        for threshold in [f64::NAN, f64::INFINITY, 0.0, -0.1] {
            let bad = NavParams { ascend_threshold_m: threshold, ..NavParams::default() };
            assert_eq!(
                bad.validate(),
                Err(NavError::InvalidConfig("ascend threshold must be > 0")),
                "threshold {}",
                threshold
            );
        }
    }
}
