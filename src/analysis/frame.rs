//! Single-frame inspection: a confidence-gated squat phase check and a
//! summary of one estimated pose (keypoints, joint angles, skeleton edges).

use serde::Serialize;
use std::collections::BTreeMap;

use crate::pose::{AngleVector, JointAngle, Pose};
use crate::render::{skeleton_edges, SkeletonEdge};

/// 脚を使うには股関節・膝・足首すべてがこれを超える必要がある
pub const LEG_MIN_CONFIDENCE: f32 = 0.3;
/// 膝角度がこれ未満ならしゃがんでいる
pub const SQUAT_DOWN_ANGLE: f32 = 120.0;
/// 膝角度がこれを超えれば立っている
pub const SQUAT_UP_ANGLE: f32 = 160.0;

const SHALLOW_ANGLE: f32 = 140.0;
const DEEP_ANGLE: f32 = 90.0;

pub const LEGS_NOT_VISIBLE_FEEDBACK: &str = "Cannot detect legs clearly";
pub const GO_DEEPER_FEEDBACK: &str = "Go deeper";
pub const EXCELLENT_DEPTH_FEEDBACK: &str = "Excellent depth!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SquatPhase {
    Up,
    Down,
    Transition,
    Unknown,
}

/// 膝角度から局面を決める。境界値は transition
pub fn squat_phase(knee_angle: f32) -> SquatPhase {
    if knee_angle < SQUAT_DOWN_ANGLE {
        SquatPhase::Down
    } else if knee_angle > SQUAT_UP_ANGLE {
        SquatPhase::Up
    } else {
        SquatPhase::Transition
    }
}

/// 1フレームのスクワット判定
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameFormResult {
    pub knee_angle: Option<f32>,
    pub left_knee_angle: Option<f32>,
    pub right_knee_angle: Option<f32>,
    pub phase: SquatPhase,
    pub form_score: u32,
    pub feedback: Vec<String>,
}

/// 3点とも十分な信頼度のときだけ角度を返す
fn gated_angle(pose: &Pose, joint_angle: JointAngle) -> Option<f32> {
    let (a, b, c) = joint_angle.triple();
    [a, b, c]
        .iter()
        .all(|&k| pose.get(k).confidence > LEG_MIN_CONFIDENCE)
        .then(|| joint_angle.measure(pose))
}

/// 見えている脚の膝角度（両脚なら平均）で局面と深さを評価する
pub fn analyze_squat_frame(pose: &Pose) -> FrameFormResult {
    let left = gated_angle(pose, JointAngle::LeftKnee);
    let right = gated_angle(pose, JointAngle::RightKnee);

    let knee_angle = match (left, right) {
        (Some(l), Some(r)) => (l + r) / 2.0,
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => {
            return FrameFormResult {
                knee_angle: None,
                left_knee_angle: None,
                right_knee_angle: None,
                phase: SquatPhase::Unknown,
                form_score: 0,
                feedback: vec![LEGS_NOT_VISIBLE_FEEDBACK.to_string()],
            }
        }
    };

    let phase = squat_phase(knee_angle);
    let mut feedback = Vec::new();
    let mut form_score = 100;

    // 下りきる前に止まっている
    if phase == SquatPhase::Transition && knee_angle > SHALLOW_ANGLE {
        feedback.push(GO_DEEPER_FEEDBACK.to_string());
        form_score = 70;
    }
    if knee_angle < DEEP_ANGLE {
        feedback.push(EXCELLENT_DEPTH_FEEDBACK.to_string());
        form_score = 100;
    }

    FrameFormResult {
        knee_angle: Some(knee_angle),
        left_knee_angle: left,
        right_knee_angle: right,
        phase,
        form_score,
        feedback,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedKeypoint {
    pub name: &'static str,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

/// 1フレーム分の解析結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameAnalysis {
    pub keypoints: Vec<NamedKeypoint>,
    pub visible_keypoints: usize,
    pub average_confidence: f32,
    pub angles: BTreeMap<&'static str, f32>,
    pub form_analysis: FrameFormResult,
    pub skeleton_edges: Vec<SkeletonEdge>,
}

pub fn analyze_frame(pose: &Pose, visibility_threshold: f32) -> FrameAnalysis {
    let keypoints = pose
        .named()
        .map(|(index, kp)| NamedKeypoint {
            name: index.name(),
            x: kp.x,
            y: kp.y,
            score: kp.confidence,
        })
        .collect();
    let angles = AngleVector::from_pose(pose)
        .iter()
        .map(|(joint_angle, value)| (joint_angle.name(), value))
        .collect();

    FrameAnalysis {
        keypoints,
        visible_keypoints: pose.visible_count(visibility_threshold),
        average_confidence: pose.average_confidence(),
        angles,
        form_analysis: analyze_squat_frame(pose),
        skeleton_edges: skeleton_edges(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::angle::tests::place_angle;
    use crate::pose::{Keypoint, KeypointIndex};

    fn knees(left: f32, right: f32) -> Pose {
        let mut pose = Pose::default();
        place_angle(&mut pose, JointAngle::LeftKnee.triple(), [0.4, 0.6], left);
        place_angle(&mut pose, JointAngle::RightKnee.triple(), [0.6, 0.6], right);
        pose
    }

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(squat_phase(119.9), SquatPhase::Down);
        assert_eq!(squat_phase(120.0), SquatPhase::Transition);
        assert_eq!(squat_phase(160.0), SquatPhase::Transition);
        assert_eq!(squat_phase(160.1), SquatPhase::Up);
    }

    #[test]
    fn test_deep_squat() {
        let result = analyze_squat_frame(&knees(80.0, 84.0));
        assert!((result.knee_angle.unwrap() - 82.0).abs() < 0.1);
        assert!(result.left_knee_angle.is_some());
        assert!(result.right_knee_angle.is_some());
        assert_eq!(result.phase, SquatPhase::Down);
        assert_eq!(result.form_score, 100);
        assert_eq!(result.feedback, vec![EXCELLENT_DEPTH_FEEDBACK.to_string()]);
    }

    #[test]
    fn test_shallow_transition() {
        let result = analyze_squat_frame(&knees(150.0, 150.0));
        assert_eq!(result.phase, SquatPhase::Transition);
        assert_eq!(result.form_score, 70);
        assert_eq!(result.feedback, vec![GO_DEEPER_FEEDBACK.to_string()]);

        let result = analyze_squat_frame(&knees(130.0, 130.0));
        assert_eq!(result.phase, SquatPhase::Transition);
        assert_eq!(result.form_score, 100);
        assert!(result.feedback.is_empty());
    }

    #[test]
    fn test_standing() {
        let result = analyze_squat_frame(&knees(175.0, 175.0));
        assert_eq!(result.phase, SquatPhase::Up);
        assert_eq!(result.form_score, 100);
        assert!(result.feedback.is_empty());
    }

    #[test]
    fn test_single_visible_leg_is_used_alone() {
        let mut pose = knees(100.0, 170.0);
        // 0.3 ちょうどは見えていない扱い
        let knee = *pose.get(KeypointIndex::RightKnee);
        pose.set(KeypointIndex::RightKnee, Keypoint::new(knee.x, knee.y, 0.3));

        let result = analyze_squat_frame(&pose);
        assert!(result.right_knee_angle.is_none());
        assert!((result.knee_angle.unwrap() - 100.0).abs() < 0.1);
        assert_eq!(result.phase, SquatPhase::Down);
    }

    #[test]
    fn test_no_visible_legs() {
        let result = analyze_squat_frame(&Pose::default());
        assert_eq!(result.knee_angle, None);
        assert_eq!(result.phase, SquatPhase::Unknown);
        assert_eq!(result.form_score, 0);
        assert_eq!(result.feedback, vec![LEGS_NOT_VISIBLE_FEEDBACK.to_string()]);
    }

    #[test]
    fn test_frame_summary() {
        let pose = knees(90.0, 90.0);
        let analysis = analyze_frame(&pose, 0.11);

        assert_eq!(analysis.keypoints.len(), KeypointIndex::COUNT);
        assert_eq!(analysis.keypoints[13].name, "left_knee");
        assert_eq!(analysis.visible_keypoints, 6);
        assert!((analysis.average_confidence - 0.9 * 6.0 / 17.0).abs() < 1e-4);
        assert_eq!(analysis.angles.len(), JointAngle::COUNT);
        assert!((analysis.angles["left_knee"] - 90.0).abs() < 0.1);
        assert_eq!(analysis.skeleton_edges.len(), 18);
        assert_eq!(analysis.form_analysis.phase, SquatPhase::Down);
    }
}
