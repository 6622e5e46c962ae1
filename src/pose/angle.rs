//! Joint-angle geometry over 2D keypoints.
//!
//! Confidence is intentionally not consulted here: low-confidence joints
//! contribute to angles exactly like confident ones.

use serde::{Deserialize, Serialize};

use super::keypoint::{KeypointIndex, Pose};

/// ゼロ長ベクトル対策の分母オフセット
const EPSILON: f32 = 1e-8;

/// 3点のなす角（度）。頂点は `p2`。
///
/// 常に有限値で [0, 180] を返す。
pub fn angle(p1: [f32; 2], p2: [f32; 2], p3: [f32; 2]) -> f32 {
    let v1 = [p1[0] - p2[0], p1[1] - p2[1]];
    let v2 = [p3[0] - p2[0], p3[1] - p2[1]];

    let dot = v1[0] * v2[0] + v1[1] * v2[1];
    let norm1 = (v1[0] * v1[0] + v1[1] * v1[1]).sqrt();
    let norm2 = (v2[0] * v2[0] + v2[1] * v2[1]).sqrt();

    let mut cos = dot / (norm1 * norm2 + EPSILON);
    if !cos.is_finite() {
        cos = 0.0;
    }
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// 左右
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// 左右対になっている関節
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Knee,
    Elbow,
    Hip,
    Shoulder,
}

impl Joint {
    pub const COUNT: usize = 4;

    pub const ALL: [Joint; Self::COUNT] = [Joint::Knee, Joint::Elbow, Joint::Hip, Joint::Shoulder];

    pub fn index(self) -> usize {
        match self {
            Joint::Knee => 0,
            Joint::Elbow => 1,
            Joint::Hip => 2,
            Joint::Shoulder => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Joint::Knee => "knee",
            Joint::Elbow => "elbow",
            Joint::Hip => "hip",
            Joint::Shoulder => "shoulder",
        }
    }

    pub fn side(self, side: Side) -> JointAngle {
        match (self, side) {
            (Joint::Knee, Side::Left) => JointAngle::LeftKnee,
            (Joint::Knee, Side::Right) => JointAngle::RightKnee,
            (Joint::Elbow, Side::Left) => JointAngle::LeftElbow,
            (Joint::Elbow, Side::Right) => JointAngle::RightElbow,
            (Joint::Hip, Side::Left) => JointAngle::LeftHip,
            (Joint::Hip, Side::Right) => JointAngle::RightHip,
            (Joint::Shoulder, Side::Left) => JointAngle::LeftShoulder,
            (Joint::Shoulder, Side::Right) => JointAngle::RightShoulder,
        }
    }

    /// (左, 右)
    pub fn pair(self) -> (JointAngle, JointAngle) {
        (self.side(Side::Left), self.side(Side::Right))
    }
}

/// フォーム解析で使う8つの関節角
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum JointAngle {
    LeftKnee = 0,
    RightKnee = 1,
    LeftElbow = 2,
    RightElbow = 3,
    LeftHip = 4,
    RightHip = 5,
    LeftShoulder = 6,
    RightShoulder = 7,
}

impl JointAngle {
    pub const COUNT: usize = 8;

    pub const ALL: [JointAngle; Self::COUNT] = [
        JointAngle::LeftKnee,
        JointAngle::RightKnee,
        JointAngle::LeftElbow,
        JointAngle::RightElbow,
        JointAngle::LeftHip,
        JointAngle::RightHip,
        JointAngle::LeftShoulder,
        JointAngle::RightShoulder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JointAngle::LeftKnee => "left_knee",
            JointAngle::RightKnee => "right_knee",
            JointAngle::LeftElbow => "left_elbow",
            JointAngle::RightElbow => "right_elbow",
            JointAngle::LeftHip => "left_hip",
            JointAngle::RightHip => "right_hip",
            JointAngle::LeftShoulder => "left_shoulder",
            JointAngle::RightShoulder => "right_shoulder",
        }
    }

    pub fn joint(self) -> Joint {
        match self {
            JointAngle::LeftKnee | JointAngle::RightKnee => Joint::Knee,
            JointAngle::LeftElbow | JointAngle::RightElbow => Joint::Elbow,
            JointAngle::LeftHip | JointAngle::RightHip => Joint::Hip,
            JointAngle::LeftShoulder | JointAngle::RightShoulder => Joint::Shoulder,
        }
    }

    /// 角度を構成するキーポイント (端点, 頂点, 端点)
    pub fn triple(self) -> (KeypointIndex, KeypointIndex, KeypointIndex) {
        use KeypointIndex::*;
        match self {
            JointAngle::LeftKnee => (LeftHip, LeftKnee, LeftAnkle),
            JointAngle::RightKnee => (RightHip, RightKnee, RightAnkle),
            JointAngle::LeftElbow => (LeftShoulder, LeftElbow, LeftWrist),
            JointAngle::RightElbow => (RightShoulder, RightElbow, RightWrist),
            JointAngle::LeftHip => (LeftShoulder, LeftHip, LeftKnee),
            JointAngle::RightHip => (RightShoulder, RightHip, RightKnee),
            JointAngle::LeftShoulder => (LeftElbow, LeftShoulder, LeftHip),
            JointAngle::RightShoulder => (RightElbow, RightShoulder, RightHip),
        }
    }

    pub fn measure(self, pose: &Pose) -> f32 {
        let (a, b, c) = self.triple();
        triple_angle(pose, a, b, c)
    }
}

fn triple_angle(pose: &Pose, a: KeypointIndex, b: KeypointIndex, c: KeypointIndex) -> f32 {
    angle(pose.get(a).position(), pose.get(b).position(), pose.get(c).position())
}

/// 1フレーム分の8関節角
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleVector {
    values: [f32; JointAngle::COUNT],
}

impl AngleVector {
    pub fn from_pose(pose: &Pose) -> Self {
        let mut values = [0.0; JointAngle::COUNT];
        for joint_angle in JointAngle::ALL {
            values[joint_angle as usize] = joint_angle.measure(pose);
        }
        Self { values }
    }

    pub fn get(&self, joint_angle: JointAngle) -> f32 {
        self.values[joint_angle as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointAngle, f32)> + '_ {
        JointAngle::ALL.iter().map(move |&ja| (ja, self.values[ja as usize]))
    }
}

/// レップカウント用に追跡する角度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "angle")]
pub enum AngleSelector {
    /// 左右平均
    Average(Joint),
    /// 片側のみ
    Single(JointAngle),
    /// 肩→腰→足首の左右平均（体幹の直線性）
    BodyLine,
}

impl AngleSelector {
    pub fn measure(&self, pose: &Pose) -> f32 {
        use KeypointIndex::*;
        match *self {
            AngleSelector::Average(joint) => {
                let (left, right) = joint.pair();
                (left.measure(pose) + right.measure(pose)) / 2.0
            }
            AngleSelector::Single(joint_angle) => joint_angle.measure(pose),
            AngleSelector::BodyLine => {
                let left = triple_angle(pose, LeftShoulder, LeftHip, LeftAnkle);
                let right = triple_angle(pose, RightShoulder, RightHip, RightAnkle);
                (left + right) / 2.0
            }
        }
    }

    pub fn label(&self) -> String {
        match *self {
            AngleSelector::Average(joint) => format!("{} (avg)", joint.name()),
            AngleSelector::Single(joint_angle) => joint_angle.name().to_string(),
            AngleSelector::BodyLine => "body line".to_string(),
        }
    }
}
