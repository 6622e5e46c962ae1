use serde::Serialize;

use crate::pose::KeypointIndex;

/// RGB
pub type Rgb = [u8; 3];

/// 骨格線の左右区分（色分けに使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Left,
    Right,
    Center,
}

impl EdgeSide {
    /// 色の1文字コード (m: マゼンタ, c: シアン, y: 黄)
    pub fn code(self) -> &'static str {
        match self {
            EdgeSide::Left => "m",
            EdgeSide::Right => "c",
            EdgeSide::Center => "y",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            EdgeSide::Left => MAGENTA,
            EdgeSide::Right => CYAN,
            EdgeSide::Center => YELLOW,
        }
    }
}

pub const MAGENTA: Rgb = [255, 0, 255];
pub const CYAN: Rgb = [0, 255, 255];
pub const YELLOW: Rgb = [255, 255, 0];
pub const GREEN: Rgb = [0, 255, 0];
pub const ORANGE: Rgb = [255, 165, 0];
pub const RED: Rgb = [255, 0, 0];

/// キーポイントの色
pub const KEYPOINT_COLOR: Rgb = [255, 20, 147];

/// フォーム指摘テキストの色
pub const ISSUE_COLOR: Rgb = [255, 100, 100];

/// 骨格の接続定義 (開始キーポイント, 終了キーポイント, 区分)
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex, EdgeSide); 18] = [
    // 顔
    (KeypointIndex::Nose, KeypointIndex::LeftEye, EdgeSide::Left),
    (KeypointIndex::Nose, KeypointIndex::RightEye, EdgeSide::Right),
    (KeypointIndex::LeftEye, KeypointIndex::LeftEar, EdgeSide::Left),
    (KeypointIndex::RightEye, KeypointIndex::RightEar, EdgeSide::Right),
    (KeypointIndex::Nose, KeypointIndex::LeftShoulder, EdgeSide::Left),
    (KeypointIndex::Nose, KeypointIndex::RightShoulder, EdgeSide::Right),
    // 腕
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow, EdgeSide::Left),
    (KeypointIndex::LeftElbow, KeypointIndex::LeftWrist, EdgeSide::Left),
    (KeypointIndex::RightShoulder, KeypointIndex::RightElbow, EdgeSide::Right),
    (KeypointIndex::RightElbow, KeypointIndex::RightWrist, EdgeSide::Right),
    // 胴体
    (KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder, EdgeSide::Center),
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftHip, EdgeSide::Left),
    (KeypointIndex::RightShoulder, KeypointIndex::RightHip, EdgeSide::Right),
    (KeypointIndex::LeftHip, KeypointIndex::RightHip, EdgeSide::Center),
    // 脚
    (KeypointIndex::LeftHip, KeypointIndex::LeftKnee, EdgeSide::Left),
    (KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle, EdgeSide::Left),
    (KeypointIndex::RightHip, KeypointIndex::RightKnee, EdgeSide::Right),
    (KeypointIndex::RightKnee, KeypointIndex::RightAnkle, EdgeSide::Right),
];

/// 描画側に渡す骨格線1本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkeletonEdge {
    pub from: usize,
    pub to: usize,
    pub from_name: &'static str,
    pub to_name: &'static str,
    pub color: &'static str,
}

/// 骨格線の一覧（トポロジー順のインデックスと色コード）
pub fn skeleton_edges() -> Vec<SkeletonEdge> {
    SKELETON_CONNECTIONS
        .iter()
        .map(|&(from, to, side)| SkeletonEdge {
            from: from as usize,
            to: to as usize,
            from_name: from.name(),
            to_name: to.name(),
            color: side.code(),
        })
        .collect()
}
