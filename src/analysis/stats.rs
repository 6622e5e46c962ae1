use serde::Serialize;

use crate::pose::{AngleVector, Joint, JointAngle};

/// 1つの角度のレップ窓内統計
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    /// 母標準偏差
    pub std: f32,
    /// 可動域 (max - min)
    pub rom: f32,
}

impl AngleStats {
    /// 空スライスは None
    pub fn from_values(values: &[f32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f32;
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = values.iter().sum::<f32>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;

        Some(Self {
            min,
            max,
            mean,
            std: variance.sqrt(),
            rom: max - min,
        })
    }
}

/// レップ窓全体の統計（8角度 + 左右対称性）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStats {
    angles: [AngleStats; JointAngle::COUNT],
    symmetry: [f32; Joint::COUNT],
}

impl WindowStats {
    pub fn from_angles(frames: &[AngleVector]) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }

        let mut angles = [AngleStats {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            std: 0.0,
            rom: 0.0,
        }; JointAngle::COUNT];
        let mut values = Vec::with_capacity(frames.len());
        for joint_angle in JointAngle::ALL {
            values.clear();
            values.extend(frames.iter().map(|v| v.get(joint_angle)));
            angles[joint_angle as usize] = AngleStats::from_values(&values)?;
        }

        let mut symmetry = [0.0; Joint::COUNT];
        for joint in Joint::ALL {
            let (left, right) = joint.pair();
            symmetry[joint.index()] = (angles[left as usize].mean - angles[right as usize].mean).abs();
        }

        Some(Self { angles, symmetry })
    }

    pub fn angle(&self, joint_angle: JointAngle) -> &AngleStats {
        &self.angles[joint_angle as usize]
    }

    /// |左平均 - 右平均|
    pub fn symmetry(&self, joint: Joint) -> f32 {
        self.symmetry[joint.index()]
    }
}
