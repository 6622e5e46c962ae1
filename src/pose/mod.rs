pub mod angle;
#[cfg(feature = "desktop")]
pub mod detector;
pub mod keypoint;

pub use angle::{angle, AngleSelector, AngleVector, Joint, JointAngle, Side};
#[cfg(feature = "desktop")]
pub use detector::MoveNetDetector;
pub use keypoint::{Keypoint, KeypointIndex, Pose, PoseFrame};

/// 1フレームから17キーポイントを推定する外部コラボレータ
///
/// 実装は常に `KeypointIndex::COUNT` 個のキーポイントを返す。信頼度分布の保証はない。
pub trait PoseEstimator<F> {
    fn estimate(&mut self, frame: &F) -> anyhow::Result<Pose>;
}
