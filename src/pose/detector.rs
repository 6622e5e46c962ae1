use anyhow::{Context, Result};
use ndarray::Array4;
use opencv::core::{AlgorithmHint, Mat, Size, CV_32FC3};
use opencv::imgproc;
use opencv::prelude::*;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::keypoint::{Keypoint, KeypointIndex, Pose};
use super::PoseEstimator;

/// MoveNet用の入力サイズ
pub const MOVENET_INPUT_SIZE: i32 = 192;

/// MoveNet (single pose) を使用した姿勢推定器
pub struct MoveNetDetector {
    session: Session,
}

impl MoveNetDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model {}", model_path.display()))?;

        tracing::info!("MoveNet model loaded: {}", model_path.display());
        Ok(Self { session })
    }

    /// 前処理済みテンソルから姿勢を検出
    ///
    /// 入力: [1, 192, 192, 3] の f32 テンソル
    /// 出力: Pose (17キーポイント)
    pub fn detect(&mut self, input: Array4<f32>) -> Result<Pose> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["serving_default_input_0" => input_tensor])
            .context("Inference failed")?;

        // MoveNet の出力は [1, 1, 17, 3] (y, x, confidence)
        let output: ndarray::ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
            .try_extract_array()
            .context("Failed to extract output tensor")?;

        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for (i, kp) in keypoints.iter_mut().enumerate() {
            let y = output[[0, 0, i, 0]];
            let x = output[[0, 0, i, 1]];
            let confidence = output[[0, 0, i, 2]];
            *kp = Keypoint::new(x, y, confidence);
        }

        Ok(Pose::new(keypoints))
    }
}

impl PoseEstimator<Mat> for MoveNetDetector {
    fn estimate(&mut self, frame: &Mat) -> Result<Pose> {
        let input = preprocess(frame)?;
        self.detect(input)
    }
}

/// BGR Mat を MoveNet の入力テンソル [1, 192, 192, 3] (0.0-255.0, RGB) に変換
fn preprocess(frame: &Mat) -> Result<Array4<f32>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(
        frame,
        &mut rgb,
        imgproc::COLOR_BGR2RGB,
        0,
        AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    // 動画はアスペクト比を保たずそのまま正方形へ縮小（正規化座標はフレーム基準のまま）
    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(MOVENET_INPUT_SIZE, MOVENET_INPUT_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

    let side = MOVENET_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, side, side, 3));
    for y in 0..MOVENET_INPUT_SIZE {
        for x in 0..MOVENET_INPUT_SIZE {
            let pixel = float_mat.at_2d::<opencv::core::Vec3f>(y, x)?;
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = pixel[c];
            }
        }
    }

    Ok(tensor)
}
