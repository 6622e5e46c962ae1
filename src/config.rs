use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::exercise::Exercise;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// 未登録の種目IDが来たときに使う種目
    #[serde(default = "default_exercise")]
    pub default_exercise: Exercise,
    /// 描画に使うキーポイントの信頼度しきい値（これを超えたものだけ描く）
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// これ未満のフレーム数のレップ窓は解析しない
    #[serde(default = "default_min_window_frames")]
    pub min_window_frames: usize,
    /// レップのこの割合を超えて崩れたチェックだけフィードバックに出す
    #[serde(default = "default_feedback_ratio")]
    pub feedback_ratio: f32,
    /// 進捗ログの間隔（フレーム数）
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_exercise() -> Exercise { Exercise::Squats }
fn default_visibility_threshold() -> f32 { 0.11 }
fn default_min_window_frames() -> usize { 5 }
fn default_feedback_ratio() -> f32 { 0.3 }
fn default_progress_interval() -> usize { 30 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_exercise: default_exercise(),
            visibility_threshold: default_visibility_threshold(),
            min_window_frames: default_min_window_frames(),
            feedback_ratio: default_feedback_ratio(),
            progress_interval: default_progress_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompressionConfig {
    #[serde(default = "default_compression_enabled")]
    pub enabled: bool,
    /// 圧縮に使う外部コマンド
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_compression_enabled() -> bool { true }
fn default_program() -> String { "ffmpeg".to_string() }
fn default_crf() -> u32 { 28 }
fn default_preset() -> String { "fast".to_string() }
fn default_timeout_secs() -> u64 { 300 }

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: default_compression_enabled(),
            program: default_program(),
            crf: default_crf(),
            preset: default_preset(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CompressionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// 出力パス未指定時の保存先ディレクトリ
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf { std::env::temp_dir().join("repform_videos") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// MoveNet ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
}

fn default_model_path() -> PathBuf { PathBuf::from("models/movenet_lightning.onnx") }

impl Default for ModelConfig {
    fn default() -> Self {
        Self { path: default_model_path() }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// ファイルが無ければデフォルト、壊れていれば警告してデフォルト
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }
}
