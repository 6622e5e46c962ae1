//! Video collaborators: frame sources and sinks, overlay rasterization,
//! and post-write compression.

pub mod compress;
#[cfg(feature = "desktop")]
pub mod capture;

pub use compress::{finalize_output, Compressor, FfmpegCompressor, FinalOutput};
#[cfg(feature = "desktop")]
pub use capture::OpenCvBackend;

use anyhow::Result;
use std::path::Path;

use crate::render::FrameOverlay;

/// 入力動画のメタデータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// コンテナが報告するフレーム数（不明なら None）
    pub frame_count: Option<usize>,
}

/// 先頭から順にフレームを返す入力
pub trait FrameSource {
    type Frame;

    fn info(&self) -> VideoInfo;

    /// 次のフレーム。終端なら None
    fn read(&mut self) -> Result<Option<Self::Frame>>;

    /// 先頭に戻す
    fn rewind(&mut self) -> Result<()>;
}

/// フレームの書き出し先
pub trait FrameSink<F> {
    fn write(&mut self, frame: &F) -> Result<()>;

    /// コンテナを閉じる
    fn finish(&mut self) -> Result<()>;
}

/// 動画の読み書きと描画をまとめたバックエンド
pub trait VideoBackend {
    type Frame;
    type Source: FrameSource<Frame = Self::Frame>;
    type Sink: FrameSink<Self::Frame>;

    fn open(&self, path: &Path) -> Result<Self::Source>;

    /// 入力と同じ fps・解像度で書き出し先を作る
    fn create(&self, path: &Path, info: &VideoInfo) -> Result<Self::Sink>;

    fn annotate(&self, frame: &mut Self::Frame, overlay: &FrameOverlay) -> Result<()>;
}
