use anyhow::{bail, Result};
use std::cell::{Cell, RefCell};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use repform::config::Config;
use repform::error::CompressionError;
use repform::pose::{Keypoint, KeypointIndex, Pose, PoseEstimator};
use repform::render::FrameOverlay;
use repform::video::{Compressor, FrameSink, FrameSource, VideoBackend, VideoInfo};
use repform::{AnalysisRequest, VideoAnalyzer};

/// 何フレーム目かだけを持つダミーフレーム
struct FakeFrame {
    index: usize,
}

struct FakeSource {
    total: usize,
    next: usize,
}

impl FrameSource for FakeSource {
    type Frame = FakeFrame;

    fn info(&self) -> VideoInfo {
        VideoInfo {
            fps: 10.0,
            width: 640,
            height: 480,
            frame_count: Some(self.total),
        }
    }

    fn read(&mut self) -> Result<Option<FakeFrame>> {
        if self.next >= self.total {
            return Ok(None);
        }
        let frame = FakeFrame { index: self.next };
        self.next += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<()> {
        self.next = 0;
        Ok(())
    }
}

struct FakeSink {
    path: PathBuf,
}

impl FrameSink<FakeFrame> for FakeSink {
    fn write(&mut self, frame: &FakeFrame) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "frame {}", frame.index)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// 描画されたオーバーレイを記録するバックエンド
struct FakeBackend {
    frames: usize,
    overlays: RefCell<Vec<FrameOverlay>>,
}

impl FakeBackend {
    fn new(frames: usize) -> Self {
        Self {
            frames,
            overlays: RefCell::new(Vec::new()),
        }
    }
}

impl VideoBackend for FakeBackend {
    type Frame = FakeFrame;
    type Source = FakeSource;
    type Sink = FakeSink;

    fn open(&self, path: &Path) -> Result<FakeSource> {
        if !path.exists() {
            bail!("cannot open {}", path.display());
        }
        Ok(FakeSource {
            total: self.frames,
            next: 0,
        })
    }

    fn create(&self, path: &Path, _info: &VideoInfo) -> Result<FakeSink> {
        fs::write(path, b"")?;
        Ok(FakeSink {
            path: path.to_path_buf(),
        })
    }

    fn annotate(&self, _frame: &mut FakeFrame, overlay: &FrameOverlay) -> Result<()> {
        self.overlays.borrow_mut().push(overlay.clone());
        Ok(())
    }
}

/// フレーム番号ごとに決めた膝角度の姿勢を返す
struct ScriptedEstimator {
    knee_angles: Vec<f32>,
    calls: Cell<usize>,
}

impl ScriptedEstimator {
    fn new(knee_angles: Vec<f32>) -> Self {
        Self {
            knee_angles,
            calls: Cell::new(0),
        }
    }
}

impl PoseEstimator<FakeFrame> for ScriptedEstimator {
    fn estimate(&mut self, frame: &FakeFrame) -> Result<Pose> {
        self.calls.set(self.calls.get() + 1);
        let Some(&degrees) = self.knee_angles.get(frame.index) else {
            bail!("no pose scripted for frame {}", frame.index);
        };
        Ok(squat_pose(degrees))
    }
}

/// 両膝が `degrees` になる姿勢（膝を頂点に腰は真上）
fn squat_pose(degrees: f32) -> Pose {
    use KeypointIndex::*;

    let mut pose = Pose::default();
    let r = degrees.to_radians();
    for (hip, knee, ankle, x) in [(LeftHip, LeftKnee, LeftAnkle, 0.4), (RightHip, RightKnee, RightAnkle, 0.6)] {
        let y = 0.6;
        pose.set(knee, Keypoint::new(x, y, 0.9));
        pose.set(hip, Keypoint::new(x, y - 0.1, 0.9));
        pose.set(ankle, Keypoint::new(x + 0.1 * r.sin(), y - 0.1 * r.cos(), 0.9));
    }
    pose.set(LeftShoulder, Keypoint::new(0.4, 0.3, 0.9));
    pose.set(RightShoulder, Keypoint::new(0.6, 0.3, 0.9));
    pose
}

/// 立位5フレーム、しゃがみ5フレームを2回
fn two_squats() -> Vec<f32> {
    let mut angles = Vec::new();
    for _ in 0..2 {
        angles.extend([178.0; 5]);
        angles.extend([80.0; 5]);
    }
    angles
}

struct CopyCompressor;

impl Compressor for CopyCompressor {
    fn compress(&self, input: &Path) -> Result<PathBuf, CompressionError> {
        let output = input.with_file_name("small.mp4");
        fs::copy(input, &output)?;
        Ok(output)
    }
}

struct MissingToolCompressor;

impl Compressor for MissingToolCompressor {
    fn compress(&self, _input: &Path) -> Result<PathBuf, CompressionError> {
        Err(CompressionError::Unavailable("ffmpeg".to_string()))
    }
}

fn input_file(dir: &Path) -> PathBuf {
    let input = dir.join("set1.mp4");
    fs::write(&input, b"video").unwrap();
    input
}

#[test]
fn test_estimates_once_per_frame_and_counts_reps() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let output = dir.path().join("out.mp4");
    let config = Config::default();

    let backend = FakeBackend::new(20);
    let mut estimator = ScriptedEstimator::new(two_squats());
    let request = AnalysisRequest::new(&input, "squats").with_output(&output);
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, None::<&CopyCompressor>, &config).analyze(&request);

    assert!(outcome.success, "{:?}", outcome.error);
    let result = outcome.result.unwrap();
    assert_eq!(estimator.calls.get(), 20);
    assert_eq!(result.frame_count, 20);
    assert_eq!(result.total_reps, 2);
    assert_eq!(result.rep_timestamps, vec![7, 17]);
    assert_eq!(result.angle_history.len(), 20);
    assert!((result.duration - 2.0).abs() < 1e-9);
    assert_eq!(result.exercise, "squats");
    assert_eq!(result.output_path, output);
    assert!(!result.compressed);

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 20);
}

#[test]
fn test_overlay_follows_rep_progress() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let config = Config::default();

    let backend = FakeBackend::new(20);
    let mut estimator = ScriptedEstimator::new(two_squats());
    let request = AnalysisRequest::new(&input, "squats").with_output(dir.path().join("out.mp4"));
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, None::<&CopyCompressor>, &config).analyze(&request);
    assert!(outcome.success);

    let overlays = backend.overlays.borrow();
    assert_eq!(overlays.len(), 20);
    for (i, overlay) in overlays.iter().enumerate() {
        assert!(overlay.has_text("Reps:"));
        assert_eq!(overlay.has_text("Form:"), i >= 7, "frame {}", i);
        assert_eq!(overlay.has_text("REP COMPLETE"), i == 7 || i == 17, "frame {}", i);
    }
    assert!(overlays[19].has_text("Reps: 2"));
}

#[test]
fn test_unreadable_input_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mp4");
    let config = Config::default();

    let backend = FakeBackend::new(20);
    let mut estimator = ScriptedEstimator::new(two_squats());
    let request = AnalysisRequest::new(dir.path().join("missing.mp4"), "squats").with_output(&output);
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, None::<&CopyCompressor>, &config).analyze(&request);

    assert!(!outcome.success);
    assert!(outcome.result.is_none());
    assert!(outcome.error.unwrap().contains("missing.mp4"));
    assert_eq!(estimator.calls.get(), 0);
    assert!(!output.exists());
}

#[test]
fn test_empty_video_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let output = dir.path().join("out.mp4");
    let config = Config::default();

    let backend = FakeBackend::new(0);
    let mut estimator = ScriptedEstimator::new(Vec::new());
    let request = AnalysisRequest::new(&input, "squats").with_output(&output);
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, None::<&CopyCompressor>, &config).analyze(&request);

    assert!(!outcome.success);
    assert!(!output.exists());
}

#[test]
fn test_estimation_failure_reports_frame() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let config = Config::default();

    let backend = FakeBackend::new(20);
    let mut estimator = ScriptedEstimator::new(vec![178.0; 12]);
    let request = AnalysisRequest::new(&input, "squats").with_output(dir.path().join("out.mp4"));
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, None::<&CopyCompressor>, &config).analyze(&request);

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("12"));
}

#[test]
fn test_compression_success_replaces_raw_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let raw = dir.path().join("out.mp4");
    let config = Config::default();

    let backend = FakeBackend::new(20);
    let mut estimator = ScriptedEstimator::new(two_squats());
    let request = AnalysisRequest::new(&input, "squats").with_output(&raw);
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, Some(&CopyCompressor), &config).analyze(&request);

    let result = outcome.result.unwrap();
    assert!(result.compressed);
    assert_eq!(result.output_path, dir.path().join("small.mp4"));
    assert!(result.output_path.exists());
    assert!(!raw.exists());
}

#[test]
fn test_compression_failure_keeps_raw_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let raw = dir.path().join("out.mp4");
    let config = Config::default();

    let backend = FakeBackend::new(20);
    let mut estimator = ScriptedEstimator::new(two_squats());
    let request = AnalysisRequest::new(&input, "squats").with_output(&raw);
    let outcome =
        VideoAnalyzer::new(&backend, &mut estimator, Some(&MissingToolCompressor), &config).analyze(&request);

    assert!(outcome.success);
    let result = outcome.result.unwrap();
    assert!(!result.compressed);
    assert_eq!(result.output_path, raw);
    assert!(raw.exists());
}

#[test]
fn test_compression_disabled_in_config() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let raw = dir.path().join("out.mp4");
    let mut config = Config::default();
    config.compression.enabled = false;

    let backend = FakeBackend::new(20);
    let mut estimator = ScriptedEstimator::new(two_squats());
    let request = AnalysisRequest::new(&input, "squats").with_output(&raw);
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, Some(&CopyCompressor), &config).analyze(&request);

    let result = outcome.result.unwrap();
    assert!(!result.compressed);
    assert_eq!(result.output_path, raw);
    assert!(!dir.path().join("small.mp4").exists());
}

#[test]
fn test_unknown_exercise_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let config = Config::default();

    let backend = FakeBackend::new(20);
    let mut estimator = ScriptedEstimator::new(two_squats());
    let request = AnalysisRequest::new(&input, "handstand").with_output(dir.path().join("out.mp4"));
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, None::<&CopyCompressor>, &config).analyze(&request);

    let result = outcome.result.unwrap();
    assert_eq!(result.exercise, "squats");
    assert_eq!(result.total_reps, 2);
}

#[test]
fn test_render_failure_removes_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let output = dir.path().join("out.mp4");
    let config = Config::default();

    // 11フレーム目の描画で失敗する
    struct FlakyBackend {
        inner: FakeBackend,
        opened: Cell<usize>,
    }

    impl VideoBackend for FlakyBackend {
        type Frame = FakeFrame;
        type Source = FakeSource;
        type Sink = FakeSink;

        fn open(&self, path: &Path) -> Result<FakeSource> {
            self.opened.set(self.opened.get() + 1);
            self.inner.open(path)
        }

        fn create(&self, path: &Path, info: &VideoInfo) -> Result<FakeSink> {
            self.inner.create(path, info)
        }

        fn annotate(&self, frame: &mut FakeFrame, overlay: &FrameOverlay) -> Result<()> {
            if frame.index == 10 {
                bail!("draw failed");
            }
            self.inner.annotate(frame, overlay)
        }
    }

    let backend = FlakyBackend {
        inner: FakeBackend::new(20),
        opened: Cell::new(0),
    };
    let mut estimator = ScriptedEstimator::new(two_squats());
    let request = AnalysisRequest::new(&input, "squats").with_output(&output);
    let outcome = VideoAnalyzer::new(&backend, &mut estimator, None::<&CopyCompressor>, &config).analyze(&request);

    assert!(!outcome.success);
    assert_eq!(backend.opened.get(), 1);
    assert!(!output.exists());
}
