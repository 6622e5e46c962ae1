use std::fs;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::CompressionConfig;
use crate::error::CompressionError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 書き出し済み動画を小さくする外部コラボレータ
pub trait Compressor {
    /// 圧縮後のパスを返す。入力ファイルには触れない
    fn compress(&self, input: &Path) -> Result<PathBuf, CompressionError>;
}

/// ffmpeg (H.264) による再エンコード
#[derive(Debug, Clone)]
pub struct FfmpegCompressor {
    program: String,
    crf: u32,
    preset: String,
    timeout: Duration,
}

impl FfmpegCompressor {
    pub fn new(config: &CompressionConfig) -> Self {
        Self {
            program: config.program.clone(),
            crf: config.crf,
            preset: config.preset.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `<stem>_compressed.<ext>`
    pub fn compressed_path(input: &Path) -> PathBuf {
        let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
        let name = match input.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}_compressed.{}", stem, ext),
            None => format!("{}_compressed", stem),
        };
        input.with_file_name(name)
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input)
            .args(["-c:v", "libx264"])
            .arg("-crf")
            .arg(self.crf.to_string())
            .arg("-preset")
            .arg(&self.preset)
            .args(["-movflags", "+faststart"])
            .args(["-pix_fmt", "yuv420p"])
            .arg("-y")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Compressor for FfmpegCompressor {
    fn compress(&self, input: &Path) -> Result<PathBuf, CompressionError> {
        let output = Self::compressed_path(input);
        let mut child = match self.command(input, &output).spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CompressionError::Unavailable(self.program.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        // stderr が詰まらないよう別スレッドで読み切る
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let status = match wait_with_timeout(&mut child, self.timeout, POLL_INTERVAL) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = fs::remove_file(&output);
                return Err(CompressionError::Timeout(self.timeout));
            }
            Err(e) => {
                let _ = fs::remove_file(&output);
                return Err(e.into());
            }
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let _ = fs::remove_file(&output);
            return Err(CompressionError::Failed {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(output)
    }
}

/// 最終的に残る動画
#[derive(Debug, Clone, PartialEq)]
pub struct FinalOutput {
    pub path: PathBuf,
    pub compressed: bool,
}

/// 終了待ちの対象になる子プロセス
trait Supervised {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
    fn kill(&mut self) -> io::Result<()>;
    fn wait(&mut self) -> io::Result<ExitStatus>;
}

impl Supervised for Child {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Child::try_wait(self)
    }

    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        Child::wait(self)
    }
}

/// 終了を待つ。タイムアウトなら None。
///
/// タイムアウトでも `try_wait` の失敗でも、戻る前に kill して回収する。
fn wait_with_timeout<P: Supervised>(
    child: &mut P,
    timeout: Duration,
    poll: Duration,
) -> io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                reap(child);
                return Err(e);
            }
        }
        if started.elapsed() >= timeout {
            reap(child);
            return Ok(None);
        }
        thread::sleep(poll);
    }
}

fn reap<P: Supervised>(child: &mut P) {
    let _ = child.kill();
    let _ = child.wait();
}

/// 圧縮に成功したら未圧縮ファイルを消して差し替え、失敗したら未圧縮のまま残す
pub fn finalize_output<C: Compressor + ?Sized>(raw: &Path, compressor: &C) -> FinalOutput {
    info!("Compressing video: {}", raw.display());
    match compressor.compress(raw) {
        Ok(path) => {
            if path != raw {
                log_reduction(raw, &path);
                if let Err(e) = fs::remove_file(raw) {
                    warn!("Failed to remove uncompressed video {}: {}", raw.display(), e);
                }
            }
            FinalOutput {
                path,
                compressed: true,
            }
        }
        Err(e) => {
            warn!("{}, keeping uncompressed video", e);
            FinalOutput {
                path: raw.to_path_buf(),
                compressed: false,
            }
        }
    }
}

fn log_reduction(raw: &Path, compressed: &Path) {
    let (Ok(original), Ok(reduced)) = (fs::metadata(raw), fs::metadata(compressed)) else {
        return;
    };
    let original = original.len() as f64;
    let reduced = reduced.len() as f64;
    if original > 0.0 {
        info!(
            "Compression complete: {:.1} MB -> {:.1} MB ({:.1}% smaller)",
            original / 1024.0 / 1024.0,
            reduced / 1024.0 / 1024.0,
            (1.0 - reduced / original) * 100.0
        );
    }
}
