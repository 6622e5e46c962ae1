use serde::Serialize;
use std::fmt;

use crate::exercise::ExerciseProfile;

/// レップカウンタの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RepState {
    Start,
    Down,
    Up,
}

impl RepState {
    pub fn name(self) -> &'static str {
        match self {
            RepState::Start => "START",
            RepState::Down => "DOWN",
            RepState::Up => "UP",
        }
    }
}

impl fmt::Display for RepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ヒステリシスのしきい値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterConfig {
    pub down_threshold: f32,
    pub up_threshold: f32,
    pub min_frames_down: u32,
    pub min_frames_up: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            down_threshold: 160.0,
            up_threshold: 40.0,
            min_frames_down: 3,
            min_frames_up: 3,
        }
    }
}

impl From<&ExerciseProfile> for CounterConfig {
    fn from(profile: &ExerciseProfile) -> Self {
        Self {
            down_threshold: profile.down_threshold,
            up_threshold: profile.up_threshold,
            min_frames_down: profile.min_frames_down,
            min_frames_up: profile.min_frames_up,
        }
    }
}

/// カウンタの集計スナップショット
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepStats {
    pub total_reps: usize,
    pub state: RepState,
    pub rep_timestamps: Vec<usize>,
    pub angle_history: Vec<f32>,
}

/// 追跡角のストリームからレップを数える状態機械
///
/// 角度が `down_threshold` を超える状態が `min_frames_down` フレーム続くと DOWN、
/// その後 `up_threshold` を下回る状態が `min_frames_up` フレーム続くと1レップ。
/// 2つのしきい値の間（不感帯）に入るとどちらの連続カウントもリセットされる。
#[derive(Debug, Clone)]
pub struct RepCounter {
    config: CounterConfig,
    state: RepState,
    down_frames: u32,
    up_frames: u32,
    rep_count: usize,
    rep_timestamps: Vec<usize>,
    angle_history: Vec<f32>,
}

impl RepCounter {
    pub fn new(config: CounterConfig) -> Self {
        Self {
            config,
            state: RepState::Start,
            down_frames: 0,
            up_frames: 0,
            rep_count: 0,
            rep_timestamps: Vec::new(),
            angle_history: Vec::new(),
        }
    }

    pub fn from_profile(profile: &ExerciseProfile) -> Self {
        Self::new(CounterConfig::from(profile))
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// 1フレーム分の角度を入力する。このフレームでレップが完了したら true
    pub fn update(&mut self, angle: f32, frame_index: usize) -> bool {
        self.angle_history.push(angle);

        if angle > self.config.down_threshold {
            self.down_frames += 1;
            self.up_frames = 0;
        } else if angle < self.config.up_threshold {
            self.up_frames += 1;
            self.down_frames = 0;
        } else {
            self.down_frames = 0;
            self.up_frames = 0;
        }

        match self.state {
            RepState::Start | RepState::Up => {
                if self.down_frames >= self.config.min_frames_down {
                    self.state = RepState::Down;
                }
                false
            }
            RepState::Down => {
                if self.up_frames >= self.config.min_frames_up {
                    self.state = RepState::Up;
                    debug_assert!(
                        self.rep_timestamps.last().map_or(true, |&last| last < frame_index),
                        "frame indices must be strictly increasing"
                    );
                    self.rep_count += 1;
                    self.rep_timestamps.push(frame_index);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn count(&self) -> usize {
        self.rep_count
    }

    pub fn state(&self) -> RepState {
        self.state
    }

    pub fn rep_timestamps(&self) -> &[usize] {
        &self.rep_timestamps
    }

    pub fn angle_history(&self) -> &[f32] {
        &self.angle_history
    }

    pub fn stats(&self) -> RepStats {
        RepStats {
            total_reps: self.rep_count,
            state: self.state,
            rep_timestamps: self.rep_timestamps.clone(),
            angle_history: self.angle_history.clone(),
        }
    }
}
