pub mod counter;
pub mod form;
pub mod frame;
pub mod stats;

pub use counter::{CounterConfig, RepCounter, RepState, RepStats};
pub use form::{
    analyze_sequence, apply_check, score_value, to_percent, CheckResult, FormAnalyzer, FormQuality,
    FormReport, Quality, RepFormResult, SequenceAnalysis,
};
pub use frame::{analyze_frame, analyze_squat_frame, squat_phase, FrameAnalysis, FrameFormResult, SquatPhase};
pub use stats::{AngleStats, WindowStats};
