pub mod profile;
pub mod rules;

pub use profile::{
    lookup, resolve, supported_exercises, Category, Exercise, ExerciseInfo, ExerciseProfile,
};
pub use rules::{AngleRange, AngleTarget, Feedback, FormCheck, FormRuleSet, Phase};
