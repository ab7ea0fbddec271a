pub mod q_learning;
pub mod q_table;

pub use q_learning::{
    EpisodeReport, Phase, QLearnerConfig, Rollout, TabularQLearner, TrainingOutcome,
};
pub use q_table::QTable;
