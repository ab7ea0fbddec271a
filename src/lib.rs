//! Tabular Q-learning on a bounded grid-world maze
//!
//! A [`GridEnvironment`](gym::GridEnvironment) describes the maze and a
//! [`TabularQLearner`](algo::tabular::TabularQLearner) learns to solve it:
//!
//! ```
//! use gridq::{
//!     algo::tabular::{QLearnerConfig, TabularQLearner},
//!     decay,
//!     gym::{Cell, GridEnvironment},
//! };
//!
//! let blocked = [(1, 1), (1, 2), (2, 2), (3, 1), (4, 3)].map(Cell::from);
//! let env = GridEnvironment::new(6, 6, blocked, Cell::new(0, 0), Cell::new(5, 5))?;
//! let config: QLearnerConfig<decay::Constant> = QLearnerConfig::default();
//! let mut agent = TabularQLearner::from_seed(env, config, 13)?;
//!
//! agent.train();
//! let policy = agent.greedy_policy();
//! println!("{}", agent.env().render_policy(&policy));
//! # Ok::<(), gridq::Error>(())
//! ```

/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Environment
pub mod env;

/// Exploration policies
pub mod exploration;

/// Transitions
pub mod memory;

/// Grid-world environments
pub mod gym;

mod error;
mod util;

pub use error::{Error, Result};
