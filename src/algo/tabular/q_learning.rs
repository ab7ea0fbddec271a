use std::ops::ControlFlow;

use log::{debug, info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    decay::{self, Decay},
    env::{DiscreteActionSpace, DiscreteStateSpace, Environment},
    exploration::{Choice, EpsilonGreedy},
    memory::Exp,
    util::check_interval,
    Error, Result,
};

use super::QTable;

/// Configuration for the [`TabularQLearner`]
#[derive(Debug, Clone)]
pub struct QLearnerConfig<D: Decay> {
    /// Exploration policy, evaluated once per episode
    ///
    /// **Default**: constant ε of `0.2`
    pub exploration: EpsilonGreedy<D>,
    /// Learning rate α, in `(0, 1]`
    ///
    /// **Default**: `0.5`
    pub alpha: f64,
    /// Discount factor γ, in `[0, 1]`
    ///
    /// **Default**: `0.95`
    pub gamma: f64,
    /// Number of episodes to train for
    ///
    /// **Default**: `1500`
    pub episodes: u32,
    /// Step cap per episode, ending episodes that have not reached a terminal state
    ///
    /// **Default**: `300`
    pub max_steps: u32,
    /// Stop early once an episode reaches a terminal state while moving no value by this much
    ///
    /// **Default**: `None`
    pub tolerance: Option<f64>,
}

impl Default for QLearnerConfig<decay::Constant> {
    fn default() -> Self {
        Self::with_exploration(EpsilonGreedy::new(decay::Constant::new(0.2)))
    }
}

impl<D: Decay> QLearnerConfig<D> {
    /// Default numeric settings around an exploration policy of any schedule type
    pub fn with_exploration(exploration: EpsilonGreedy<D>) -> Self {
        Self {
            exploration,
            alpha: 0.5,
            gamma: 0.95,
            episodes: 1500,
            max_steps: 300,
            tolerance: None,
        }
    }
}

/// Lifecycle of a [`TabularQLearner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No episode has run yet
    Idle,
    /// Episodes remain in the budget
    Training,
    /// Training stopped early on the convergence tolerance
    Converged,
    /// The episode budget is used up
    Exhausted,
}

/// How a call to [`train`](TabularQLearner::train) ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingOutcome {
    Converged { episodes: u32 },
    Exhausted { episodes: u32 },
    /// The observer asked to stop; training can be resumed
    Cancelled { episodes: u32 },
}

/// Summary of a single training episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeReport {
    /// Zero-based episode number
    pub episode: u32,
    pub steps: u32,
    /// Undiscounted sum of rewards
    pub total_reward: f64,
    /// Whether the episode ended in a terminal state rather than at the step cap
    pub terminal: bool,
    /// Largest absolute change applied to a single value
    pub max_delta: f64,
}

/// A greedy trajectory through the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout<S> {
    /// Visited states, starting with the initial state
    pub states: Vec<S>,
    /// Undiscounted sum of rewards
    pub total_reward: f64,
    /// Whether a terminal state was reached
    pub terminal: bool,
}

impl<S> Rollout<S> {
    pub fn steps(&self) -> usize {
        self.states.len() - 1
    }
}

/// A Q-learning agent that learns a dense value table for a finite environment
///
/// The agent owns its environment and drives it through episodes: every episode starts from
/// [`reset`](Environment::reset), chooses actions epsilon-greedily and folds each transition
/// into the table with the off-policy update
///
/// Q(s,a) ← (1 - α)Q(s,a) + α(r + γ max<sub>a'</sub> Q(s',a'))
///
/// where the future term is dropped when s' is terminal.
///
/// ### Generics
/// - `E` - The [`Environment`] in which the agent will learn, with indexable states and a fixed action list
/// - `D` - The [`Decay`] strategy of the exploration rate
/// - `R` - The random number generator behind exploration, the only source of randomness
pub struct TabularQLearner<E, D = decay::Constant, R = StdRng>
where
    E: Environment + DiscreteActionSpace + DiscreteStateSpace,
    D: Decay,
    R: Rng,
{
    env: E,
    actions: Vec<E::Action>,
    q_table: QTable,
    exploration: EpsilonGreedy<D>,
    alpha: f64,
    gamma: f64,
    episodes: u32,
    max_steps: u32,
    tolerance: Option<f64>,
    rng: R,
    episode: u32,
    phase: Phase,
}

impl<E, D> TabularQLearner<E, D, StdRng>
where
    E: Environment + DiscreteActionSpace + DiscreteStateSpace,
    D: Decay,
{
    /// Initialize a learner whose exploration draws from a [`StdRng`] seeded with `seed`
    pub fn from_seed(env: E, config: QLearnerConfig<D>, seed: u64) -> Result<Self> {
        Self::new(env, config, StdRng::seed_from_u64(seed))
    }
}

impl<E, D, R> TabularQLearner<E, D, R>
where
    E: Environment + DiscreteActionSpace + DiscreteStateSpace,
    D: Decay,
    R: Rng,
{
    /// Initialize a new learner in a given environment
    ///
    /// **Errors** with [`Error::InvalidHyperparameter`] if `alpha` is not in `(0,1]`, `gamma` is
    /// not in `[0,1]`, the exploration schedule leaves `[0,1]`, the episode budget or step cap
    /// is zero, the tolerance is not positive, or the environment offers no actions
    pub fn new(env: E, config: QLearnerConfig<D>, rng: R) -> Result<Self> {
        let QLearnerConfig {
            exploration,
            alpha,
            gamma,
            episodes,
            max_steps,
            tolerance,
        } = config;

        check_interval!(alpha, > 0.0, 1.0);
        check_interval!(gamma, 0.0, 1.0);
        exploration.validate()?;
        check_count("episodes", episodes as usize)?;
        check_count("max_steps", max_steps as usize)?;
        if let Some(tolerance) = tolerance {
            check_interval!(tolerance, > 0.0, f64::MAX);
        }

        let actions = env.actions();
        check_count("actions", actions.len())?;
        let q_table = QTable::new(env.num_states(), actions.len());

        Ok(Self {
            env,
            actions,
            q_table,
            exploration,
            alpha,
            gamma,
            episodes,
            max_steps,
            tolerance,
            rng,
            episode: 0,
            phase: Phase::Idle,
        })
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of completed episodes
    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// Exploration rate for the next episode
    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon(self.episode)
    }

    /// Choose an action index based on the current state index and exploration policy
    fn act(&mut self, state: usize) -> usize {
        match self.exploration.choose(self.episode, &mut self.rng) {
            Choice::Explore => self.rng.gen_range(0..self.actions.len()),
            Choice::Exploit => self.q_table.argmax(state),
        }
    }

    /// Learn from a given experience and update the table
    ///
    /// **Returns** the absolute change of the updated value
    fn learn(&mut self, experience: Exp<usize, usize>) -> f64 {
        let Exp {
            state,
            action,
            next_state,
            reward,
            terminal,
        } = experience;

        let q_value = self.q_table.get(state, action);
        let max_next_q = if terminal {
            0.0
        } else {
            self.q_table.max(next_state)
        };
        let new_q_value = reward + self.gamma * max_next_q;
        let weighted_q_value = (1.0 - self.alpha) * q_value + self.alpha * new_q_value;

        self.q_table.set(state, action, weighted_q_value);
        (weighted_q_value - q_value).abs()
    }

    /// Run a single training episode
    ///
    /// **Returns** `None` without touching the environment once training has converged or the
    /// episode budget is used up
    pub fn go(&mut self) -> Option<EpisodeReport> {
        if matches!(self.phase, Phase::Converged | Phase::Exhausted) {
            return None;
        }
        self.phase = Phase::Training;

        let mut report = EpisodeReport {
            episode: self.episode,
            steps: 0,
            total_reward: 0.0,
            terminal: false,
            max_delta: 0.0,
        };

        let start = self.env.reset();
        let mut state = self.env.state_index(start);
        while !report.terminal && report.steps < self.max_steps {
            let action = self.act(state);
            let (next, reward, terminal) = self.env.step(self.actions[action]);
            let next_state = self.env.state_index(next);

            let delta = self.learn(Exp {
                state,
                action,
                next_state,
                reward,
                terminal,
            });

            report.steps += 1;
            report.total_reward += reward;
            report.terminal = terminal;
            report.max_delta = report.max_delta.max(delta);
            state = next_state;
        }

        self.episode += 1;
        trace!(
            "episode {}: {} steps, reward {:.3}, terminal {}, max delta {:.3e}",
            report.episode,
            report.steps,
            report.total_reward,
            report.terminal,
            report.max_delta
        );

        if self
            .tolerance
            .is_some_and(|tolerance| report.terminal && report.max_delta < tolerance)
        {
            self.phase = Phase::Converged;
        } else if self.episode >= self.episodes {
            self.phase = Phase::Exhausted;
        }

        Some(report)
    }

    /// Train until convergence or until the episode budget is used up
    pub fn train(&mut self) -> TrainingOutcome {
        self.train_with(|_| ControlFlow::Continue(()))
    }

    /// Train like [`train`](Self::train), handing every episode's report to `observer`
    ///
    /// Returning [`ControlFlow::Break`] from the observer cancels training after that episode.
    /// The table keeps everything learned so far and a later call resumes where this one stopped.
    pub fn train_with<F>(&mut self, mut observer: F) -> TrainingOutcome
    where
        F: FnMut(&EpisodeReport) -> ControlFlow<()>,
    {
        info!(
            "training from episode {} of {} (α = {}, γ = {}, ε = {:.3})",
            self.episode,
            self.episodes,
            self.alpha,
            self.gamma,
            self.epsilon()
        );

        while let Some(report) = self.go() {
            if observer(&report).is_break() && self.phase == Phase::Training {
                debug!("training cancelled after {} episodes", self.episode);
                return TrainingOutcome::Cancelled {
                    episodes: self.episode,
                };
            }
        }

        let episodes = self.episode;
        if self.phase == Phase::Converged {
            info!("training converged after {episodes} episodes");
            TrainingOutcome::Converged { episodes }
        } else {
            info!("training exhausted its budget of {episodes} episodes");
            TrainingOutcome::Exhausted { episodes }
        }
    }

    /// Greedy action in `state`, ties going to the action listed first
    pub fn policy(&self, state: E::State) -> E::Action {
        self.actions[self.q_table.argmax(self.env.state_index(state))]
    }

    /// Greedy action for every state, indexed by [`state_index`](DiscreteStateSpace::state_index)
    pub fn greedy_policy(&self) -> Vec<E::Action> {
        (0..self.q_table.num_states())
            .map(|s| self.actions[self.q_table.argmax(s)])
            .collect()
    }

    /// Follow the greedy policy from a fresh episode for at most `max_steps` steps
    ///
    /// The value table is left untouched.
    pub fn rollout(&mut self) -> Rollout<E::State> {
        let mut state = self.env.reset();
        let mut rollout = Rollout {
            states: vec![state],
            total_reward: 0.0,
            terminal: false,
        };

        for _ in 0..self.max_steps {
            let action = self.policy(state);
            let (next, reward, terminal) = self.env.step(action);
            rollout.states.push(next);
            rollout.total_reward += reward;
            state = next;
            if terminal {
                rollout.terminal = true;
                break;
            }
        }

        rollout
    }
}

fn check_count(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidHyperparameter {
            name,
            value: 0.0,
            interval: "[1, inf)",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        env::tests::Corridor,
        gym::{Cell, GridEnvironment},
    };

    use super::*;

    fn maze() -> GridEnvironment {
        let blocked = [(1, 1), (1, 2), (2, 2), (3, 1), (4, 3)].map(Cell::from);
        GridEnvironment::new(6, 6, blocked, Cell::new(0, 0), Cell::new(5, 5)).unwrap()
    }

    fn config() -> QLearnerConfig<decay::Constant> {
        QLearnerConfig::default()
    }

    fn explore(epsilon: f64) -> QLearnerConfig<decay::Constant> {
        QLearnerConfig::with_exploration(EpsilonGreedy::new(decay::Constant::new(epsilon)))
    }

    fn tweak(
        f: impl FnOnce(&mut QLearnerConfig<decay::Constant>),
    ) -> QLearnerConfig<decay::Constant> {
        let mut config = config();
        f(&mut config);
        config
    }

    /// An environment with a single state and nothing to do in it
    struct Inert;

    impl Environment for Inert {
        type State = ();
        type Action = ();

        fn step(&mut self, _action: ()) -> ((), f64, bool) {
            ((), 0.0, true)
        }

        fn reset(&mut self) {}
    }

    impl DiscreteActionSpace for Inert {
        fn actions(&self) -> Vec<()> {
            Vec::new()
        }
    }

    impl DiscreteStateSpace for Inert {
        fn num_states(&self) -> usize {
            1
        }

        fn state_index(&self, _state: ()) -> usize {
            0
        }
    }

    #[test]
    fn q_learning_update() {
        let config = QLearnerConfig {
            alpha: 0.5,
            gamma: 0.9,
            ..config()
        };
        let mut agent = TabularQLearner::from_seed(Corridor::new(3), config, 0).unwrap();
        agent.q_table.set(1, 0, 1.0);
        agent.q_table.set(1, 1, 2.0);
        agent.q_table.set(0, 1, 0.4);

        let exp = Exp {
            state: 0,
            action: 1,
            next_state: 1,
            reward: -0.1,
            terminal: false,
        };
        let delta = agent.learn(exp);
        // 0.5 * 0.4 + 0.5 * (-0.1 + 0.9 * 2.0)
        let value = agent.q_table.get(0, 1);
        assert!((value - 1.05).abs() < 1e-12, "Bootstraps from max next value");
        assert!((delta - 0.65).abs() < 1e-12, "Reports the change");

        agent.learn(Exp {
            state: 1,
            action: 1,
            next_state: 2,
            reward: 1.0,
            terminal: true,
        });
        // 0.5 * 2.0 + 0.5 * 1.0, no future value past a terminal state
        assert_eq!(agent.q_table.get(1, 1), 1.5, "Terminal transitions do not bootstrap");
    }

    #[test]
    fn q_learning_stops_at_terminal() {
        let mut agent = TabularQLearner::from_seed(Corridor::new(4), explore(0.5), 3).unwrap();
        for _ in 0..200 {
            let report = agent.go().expect("Budget not exhausted");
            assert!(report.steps <= 300, "Step cap holds");
            if report.terminal {
                assert_eq!(report.total_reward, 1.0, "Terminal reward counted once");
            }
        }
        assert_eq!(agent.episode(), 200);
        assert_eq!(agent.phase(), Phase::Training);
    }

    #[test]
    fn q_learning_step_cap() {
        let config = QLearnerConfig {
            max_steps: 5,
            ..explore(0.0)
        };
        let mut agent = TabularQLearner::from_seed(Corridor::new(1000), config, 0).unwrap();
        let report = agent.go().unwrap();
        assert_eq!(report.steps, 5, "Episode is cut at the step cap");
        assert!(!report.terminal);
    }

    #[test]
    fn q_learning_rejects_bad_config() {
        let build = |config: QLearnerConfig<decay::Constant>| {
            TabularQLearner::from_seed(maze(), config, 0).map(|_| ())
        };
        let rejects = |config: QLearnerConfig<decay::Constant>, name: &str| {
            let result = build(config);
            assert!(
                matches!(result, Err(Error::InvalidHyperparameter { name: n, .. }) if n == name),
                "`{name}` rejected"
            )
        };

        assert!(build(config()).is_ok());
        rejects(tweak(|c| c.alpha = 0.0), "alpha");
        rejects(tweak(|c| c.alpha = 1.5), "alpha");
        rejects(tweak(|c| c.gamma = -0.1), "gamma");
        rejects(tweak(|c| c.gamma = 1.01), "gamma");
        rejects(explore(1.5), "max_epsilon");
        rejects(explore(-0.5), "min_epsilon");
        rejects(tweak(|c| c.episodes = 0), "episodes");
        rejects(tweak(|c| c.max_steps = 0), "max_steps");
        rejects(tweak(|c| c.tolerance = Some(0.0)), "tolerance");

        let closed = QLearnerConfig {
            alpha: 1.0,
            gamma: 0.0,
            ..explore(1.0)
        };
        assert!(build(closed).is_ok(), "Closed bounds accepted");
    }

    #[test]
    fn q_learning_rejects_growing_exploration() {
        let growing = decay::Exponential::new(-0.1, 0.1, 0.5).unwrap();
        let config = QLearnerConfig::with_exploration(EpsilonGreedy::new(growing));
        assert!(
            matches!(
                TabularQLearner::from_seed(maze(), config, 0),
                Err(Error::InvalidHyperparameter { name: "min_epsilon", .. })
            ),
            "Schedule leaving [0, 1] rejected"
        );
    }

    #[test]
    fn q_learning_rejects_empty_action_space() {
        assert!(matches!(
            TabularQLearner::from_seed(Inert, config(), 0),
            Err(Error::InvalidHyperparameter { name: "actions", .. })
        ));
    }

    #[test]
    fn q_learning_deterministic() {
        let train = |seed| {
            let config = tweak(|c| c.episodes = 300);
            let mut agent = TabularQLearner::from_seed(maze(), config, seed).unwrap();
            agent.train();
            agent.q_table().clone()
        };

        assert_eq!(train(42), train(42), "Same seed, same table");
        assert_ne!(train(42), train(43), "Different seed, different table");
    }

    #[test]
    fn q_learning_solves_maze() {
        let mut agent = TabularQLearner::from_seed(maze(), config(), 13).unwrap();
        assert_eq!(agent.phase(), Phase::Idle);

        let outcome = agent.train();
        assert_eq!(outcome, TrainingOutcome::Exhausted { episodes: 1500 });
        assert_eq!(agent.phase(), Phase::Exhausted);

        let rollout = agent.rollout();
        let env = agent.env();
        let (start, goal) = (env.start(), env.goal());
        assert!(rollout.terminal, "Greedy rollout reaches the goal");
        assert_eq!(rollout.states.first(), Some(&start));
        assert_eq!(rollout.states.last(), Some(&goal));
        assert!(
            rollout.states.iter().all(|&cell| !env.is_blocked(cell)),
            "Rollout avoids blocked cells"
        );
        assert!(rollout.steps() <= 300, "Rollout fits the step cap");
        assert!(
            rollout.steps() <= start.distance(goal) + env.width() + env.height(),
            "Rollout of {} steps is close to the shortest path",
            rollout.steps()
        );
    }

    #[test]
    fn q_learning_goal_reward_dominates() {
        let mut agent = TabularQLearner::from_seed(maze(), config(), 13).unwrap();
        agent.train();
        let rollout = agent.rollout();
        assert!(rollout.terminal);
        assert!(rollout.total_reward.is_finite());

        // Same number of steps pressed against the top border, never reaching the goal
        let mut env = maze();
        env.reset();
        let wandering: f64 = (0..rollout.steps())
            .map(|_| env.step(crate::gym::Action::Up))
            .inspect(|&(_, _, terminal)| assert!(!terminal))
            .map(|(_, reward, _)| reward)
            .sum();

        assert!(rollout.total_reward > wandering, "Reaching the goal pays more than wandering");
    }

    #[test]
    fn q_learning_policy_is_idempotent() {
        let config = tweak(|c| c.episodes = 200);
        let mut agent = TabularQLearner::from_seed(maze(), config, 1).unwrap();
        agent.train();

        let table = agent.q_table().clone();
        let first = agent.greedy_policy();
        let second = agent.greedy_policy();
        assert_eq!(first, second, "Extraction is repeatable");
        assert_eq!(first.len(), 36);

        agent.rollout();
        assert_eq!(agent.greedy_policy(), first, "Rollout does not change the policy");
        assert_eq!(agent.q_table(), &table, "Rollout does not learn");
        assert_eq!(agent.policy(Cell::new(0, 0)), first[0]);
    }

    #[test]
    fn q_learning_cancel_and_resume() {
        let config = tweak(|c| c.episodes = 10);
        let mut agent = TabularQLearner::from_seed(maze(), config, 5).unwrap();

        let mut seen = Vec::new();
        let outcome = agent.train_with(|report| {
            seen.push(report.episode);
            if report.episode == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(outcome, TrainingOutcome::Cancelled { episodes: 3 });
        assert_eq!(seen, vec![0, 1, 2], "Observer sees every episode");
        assert_eq!(agent.phase(), Phase::Training, "Cancelled training can resume");

        assert_eq!(agent.train(), TrainingOutcome::Exhausted { episodes: 10 });
        assert!(agent.go().is_none(), "No episodes past the budget");
        assert_eq!(agent.train(), TrainingOutcome::Exhausted { episodes: 10 });
    }

    #[test]
    fn q_learning_converges_early() {
        let config = QLearnerConfig {
            alpha: 1.0,
            gamma: 0.5,
            episodes: 500,
            max_steps: 100,
            tolerance: Some(1e-9),
            ..explore(1.0)
        };
        let mut agent = TabularQLearner::from_seed(Corridor::new(3), config, 11).unwrap();

        let outcome = agent.train();
        assert!(
            matches!(outcome, TrainingOutcome::Converged { episodes } if episodes < 500),
            "Converged before the budget, got {outcome:?}"
        );
        assert_eq!(agent.phase(), Phase::Converged);
        assert_eq!(agent.q_table().get(0, 1), 0.5, "Moving right is settled");
        assert_eq!(agent.q_table().get(1, 1), 1.0, "Reaching the end is settled");
    }

    #[test]
    fn q_learning_decaying_exploration() {
        let schedule = decay::Linear::new(0.01, 1.0, 0.1).unwrap();
        let config = QLearnerConfig {
            episodes: 100,
            ..QLearnerConfig::with_exploration(EpsilonGreedy::new(schedule))
        };
        let mut agent = TabularQLearner::from_seed(maze(), config, 2).unwrap();
        assert_eq!(agent.epsilon(), 1.0);
        agent.train();
        assert!((agent.epsilon() - 0.1).abs() < 1e-12, "Exploration decays per episode");
    }
}
