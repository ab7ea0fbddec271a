/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time, episodic MDP with one agent.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State: Copy;

    /// A representation of an action that an agent can take to affect the environment
    type Action: Copy;

    /// Update the environment in response to an action taken by an agent, producing a new state and associated reward
    ///
    /// **Returns** `(next_state, reward, terminal)`
    fn step(&mut self, action: Self::Action) -> (Self::State, f64, bool);

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

/// An environment with a fixed, finite, ordered set of actions
pub trait DiscreteActionSpace: Environment {
    /// Get the actions available in every state
    ///
    /// The order is significant: an action's position is its index in a value table, and ties
    /// between equally valued actions are broken in favor of the lowest index.
    /// The returned list should never be empty.
    fn actions(&self) -> Vec<Self::Action>;
}

/// An environment with a finite state space that can be densely indexed
pub trait DiscreteStateSpace: Environment {
    /// Total number of states
    fn num_states(&self) -> usize;

    /// Index of `state` in `0..num_states()`
    fn state_index(&self, state: Self::State) -> usize;
}
