use std::{collections::HashSet, fmt};

use strum::{EnumIter, VariantArray};

use crate::{
    env::{DiscreteActionSpace, DiscreteStateSpace, Environment},
    Error, Result,
};

/// A cell of the grid as `(row, col)`, with `(0, 0)` in the top left corner
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another cell
    pub fn distance(&self, other: Cell) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Moves available in every cell of a [`GridEnvironment`]
#[derive(EnumIter, VariantArray, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Action {
    /// `(Δrow, Δcol)` of the move
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Right => (0, 1),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
        }
    }

    pub fn arrow(&self) -> char {
        match self {
            Action::Up => '↑',
            Action::Right => '→',
            Action::Down => '↓',
            Action::Left => '←',
        }
    }
}

/// Rewards handed out by a [`GridEnvironment`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rewards {
    /// Cost of an ordinary move, including a move clamped at the border
    ///
    /// **Default**: `-0.01`
    pub step: f64,
    /// Penalty for bumping into a blocked cell, must be more negative than `step`
    ///
    /// **Default**: `-0.2`
    pub bump: f64,
    /// Reward for reaching the goal, must dominate the step costs of a reasonable path
    ///
    /// **Default**: `1.0`
    pub goal: f64,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            step: -0.01,
            bump: -0.2,
            goal: 1.0,
        }
    }
}

impl Rewards {
    /// Validate the rewards against a grid of the given size
    ///
    /// The goal reward has to exceed the cost of `2 * (width + height)` ordinary steps.
    fn validate(&self, width: usize, height: usize) -> Result<()> {
        let &Self { step, bump, goal } = self;
        let invalid = |reason: String| -> Result<()> { Err(Error::InvalidReward { reason }) };

        if ![step, bump, goal].iter().all(|r| r.is_finite()) {
            return invalid(format!("rewards must be finite, got {:?}", self));
        }
        if goal <= 0.0 {
            return invalid(format!("goal reward {goal} must be positive"));
        }
        if bump >= step {
            return invalid(format!(
                "bump penalty {bump} must be more negative than the step cost {step}"
            ));
        }
        let path_cost = step.abs() * (2 * (width + height)) as f64;
        if goal <= path_cost {
            let steps = 2 * (width + height);
            return invalid(format!(
                "goal reward {goal} does not dominate the cost {path_cost} of a {steps}-step path"
            ));
        }

        Ok(())
    }
}

/// A deterministic, fully observable maze on a `height × width` grid
///
/// The agent starts every episode at `start` and the episode ends when it reaches `goal`.
/// Moves that would leave the grid are clamped at the border. Moves into a blocked cell are
/// reverted: the agent stays where it is and receives the [`bump`](Rewards::bump) penalty.
#[derive(Debug, Clone)]
pub struct GridEnvironment {
    width: usize,
    height: usize,
    blocked: HashSet<Cell>,
    start: Cell,
    goal: Cell,
    rewards: Rewards,
    state: Cell,
}

impl GridEnvironment {
    /// Construct a grid with the [default](Rewards::default) rewards
    pub fn new(
        width: usize,
        height: usize,
        blocked: impl IntoIterator<Item = Cell>,
        start: Cell,
        goal: Cell,
    ) -> Result<Self> {
        Self::with_rewards(width, height, blocked, start, goal, Rewards::default())
    }

    /// Construct a grid with custom rewards
    pub fn with_rewards(
        width: usize,
        height: usize,
        blocked: impl IntoIterator<Item = Cell>,
        start: Cell,
        goal: Cell,
        rewards: Rewards,
    ) -> Result<Self> {
        let geometry = |reason: String| Error::InvalidGeometry { reason };
        let overlap = |reason: String| Error::UnreachableOrOverlappingCells { reason };

        if width == 0 || height == 0 {
            return Err(geometry(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }

        let env = Self {
            width,
            height,
            blocked: blocked.into_iter().collect(),
            start,
            goal,
            rewards,
            state: start,
        };

        for (name, cell) in [("start", start), ("goal", goal)] {
            if !env.contains(cell) {
                return Err(geometry(format!(
                    "{name} {cell} is outside the {width}x{height} grid"
                )));
            }
        }
        if let Some(cell) = env.blocked.iter().find(|&&c| !env.contains(c)) {
            return Err(geometry(format!(
                "blocked cell {cell} is outside the {width}x{height} grid"
            )));
        }
        if start == goal {
            return Err(overlap(format!("start and goal are both {start}")));
        }
        for (name, cell) in [("start", start), ("goal", goal)] {
            if env.is_blocked(cell) {
                return Err(overlap(format!("{name} {cell} is blocked")));
            }
        }
        rewards.validate(width, height)?;

        Ok(env)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn rewards(&self) -> Rewards {
        self.rewards
    }

    /// The agent's current position
    pub fn state(&self) -> Cell {
        self.state
    }

    /// Whether `cell` lies inside the grid
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.blocked.contains(&cell)
    }

    /// Inverse of [`state_index`](DiscreteStateSpace::state_index)
    pub fn cell_at(&self, index: usize) -> Cell {
        Cell::new(index / self.width, index % self.width)
    }

    /// Apply the move to `cell`, clamping each coordinate to the grid independently
    fn clamped_move(&self, cell: Cell, action: Action) -> Cell {
        let (dr, dc) = action.delta();
        Cell {
            row: (cell.row as isize + dr).clamp(0, self.height as isize - 1) as usize,
            col: (cell.col as isize + dc).clamp(0, self.width as isize - 1) as usize,
        }
    }

    /// Render a greedy policy, indexed by state, as a text grid
    ///
    /// `S` marks the start, `G` the goal and `#` blocked cells. Every other cell shows the
    /// arrow of its action.
    pub fn render_policy(&self, policy: &[Action]) -> String {
        assert_eq!(policy.len(), self.num_states(), "Policy covers every cell");

        let mut out = String::with_capacity(self.num_states() * 4);
        for row in 0..self.height {
            let line = (0..self.width)
                .map(|col| {
                    let cell = Cell::new(row, col);
                    if cell == self.start {
                        'S'
                    } else if cell == self.goal {
                        'G'
                    } else if self.is_blocked(cell) {
                        '#'
                    } else {
                        policy[self.state_index(cell)].arrow()
                    }
                })
                .map(String::from)
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&line);
            out.push('\n');
        }

        out
    }
}

impl Environment for GridEnvironment {
    type State = Cell;
    type Action = Action;

    fn step(&mut self, action: Self::Action) -> (Self::State, f64, bool) {
        let next = self.clamped_move(self.state, action);

        if self.is_blocked(next) {
            (self.state, self.rewards.bump, false)
        } else if next == self.goal {
            self.state = next;
            (self.state, self.rewards.goal, true)
        } else {
            self.state = next;
            (self.state, self.rewards.step, false)
        }
    }

    fn reset(&mut self) -> Self::State {
        self.state = self.start;
        self.state
    }
}

impl DiscreteActionSpace for GridEnvironment {
    fn actions(&self) -> Vec<Self::Action> {
        Action::VARIANTS.to_vec()
    }
}

impl DiscreteStateSpace for GridEnvironment {
    fn num_states(&self) -> usize {
        self.width * self.height
    }

    fn state_index(&self, state: Self::State) -> usize {
        state.row * self.width + state.col
    }
}
