/// A dense table of action values, one row per state and one column per action
///
/// The table is allocated once, filled with zeros, and never changes shape.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    values: Vec<f64>,
    num_actions: usize,
}

impl QTable {
    /// Initialize a zero-filled table
    ///
    /// **Panics** if `num_actions` is zero
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        assert!(num_actions > 0, "There is always at least one action");
        Self {
            values: vec![0.0; num_states * num_actions],
            num_actions,
        }
    }

    pub fn num_states(&self) -> usize {
        self.values.len() / self.num_actions
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[state * self.num_actions + action]
    }

    pub fn set(&mut self, state: usize, action: usize, value: f64) {
        self.values[state * self.num_actions + action] = value;
    }

    /// Action values of a single state
    pub fn row(&self, state: usize) -> &[f64] {
        let start = state * self.num_actions;
        &self.values[start..start + self.num_actions]
    }

    /// The whole table in row-major `(state, action)` order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Index of the highest valued action in `state`, ties going to the lowest index
    pub fn argmax(&self, state: usize) -> usize {
        self.row(state)
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best, best_value), (i, &value)| {
                if value > best_value {
                    (i, value)
                } else {
                    (best, best_value)
                }
            })
            .0
    }

    /// Highest action value in `state`
    pub fn max(&self, state: usize) -> f64 {
        self.row(state).iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Greedy value of every state
    pub fn state_values(&self) -> Vec<f64> {
        (0..self.num_states()).map(|s| self.max(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn q_table_starts_at_zero() {
        let table = QTable::new(6, 4);
        assert_eq!(table.num_states(), 6);
        assert_eq!(table.num_actions(), 4);
        assert!(table.as_slice().iter().all(|&v| v == 0.0), "Table is zeroed");
        assert_eq!(table.as_slice().len(), 24);
    }

    #[test]
    fn q_table_set_get() {
        let mut table = QTable::new(3, 2);
        table.set(1, 1, 1.5);
        assert_eq!(table.get(1, 1), 1.5);
        assert_eq!(table.row(1), &[0.0, 1.5]);
        assert_eq!(table.row(2), &[0.0, 0.0], "Neighbouring row untouched");
    }

    #[test]
    fn q_table_argmax_breaks_ties_low() {
        let mut table = QTable::new(2, 4);
        assert_eq!(table.argmax(0), 0, "All-zero row picks the first action");

        table.set(1, 1, 0.5);
        table.set(1, 3, 0.5);
        assert_eq!(table.argmax(1), 1, "Tie goes to the lowest index");

        table.set(1, 2, 0.7);
        assert_eq!(table.argmax(1), 2, "Strict maximum wins");
    }

    #[test]
    fn q_table_max_and_state_values() {
        let mut table = QTable::new(2, 3);
        table.set(0, 0, -1.0);
        table.set(0, 1, -0.5);
        table.set(0, 2, -2.0);
        table.set(1, 2, 3.0);
        assert_eq!(table.max(0), -0.5);
        assert_eq!(table.state_values(), vec![-0.5, 3.0]);
    }
}
