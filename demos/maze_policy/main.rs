use std::{error::Error, fs, ops::ControlFlow, path::Path};

use gridq::{
    algo::tabular::{QLearnerConfig, TabularQLearner},
    decay,
    env::DiscreteStateSpace,
    gym::{Cell, GridEnvironment},
};
use log::LevelFilter;

const SEED: u64 = 13;

fn init_logging() {
    env_logger::builder()
        .format_target(false)
        .format_timestamp_secs()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init()
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let path = Path::new("demos/maze_policy/out");
    fs::create_dir_all(path)?;

    let blocked = [(1, 1), (1, 2), (2, 2), (3, 1), (4, 3)].map(Cell::from);
    let env = GridEnvironment::new(6, 6, blocked, Cell::new(0, 0), Cell::new(5, 5))?;
    let config: QLearnerConfig<decay::Constant> = QLearnerConfig::default();
    let mut agent = TabularQLearner::from_seed(env, config, SEED)?;

    let mut wtr = csv::Writer::from_path(path.join("episodes.csv"))?;
    wtr.write_record(["episode", "steps", "reward", "terminal"])?;
    let mut write_error = None;
    agent.train_with(|report| {
        let record = [
            report.episode.to_string(),
            report.steps.to_string(),
            report.total_reward.to_string(),
            report.terminal.to_string(),
        ];
        match wtr.write_record(&record) {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => {
                write_error = Some(e);
                ControlFlow::Break(())
            }
        }
    });
    if let Some(e) = write_error {
        return Err(e.into());
    }
    wtr.flush()?;

    let env = agent.env();
    let values = agent.q_table().state_values();
    let mut wtr = csv::Writer::from_path(path.join("values.csv"))?;
    wtr.write_record(["row", "col", "value"])?;
    for row in 0..env.height() {
        for col in 0..env.width() {
            let cell = Cell::new(row, col);
            let value = if env.is_blocked(cell) {
                String::new()
            } else {
                values[env.state_index(cell)].to_string()
            };
            wtr.write_record([row.to_string(), col.to_string(), value])?;
        }
    }
    wtr.flush()?;

    print!("{}", agent.env().render_policy(&agent.greedy_policy()));

    let rollout = agent.rollout();
    log::info!(
        "greedy rollout: {} steps, reward {:.3}, reached goal: {}",
        rollout.steps(),
        rollout.total_reward,
        rollout.terminal
    );

    Ok(())
}
