/// Table-based agents for finite environments
pub mod tabular;
