mod circuit_breaker;
mod gateway;

pub use circuit_breaker::*;
pub use gateway::*;
