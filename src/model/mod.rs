pub mod intent;
pub mod mint;
pub mod network;

pub use intent::{
    Action, BuildDetails, BuildIntent, BuildResult, NaturalIntent, ParamsExt, ParsedIntent,
    Protocol, SimulationReport,
};
pub use network::Network;
