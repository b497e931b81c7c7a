pub mod digital_spike;
pub mod energy_table;
pub mod error;
pub mod input;
pub mod layer;
pub mod network;
pub mod neuron;
pub mod params;
pub mod state_snapshot;

mod util;
