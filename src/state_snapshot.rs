use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub t: usize,
    pub neuron_states: Vec<NeuronState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuronState {
    pub layer_id: usize,
    pub neuron_idx: usize,
    pub voltage: f64,
    pub refractory_cycles_left: u32,
    pub synapse_energy: f64,
    pub neuron_energy: f64,
}
