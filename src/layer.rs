use itertools::Itertools;

use crate::{
    energy_table::EnergyTable,
    error::{NemoError, NemoResult},
    neuron::Neuron,
    params::{self, CircuitParams, LayerParams},
};

/// Fixed, ordered group of neurons that all see the same input vector.
#[derive(Debug, Clone)]
pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new(
        layer_params: &LayerParams,
        circuit_params: &CircuitParams,
        record_traces: bool,
    ) -> NemoResult<Self> {
        params::validate_layer_params(layer_params)?;

        let neurons = layer_params
            .weights
            .iter()
            .enumerate()
            .map(|(neuron_idx, weights)| {
                let neuron_params = layer_params
                    .neuron_params
                    .resolve(neuron_idx, circuit_params);
                Neuron::new(weights.clone(), neuron_params, record_traces)
            })
            .collect_vec();

        Ok(Self { neurons })
    }

    pub fn set_inputs(&mut self, inputs: &[f64], energy_table: &EnergyTable) -> NemoResult<()> {
        for neuron in &mut self.neurons {
            neuron.set_synaptic_inputs(inputs, energy_table)?;
        }

        Ok(())
    }

    /// Advances every neuron by one tick. The result holds one entry per
    /// neuron, in neuron order.
    pub fn update(&mut self, energy_table: &EnergyTable) -> NemoResult<Vec<bool>> {
        self.neurons
            .iter_mut()
            .map(|neuron| neuron.update(energy_table))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn get_neuron(&self, index: usize) -> NemoResult<&Neuron> {
        self.neurons.get(index).ok_or(NemoError::OutOfRange {
            index,
            len: self.neurons.len(),
        })
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn get_total_synapse_energy(&self) -> f64 {
        self.neurons
            .iter()
            .map(Neuron::get_total_synapse_energy)
            .sum()
    }

    pub fn get_total_neuron_energy(&self) -> f64 {
        self.neurons.iter().map(Neuron::get_neuron_energy).sum()
    }
}
