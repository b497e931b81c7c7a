use crate::{
    energy_table::EnergyTable,
    error::{NemoError, NemoResult},
    params::NeuronParams,
    util::get_leak_decay_factor,
};

const RESET_VOLTAGE: f64 = 0.0;

/// Analog integrate-and-fire neuron with a synaptic dynamic capacitance.
///
/// Per tick the membrane keeps the share `C_static / C_total` of its charge,
/// leaks through `R_leak`, and receives the charge pumped in by every active
/// synapse. Crossing the threshold emits a spike and holds the membrane at
/// the reset level for `refractory_period` ticks.
#[derive(Debug, Clone)]
pub struct Neuron {
    voltage: f64,
    refractory_cycles_left: u32,
    weights: Vec<f64>,
    synaptic_inputs: Vec<f64>,
    synapse_energy: Vec<f64>,
    neuron_energy: f64,
    static_capacitance: f64,
    leak_decay_factor: f64,
    params: NeuronParams,
    trace: Option<NeuronTrace>,
}

/// Append-only per-tick history of a neuron.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeuronTrace {
    voltages: Vec<f64>,
    spikes: Vec<bool>,
    first_inputs: Vec<f64>,
}

impl NeuronTrace {
    /// Membrane voltage at the start of each update.
    pub fn voltages(&self) -> &[f64] {
        &self.voltages
    }

    pub fn spikes(&self) -> &[bool] {
        &self.spikes
    }

    /// First synaptic input of each `set_synaptic_inputs` call.
    pub fn first_inputs(&self) -> &[f64] {
        &self.first_inputs
    }
}

impl Neuron {
    pub fn new(weights: Vec<f64>, params: NeuronParams, record_trace: bool) -> Self {
        let num_synapses = weights.len();
        let static_capacitance =
            params.neuron_capacitance + params.fan_in_capacitance * num_synapses as f64;

        Self {
            voltage: RESET_VOLTAGE,
            refractory_cycles_left: 0,
            weights,
            synaptic_inputs: vec![0.0; num_synapses],
            synapse_energy: vec![0.0; num_synapses],
            neuron_energy: 0.0,
            static_capacitance,
            leak_decay_factor: get_leak_decay_factor(
                params.leak_resistance,
                static_capacitance,
                params.clock_frequency,
            ),
            params,
            trace: record_trace.then(NeuronTrace::default),
        }
    }

    /// Latches the inputs for the next `update` and bills synapse energy for
    /// every synapse, refractory or not.
    pub fn set_synaptic_inputs(
        &mut self,
        inputs: &[f64],
        energy_table: &EnergyTable,
    ) -> NemoResult<()> {
        if inputs.len() != self.weights.len() {
            return Err(NemoError::InputShape(format!(
                "expected {} synaptic inputs, got {}",
                self.weights.len(),
                inputs.len()
            )));
        }

        self.synaptic_inputs.copy_from_slice(inputs);

        for ((energy, weight), input) in self
            .synapse_energy
            .iter_mut()
            .zip(&self.weights)
            .zip(inputs)
        {
            let activity = if *input > 0.0 { 1 } else { 0 };
            *energy += energy_table.get_synapse_energy(*weight as i64, activity);
        }

        if let (Some(trace), Some(first_input)) = (self.trace.as_mut(), inputs.first()) {
            trace.first_inputs.push(*first_input);
        }

        Ok(())
    }

    pub fn update(&mut self, energy_table: &EnergyTable) -> NemoResult<bool> {
        self.neuron_energy += energy_table.get_neuron_energy(self.params.threshold, self.voltage);
        let voltage_before = self.voltage;

        if self.is_refractory() {
            self.refractory_cycles_left -= 1;
            self.voltage = RESET_VOLTAGE;
            self.record(voltage_before, false);
            return Ok(false);
        }

        let (dynamic_capacitance, charge) = self.synaptic_contribution();
        let total_capacitance = self.static_capacitance + dynamic_capacitance;

        if total_capacitance == 0.0 {
            return Err(NemoError::Computation(
                "total capacitance is zero".to_string(),
            ));
        }

        let voltage = self.voltage
            * (self.static_capacitance / total_capacitance)
            * self.leak_decay_factor
            + charge / total_capacitance;

        let spike = voltage >= self.params.threshold;

        if spike {
            self.voltage = RESET_VOLTAGE;
            self.refractory_cycles_left = self.params.refractory_period;
        } else {
            self.voltage = voltage;
        }

        self.record(voltage_before, spike);
        Ok(spike)
    }

    fn synaptic_contribution(&self) -> (f64, f64) {
        let mut dynamic_capacitance = 0.0;
        let mut charge = 0.0;

        for (weight, input) in self.weights.iter().zip(&self.synaptic_inputs) {
            if *input > 0.0 {
                let capacitance = self.params.unit_capacitance * weight * input;
                dynamic_capacitance += capacitance;
                charge += capacitance * self.params.supply_voltage;
            }
        }

        (dynamic_capacitance, charge)
    }

    fn record(&mut self, voltage: f64, spike: bool) {
        if let Some(trace) = self.trace.as_mut() {
            trace.voltages.push(voltage);
            trace.spikes.push(spike);
        }
    }

    pub fn is_refractory(&self) -> bool {
        self.refractory_cycles_left > 0
    }

    pub fn get_voltage(&self) -> f64 {
        self.voltage
    }

    pub fn get_refractory_cycles_left(&self) -> u32 {
        self.refractory_cycles_left
    }

    pub fn get_weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn get_synaptic_inputs(&self) -> &[f64] {
        &self.synaptic_inputs
    }

    pub fn get_synapse_energy(&self) -> &[f64] {
        &self.synapse_energy
    }

    pub fn get_total_synapse_energy(&self) -> f64 {
        self.synapse_energy.iter().sum()
    }

    pub fn get_neuron_energy(&self) -> f64 {
        self.neuron_energy
    }

    pub fn get_static_capacitance(&self) -> f64 {
        self.static_capacitance
    }

    pub fn get_params(&self) -> &NeuronParams {
        &self.params
    }

    pub fn get_trace(&self) -> Option<&NeuronTrace> {
        self.trace.as_ref()
    }
}
