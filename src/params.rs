use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

use crate::digital_spike::{DsMode, DsPattern};

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct NetworkParams {
    pub layers: Vec<LayerParams>,
    #[serde(default)]
    pub circuit_params: CircuitParams,
    #[serde(default)]
    pub ds_params: Option<DsParams>,
    #[serde(default)]
    pub energy_params: EnergyParams,
    #[serde(default)]
    pub technical_params: TechnicalParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerParams {
    pub num_neurons: usize,
    /// One row per neuron, one entry per incoming synapse.
    pub weights: Vec<Vec<f64>>,
    #[serde(default)]
    pub neuron_params: NeuronParamsMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NeuronParamsMode {
    Uniform,
    PerNeuron {
        thresholds: Vec<f64>,
        refractory_periods: Vec<u32>,
        leak_resistances: Vec<f64>,
    },
}

/// Network-wide analog defaults shared by every neuron unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitParams {
    pub supply_voltage: f64,
    pub threshold: f64,
    pub neuron_capacitance: f64,
    pub unit_capacitance: f64,
    pub fan_in_capacitance: f64,
    pub leak_resistance: f64,
    pub clock_frequency: f64,
    pub refractory_period: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeuronParams {
    pub threshold: f64,
    pub refractory_period: u32,
    pub leak_resistance: f64,
    pub supply_voltage: f64,
    pub neuron_capacitance: f64,
    pub unit_capacitance: f64,
    pub fan_in_capacitance: f64,
    pub clock_frequency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DsParams {
    pub clock_frequency_mhz: f64,
    pub bit_width: u32,
    pub mode: DsMode,
    pub pattern: DsPattern,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyParams {
    pub synapse_table_path: Option<PathBuf>,
    pub neuron_table_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalParams {
    pub record_traces: bool,
}

impl LayerParams {
    pub fn uniform(weights: Vec<Vec<f64>>) -> Self {
        Self {
            num_neurons: weights.len(),
            weights,
            neuron_params: NeuronParamsMode::Uniform,
        }
    }

    pub fn num_synapses(&self) -> Option<usize> {
        self.weights.first().map(|row| row.len())
    }
}

impl NeuronParamsMode {
    /// Resolves the parameters of neuron `neuron_idx`, falling back to the
    /// circuit defaults in uniform mode.
    pub fn resolve(&self, neuron_idx: usize, circuit_params: &CircuitParams) -> NeuronParams {
        let mut neuron_params = circuit_params.neuron_params();

        if let NeuronParamsMode::PerNeuron {
            thresholds,
            refractory_periods,
            leak_resistances,
        } = self
        {
            neuron_params.threshold = thresholds[neuron_idx];
            neuron_params.refractory_period = refractory_periods[neuron_idx];
            neuron_params.leak_resistance = leak_resistances[neuron_idx];
        }

        neuron_params
    }
}

impl CircuitParams {
    pub fn neuron_params(&self) -> NeuronParams {
        NeuronParams {
            threshold: self.threshold,
            refractory_period: self.refractory_period,
            leak_resistance: self.leak_resistance,
            supply_voltage: self.supply_voltage,
            neuron_capacitance: self.neuron_capacitance,
            unit_capacitance: self.unit_capacitance,
            fan_in_capacitance: self.fan_in_capacitance,
            clock_frequency: self.clock_frequency,
        }
    }
}

impl Default for NeuronParamsMode {
    fn default() -> Self {
        NeuronParamsMode::Uniform
    }
}

impl Default for CircuitParams {
    fn default() -> Self {
        Self {
            supply_voltage: 1.2,
            threshold: 0.5,
            neuron_capacitance: 1e-12,
            unit_capacitance: 4e-15,
            fan_in_capacitance: 5.5e-15,
            leak_resistance: 1e6,
            clock_frequency: 1e7,
            refractory_period: 2,
        }
    }
}

impl Default for NeuronParams {
    fn default() -> Self {
        CircuitParams::default().neuron_params()
    }
}

impl Default for DsParams {
    fn default() -> Self {
        Self {
            clock_frequency_mhz: 10.0,
            bit_width: 4,
            mode: DsMode::Threshold,
            pattern: DsPattern::default(),
        }
    }
}

impl Default for TechnicalParams {
    fn default() -> Self {
        Self {
            record_traces: true,
        }
    }
}

pub fn validate_network_params(network_params: &NetworkParams) -> Result<(), SimpleError> {
    if network_params.layers.is_empty() {
        return Err(SimpleError::new("network must have at least one layer"));
    }

    validate_circuit_params(&network_params.circuit_params)?;

    for (layer_id, layer_params) in network_params.layers.iter().enumerate() {
        try_with_layer(layer_id, validate_layer_params(layer_params))?;
    }

    let input_layer = &network_params.layers[0];
    let num_in_channels = input_layer.num_synapses().unwrap_or(0);

    if input_layer
        .weights
        .iter()
        .any(|row| row.len() != num_in_channels)
    {
        return Err(SimpleError::new(
            "layer 0: all weight rows must have the same length",
        ));
    }

    for (layer_id, pair) in network_params.layers.windows(2).enumerate() {
        let (pre_layer, post_layer) = (&pair[0], &pair[1]);

        for (neuron_idx, row) in post_layer.weights.iter().enumerate() {
            if row.len() != pre_layer.num_neurons {
                return Err(SimpleError::new(format!(
                    "layer {}: neuron {} has {} weights, expected {}",
                    layer_id + 1,
                    neuron_idx,
                    row.len(),
                    pre_layer.num_neurons
                )));
            }
        }
    }

    if let Some(ds_params) = &network_params.ds_params {
        validate_ds_params(ds_params)?;

        if num_in_channels == 0 {
            return Err(SimpleError::new(
                "digital spike front end requires at least one input channel",
            ));
        }
    }

    Ok(())
}

fn try_with_layer(layer_id: usize, result: Result<(), SimpleError>) -> Result<(), SimpleError> {
    result.map_err(|err| SimpleError::new(format!("layer {}: {}", layer_id, err)))
}

pub fn validate_layer_params(layer_params: &LayerParams) -> Result<(), SimpleError> {
    if layer_params.num_neurons == 0 {
        return Err(SimpleError::new("num_neurons must be strictly positive"));
    }

    if layer_params.weights.len() != layer_params.num_neurons {
        return Err(SimpleError::new(format!(
            "expected {} weight rows, got {}",
            layer_params.num_neurons,
            layer_params.weights.len()
        )));
    }

    if let NeuronParamsMode::PerNeuron {
        thresholds,
        refractory_periods,
        leak_resistances,
    } = &layer_params.neuron_params
    {
        validate_override_len("thresholds", thresholds.len(), layer_params.num_neurons)?;
        validate_override_len(
            "refractory_periods",
            refractory_periods.len(),
            layer_params.num_neurons,
        )?;
        validate_override_len(
            "leak_resistances",
            leak_resistances.len(),
            layer_params.num_neurons,
        )?;

        if thresholds.iter().any(|threshold| !threshold.is_finite()) {
            return Err(SimpleError::new("thresholds must be finite"));
        }

        if leak_resistances.iter().any(|resistance| resistance.is_nan() || *resistance <= 0.0) {
            return Err(SimpleError::new(
                "leak_resistances must be strictly positive",
            ));
        }
    }

    Ok(())
}

fn validate_override_len(name: &str, len: usize, num_neurons: usize) -> Result<(), SimpleError> {
    if len != num_neurons {
        return Err(SimpleError::new(format!(
            "{} has {} entries, expected {}",
            name, len, num_neurons
        )));
    }

    Ok(())
}

fn validate_circuit_params(circuit_params: &CircuitParams) -> Result<(), SimpleError> {
    if !circuit_params.supply_voltage.is_finite() {
        return Err(SimpleError::new("supply_voltage must be finite"));
    }

    if !circuit_params.threshold.is_finite() {
        return Err(SimpleError::new("threshold must be finite"));
    }

    if [
        circuit_params.neuron_capacitance,
        circuit_params.unit_capacitance,
        circuit_params.fan_in_capacitance,
    ]
    .iter()
    .any(|capacitance| !capacitance.is_finite() || *capacitance < 0.0)
    {
        return Err(SimpleError::new(
            "capacitances must be finite and not negative",
        ));
    }

    if circuit_params.leak_resistance.is_nan() || circuit_params.leak_resistance <= 0.0 {
        return Err(SimpleError::new("leak_resistance must be strictly positive"));
    }

    if !circuit_params.clock_frequency.is_finite() || circuit_params.clock_frequency <= 0.0 {
        return Err(SimpleError::new(
            "clock_frequency must be strictly positive and finite",
        ));
    }

    Ok(())
}

fn validate_ds_params(ds_params: &DsParams) -> Result<(), SimpleError> {
    if ds_params.clock_frequency_mhz <= 0.0 {
        return Err(SimpleError::new(
            "ds clock_frequency_mhz must be strictly positive",
        ));
    }

    if ds_params.bit_width == 0 || ds_params.bit_width > 31 {
        return Err(SimpleError::new("ds bit_width must be in [1, 31]"));
    }

    ds_params.pattern.validate()
}
