use std::io::BufRead;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, error, info, trace};
use serde::{Deserialize, Serialize};
use simple_error::try_with;

use crate::digital_spike::DigitalSpikeEncoder;
use crate::energy_table::EnergyTable;
use crate::error::{NemoError, NemoResult};
use crate::input;
use crate::layer::Layer;
use crate::params::{self, NetworkParams};
use crate::state_snapshot::{NeuronState, StateSnapshot};
use crate::util::spikes_to_inputs;

/// Builds a network from a parameter bundle, loading the energy tables named
/// in its energy parameters.
pub fn create_network(params: NetworkParams) -> NemoResult<Network> {
    try_with!(
        params::validate_network_params(&params),
        "invalid network parameters"
    );

    let energy_table = EnergyTable::from_csv_files(
        params.energy_params.synapse_table_path.as_deref(),
        params.energy_params.neuron_table_path.as_deref(),
    )?;

    build_network(params, energy_table)
}

pub fn create_network_with_energy_table(
    params: NetworkParams,
    energy_table: EnergyTable,
) -> NemoResult<Network> {
    try_with!(
        params::validate_network_params(&params),
        "invalid network parameters"
    );

    build_network(params, energy_table)
}

fn build_network(params: NetworkParams, energy_table: EnergyTable) -> NemoResult<Network> {
    let record_traces = params.technical_params.record_traces;

    let layers = params
        .layers
        .iter()
        .map(|layer_params| Layer::new(layer_params, &params.circuit_params, record_traces))
        .collect::<NemoResult<Vec<_>>>()?;

    let ds_units = match &params.ds_params {
        Some(ds_params) => {
            let num_in_channels = params.layers[0].num_synapses().unwrap_or(0);
            let pattern = Arc::new(ds_params.pattern.clone());

            (0..num_in_channels)
                .map(|_| {
                    DigitalSpikeEncoder::new(
                        ds_params.clock_frequency_mhz,
                        ds_params.bit_width,
                        ds_params.mode,
                        Arc::clone(&pattern),
                    )
                })
                .collect::<NemoResult<Vec<_>>>()?
        }
        None => Vec::new(),
    };

    debug!(
        "created network with layer sizes {:?} and {} digital spike units",
        layers.iter().map(Layer::len).collect_vec(),
        ds_units.len()
    );

    Ok(Network {
        spike_latch: layers.iter().map(|layer| vec![false; layer.len()]).collect(),
        spike_counts: vec![0; layers.len()],
        layers,
        ds_units,
        energy_table,
        tick_period: 0,
        external_tick_count: 0,
    })
}

#[derive(Debug, Clone)]
pub struct TickResult {
    pub t: usize,
    /// Spikes emitted this tick, one vector per layer in neuron order.
    pub spikes: Vec<Vec<bool>>,
}

impl TickResult {
    pub fn spike_count(&self) -> usize {
        self.spikes.iter().flatten().filter(|spiked| **spiked).count()
    }
}

#[derive(Debug, Clone)]
pub struct ExternalTickResult {
    pub internal_ticks: usize,
    /// Spikes per layer summed over all internal ticks of this external tick.
    pub spike_counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub external_ticks: usize,
    pub internal_ticks: usize,
    pub spike_counts: Vec<usize>,
    pub total_synapse_energy: f64,
    pub total_neuron_energy: f64,
}

#[derive(Debug)]
pub struct Network {
    layers: Vec<Layer>,
    ds_units: Vec<DigitalSpikeEncoder>,
    energy_table: EnergyTable,
    spike_latch: Vec<Vec<bool>>,
    spike_counts: Vec<usize>,
    tick_period: usize,
    external_tick_count: usize,
}

impl Network {
    /// Runs one internal tick of the whole cascade.
    ///
    /// Layer 0 consumes `input`. Layer `i > 0` consumes the spikes layer `i - 1`
    /// latched at the end of the previous tick, so a spike reaches the next
    /// layer one tick after it is emitted. Spikes emitted on the last tick of
    /// a run therefore stay in the latch and are only delivered if another
    /// tick follows.
    pub fn tick(&mut self, input: &[f64]) -> NemoResult<TickResult> {
        let mut spikes = Vec::with_capacity(self.layers.len());

        for (layer_id, layer) in self.layers.iter_mut().enumerate() {
            if layer_id == 0 {
                layer.set_inputs(input, &self.energy_table)?;
            } else {
                let inputs = spikes_to_inputs(&self.spike_latch[layer_id - 1]);
                layer.set_inputs(&inputs, &self.energy_table)?;
            }

            let layer_spikes = layer.update(&self.energy_table)?;
            self.spike_counts[layer_id] += layer_spikes.iter().filter(|spiked| **spiked).count();
            spikes.push(layer_spikes);
        }

        self.spike_latch = spikes.clone();

        let t = self.tick_period;
        self.tick_period += 1;

        Ok(TickResult { t, spikes })
    }

    /// Consumes the values of one external input line.
    ///
    /// Without a digital spike front end the values feed layer 0 directly for
    /// a single tick. With one, each value is loaded as the code of its unit
    /// and the network runs one tick per pattern column, driven by the units'
    /// spikes.
    pub fn process_external_tick(&mut self, values: &[f64]) -> NemoResult<ExternalTickResult> {
        let mut spike_counts = vec![0; self.layers.len()];
        let mut accumulate = |tick_result: TickResult| {
            for (count, layer_spikes) in spike_counts.iter_mut().zip(&tick_result.spikes) {
                *count += layer_spikes.iter().filter(|spiked| **spiked).count();
            }
        };

        let internal_ticks = if self.ds_units.is_empty() {
            accumulate(self.tick(values)?);
            1
        } else {
            if values.len() != self.ds_units.len() {
                return Err(NemoError::InputShape(format!(
                    "expected {} values for the digital spike units, got {}",
                    self.ds_units.len(),
                    values.len()
                )));
            }

            for (ds_unit, value) in self.ds_units.iter_mut().zip(values) {
                ds_unit.set_code(input::value_to_code(*value));
            }

            let micro_ticks = self.get_micro_ticks_per_external_tick();

            for _ in 0..micro_ticks {
                let ds_spikes = self.ds_units.iter_mut().map(|ds_unit| ds_unit.tick()).collect_vec();
                accumulate(self.tick(&spikes_to_inputs(&ds_spikes))?);
            }

            micro_ticks
        };

        self.external_tick_count += 1;

        Ok(ExternalTickResult {
            internal_ticks,
            spike_counts,
        })
    }

    /// Drives the network with a line-oriented numeric stream, one external
    /// tick per non-empty line. The first malformed line aborts the run; the
    /// totals then cover only the lines before it.
    pub fn run<R: BufRead>(&mut self, reader: R) -> NemoResult<RunSummary> {
        info!(
            "starting run at tick {} ({} layers, {} digital spike units)",
            self.tick_period,
            self.layers.len(),
            self.ds_units.len()
        );

        for (line_idx, line) in reader.lines().enumerate() {
            let line_number = line_idx + 1;

            if let Err(err) = self.process_line(&line?, line_number) {
                error!("run aborted at line {}: {}", line_number, err);
                return Err(err);
            }
        }

        let summary = self.get_summary();
        info!("finished run: {:?}", summary);

        Ok(summary)
    }

    fn process_line(&mut self, line: &str, line_number: usize) -> NemoResult<()> {
        let values = match input::parse_line(line, line_number)? {
            Some(values) => values,
            None => return Ok(()),
        };

        let result = self
            .process_external_tick(&values)
            .map_err(|err| match err {
                NemoError::InputShape(msg) => {
                    NemoError::InputShape(format!("line {}: {}", line_number, msg))
                }
                other => other,
            })?;

        trace!(
            "line {}: {} internal ticks, spikes per layer {:?}",
            line_number,
            result.internal_ticks,
            result.spike_counts
        );

        Ok(())
    }

    pub fn get_summary(&self) -> RunSummary {
        RunSummary {
            external_ticks: self.external_tick_count,
            internal_ticks: self.tick_period,
            spike_counts: self.spike_counts.clone(),
            total_synapse_energy: self.get_total_synapse_energy(),
            total_neuron_energy: self.get_total_neuron_energy(),
        }
    }

    pub fn get_micro_ticks_per_external_tick(&self) -> usize {
        self.ds_units
            .first()
            .map_or(1, DigitalSpikeEncoder::get_pattern_length)
    }

    pub fn get_total_synapse_energy(&self) -> f64 {
        self.layers
            .iter()
            .map(Layer::get_total_synapse_energy)
            .sum()
    }

    pub fn get_total_neuron_energy(&self) -> f64 {
        self.layers.iter().map(Layer::get_total_neuron_energy).sum()
    }

    pub fn get_spike_counts(&self) -> &[usize] {
        &self.spike_counts
    }

    pub fn get_internal_ticks(&self) -> usize {
        self.tick_period
    }

    pub fn get_external_ticks(&self) -> usize {
        self.external_tick_count
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get_layer(&self, layer_id: usize) -> NemoResult<&Layer> {
        self.layers.get(layer_id).ok_or(NemoError::OutOfRange {
            index: layer_id,
            len: self.layers.len(),
        })
    }

    pub fn ds_units(&self) -> &[DigitalSpikeEncoder] {
        &self.ds_units
    }

    pub fn reset_ds_units(&mut self) {
        self.ds_units.iter_mut().for_each(DigitalSpikeEncoder::reset);
    }

    pub fn get_energy_table(&self) -> &EnergyTable {
        &self.energy_table
    }

    pub fn extract_state_snapshot(&self) -> StateSnapshot {
        let neuron_states = self
            .layers
            .iter()
            .enumerate()
            .flat_map(|(layer_id, layer)| {
                layer
                    .neurons()
                    .iter()
                    .enumerate()
                    .map(move |(neuron_idx, neuron)| NeuronState {
                        layer_id,
                        neuron_idx,
                        voltage: neuron.get_voltage(),
                        refractory_cycles_left: neuron.get_refractory_cycles_left(),
                        synapse_energy: neuron.get_total_synapse_energy(),
                        neuron_energy: neuron.get_neuron_energy(),
                    })
            })
            .collect();

        StateSnapshot {
            t: self.tick_period,
            neuron_states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digital_spike::DsPattern;
    use crate::params::{DsParams, LayerParams};
    use crate::util::test_util::{get_lossless_circuit_params, get_template_network_params};
    use float_cmp::assert_approx_eq;
    use itertools::assert_equal;
    use std::io::Cursor;

    fn chain_params() -> NetworkParams {
        let mut params = NetworkParams {
            layers: vec![
                LayerParams::uniform(vec![vec![1.0]]),
                LayerParams::uniform(vec![vec![1.0]]),
            ],
            circuit_params: get_lossless_circuit_params(),
            ..NetworkParams::default()
        };
        params.circuit_params.threshold = 0.5;
        params
    }

    fn ds_params(pattern: DsPattern) -> DsParams {
        DsParams {
            pattern,
            ..DsParams::default()
        }
    }

    #[test]
    fn empty_topology() {
        let result = create_network(NetworkParams::default());

        match result {
            Err(NemoError::Construction(err)) => assert_eq!(
                err.as_str(),
                "invalid network parameters, network must have at least one layer"
            ),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn spike_reaches_next_layer_one_tick_later() {
        let mut sut = create_network(chain_params()).unwrap();

        let results = (0..3).map(|_| sut.tick(&[1.0]).unwrap()).collect_vec();

        assert_equal(results.iter().map(|result| result.t), [0, 1, 2]);
        assert_eq!(results[0].spikes, vec![vec![true], vec![false]]);
        assert_eq!(results[1].spikes, vec![vec![false], vec![true]]);
        assert_eq!(results[2].spikes, vec![vec![false], vec![false]]);
        assert_equal(results.iter().map(TickResult::spike_count), [1, 1, 0]);
        assert_eq!(sut.get_spike_counts(), &[1, 1]);
    }

    #[test]
    fn last_tick_spikes_stay_latched() {
        let mut sut = create_network(chain_params()).unwrap();

        sut.run(Cursor::new("1.0\n")).unwrap();
        assert_eq!(sut.get_spike_counts(), &[1, 0]);

        let result = sut.tick(&[0.0]).unwrap();
        assert_eq!(result.spikes, vec![vec![false], vec![true]]);
    }

    #[test]
    fn downstream_layer_sees_spikes_as_unit_inputs() {
        let mut sut = create_network(get_template_network_params()).unwrap();

        sut.tick(&[1.0]).unwrap();
        sut.tick(&[0.0]).unwrap();

        let downstream = sut.get_layer(1).unwrap().get_neuron(0).unwrap();
        let upstream = sut.get_layer(0).unwrap();

        // neuron 1 of layer 0 (weight 2: 2.4 / 3 = 0.8) stays below threshold 1.0
        assert_approx_eq!(
            f64,
            upstream.get_neuron(1).unwrap().get_voltage(),
            0.8,
            epsilon = 1e-12
        );
        assert_equal(downstream.get_synaptic_inputs().iter().copied(), [0.0, 0.0]);
        assert_equal(
            downstream.get_trace().unwrap().first_inputs().iter().copied(),
            [0.0, 0.0],
        );
    }

    #[test]
    fn input_shape_mismatch() {
        let mut sut = create_network(chain_params()).unwrap();
        assert!(matches!(
            sut.tick(&[1.0, 1.0]),
            Err(NemoError::InputShape(_))
        ));
    }

    #[test]
    fn ds_front_end_expands_external_tick() {
        let mut params = chain_params();
        params.ds_params = Some(ds_params(DsPattern::default()));
        let mut sut = create_network(params).unwrap();

        assert_eq!(sut.ds_units().len(), 1);
        assert_eq!(sut.get_micro_ticks_per_external_tick(), 32);

        // code 0 alternates 1, 0: spike, two refractory ticks, one idle tick
        let result = sut.process_external_tick(&[0.0]).unwrap();
        assert_eq!(result.internal_ticks, 32);
        assert_eq!(result.spike_counts[0], 8);
        assert_eq!(sut.get_internal_ticks(), 32);
        assert_eq!(sut.ds_units()[0].get_cycle(), 32);
    }

    #[test]
    fn ds_token_count_mismatch() {
        let mut params = chain_params();
        params.ds_params = Some(ds_params(DsPattern::default()));
        let mut sut = create_network(params).unwrap();

        assert!(matches!(
            sut.process_external_tick(&[1.0, 2.0]),
            Err(NemoError::InputShape(_))
        ));
        assert_eq!(sut.get_internal_ticks(), 0);
    }

    #[test]
    fn ds_codes_are_clamped() {
        let pattern = DsPattern::new(vec![vec![0, 0], vec![1, 1]]).unwrap();
        let mut params = chain_params();
        params.ds_params = Some(ds_params(pattern));
        let mut sut = create_network(params).unwrap();

        sut.process_external_tick(&[42.7]).unwrap();
        assert_eq!(sut.ds_units()[0].get_code(), 1);

        sut.process_external_tick(&[-3.0]).unwrap();
        assert_eq!(sut.ds_units()[0].get_code(), 0);
        assert_eq!(sut.get_internal_ticks(), 4);
    }

    #[test]
    fn reset_ds_units() {
        let mut params = chain_params();
        params.ds_params = Some(ds_params(DsPattern::default()));
        let mut sut = create_network(params).unwrap();

        sut.process_external_tick(&[5.0]).unwrap();
        sut.reset_ds_units();
        assert!(sut.ds_units().iter().all(|unit| unit.get_cycle() == 0));
    }

    #[test]
    fn run_skips_empty_lines() {
        let mut sut = create_network(chain_params()).unwrap();
        let summary = sut.run(Cursor::new("1.0\n\n1.0\n1.0\n")).unwrap();

        assert_eq!(summary.external_ticks, 3);
        assert_eq!(summary.internal_ticks, 3);
        assert_eq!(summary.spike_counts, vec![1, 1]);
    }

    #[test]
    fn run_reports_line_number() {
        let mut sut = create_network(chain_params()).unwrap();
        let result = sut.run(Cursor::new("1.0\n1.0 2.0\n"));

        assert_eq!(
            result.unwrap_err().to_string(),
            "input shape error: line 2: expected 1 synaptic inputs, got 2"
        );
    }

    #[test]
    fn layer_index_out_of_range() {
        let sut = create_network(chain_params()).unwrap();
        assert!(matches!(
            sut.get_layer(2),
            Err(NemoError::OutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn state_snapshot() {
        let mut sut = create_network(get_template_network_params()).unwrap();
        sut.tick(&[1.0]).unwrap();

        let snapshot = sut.extract_state_snapshot();
        assert_eq!(snapshot.t, 1);
        assert_eq!(snapshot.neuron_states.len(), 3);
        assert_eq!(snapshot.neuron_states[2].layer_id, 1);
        assert_eq!(snapshot.neuron_states[2].neuron_idx, 0);
        assert_approx_eq!(f64, snapshot.neuron_states[0].voltage, 0.6);
    }
}
