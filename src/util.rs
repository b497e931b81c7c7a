/// Per-tick retention factor of a single-pole RC leak sampled at the clock rate.
/// A node without capacitance retains nothing, whatever the resistance.
pub fn get_leak_decay_factor(leak_resistance: f64, capacitance: f64, clock_frequency: f64) -> f64 {
    if capacitance == 0.0 {
        return 0.0;
    }

    let tau_ticks = leak_resistance * capacitance * clock_frequency;
    (-1.0 / tau_ticks).exp()
}

pub fn spikes_to_inputs(spikes: &[bool]) -> Vec<f64> {
    spikes
        .iter()
        .map(|spiked| if *spiked { 1.0 } else { 0.0 })
        .collect()
}

#[cfg(test)]
pub mod test_util {
    use float_cmp::{assert_approx_eq, ApproxEq};
    use std::fmt::Debug;

    use crate::params::{CircuitParams, LayerParams, NetworkParams, NeuronParams};

    pub fn assert_approx_eq_slice<T>(left: &[T], right: &[T])
    where
        T: ApproxEq + Debug + Copy,
    {
        assert_eq!(left.len(), right.len());

        for item in left.iter().zip(right) {
            assert_approx_eq!(T, *item.0, *item.1);
        }
    }

    /// Dimensionless circuit: unit capacitances, no leak, 1.2 V supply.
    pub fn get_lossless_circuit_params() -> CircuitParams {
        CircuitParams {
            supply_voltage: 1.2,
            threshold: 1.0,
            neuron_capacitance: 1.0,
            unit_capacitance: 1.0,
            fan_in_capacitance: 0.0,
            leak_resistance: f64::INFINITY,
            clock_frequency: 1.0,
            refractory_period: 2,
        }
    }

    pub fn get_lossless_neuron_params() -> NeuronParams {
        get_lossless_circuit_params().neuron_params()
    }

    pub fn get_template_network_params() -> NetworkParams {
        NetworkParams {
            layers: vec![
                LayerParams::uniform(vec![vec![1.0], vec![2.0]]),
                LayerParams::uniform(vec![vec![1.0, 1.0]]),
            ],
            circuit_params: get_lossless_circuit_params(),
            ..NetworkParams::default()
        }
    }
}
