use nemosim::params::{LayerParams, NetworkParams};
use rand::{distributions::Uniform, prelude::Distribution, rngs::StdRng, SeedableRng};

const NUM_IN_CHANNELS: usize = 8;
const LAYER_SIZES: [usize; 2] = [16, 4];

pub fn get_scenario_params() -> NetworkParams {
    let params_yaml_str = r#"
layers: []
circuit_params:
  supply_voltage: 1.2
  threshold: 0.5
  neuron_capacitance: 1.0e-12
  unit_capacitance: 4.0e-15
  fan_in_capacitance: 5.5e-15
  leak_resistance: 1.0e6
  clock_frequency: 1.0e7
  refractory_period: 2
ds_params:
  clock_frequency_mhz: 10.0
  bit_width: 4
  mode: Threshold
technical_params:
  record_traces: false
"#;

    let mut params: NetworkParams = serde_yaml::from_str(params_yaml_str).unwrap();

    let mut rng = StdRng::seed_from_u64(0);
    let weight_dist = Uniform::new_inclusive(0, 60);
    let mut fan_in = NUM_IN_CHANNELS;

    for num_neurons in LAYER_SIZES {
        let weights = (0..num_neurons)
            .map(|_| {
                (0..fan_in)
                    .map(|_| weight_dist.sample(&mut rng) as f64)
                    .collect()
            })
            .collect();

        params.layers.push(LayerParams::uniform(weights));
        fan_in = num_neurons;
    }

    params
}

pub fn get_num_in_channels() -> usize {
    NUM_IN_CHANNELS
}
