use std::io::Cursor;
use std::time::Instant;

use itertools::Itertools;
use nemosim::network;
use rand::{prelude::Distribution, rngs::StdRng, SeedableRng};
use statrs::distribution::Poisson;

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() {
    let mut network = network::create_network(scenario_params::get_scenario_params()).unwrap();

    let num_in_channels = scenario_params::get_num_in_channels();
    let mut rng = StdRng::seed_from_u64(0);
    let code_dist = Poisson::new(5.0).unwrap();
    let num_lines = 2000;

    let input = (0..num_lines)
        .map(|_| {
            (0..num_in_channels)
                .map(|_| code_dist.sample(&mut rng).min(15.0))
                .join(" ")
        })
        .join("\n");

    let wall_start = Instant::now();
    let summary = network.run(Cursor::new(input)).unwrap();
    let wall_time = wall_start.elapsed();

    let tick_throughput = summary.internal_ticks as f64 / wall_time.as_secs_f64();

    eprintln!(
        "External ticks: {}, internal ticks: {}",
        summary.external_ticks, summary.internal_ticks
    );
    eprintln!("Spikes per layer: {:?}", summary.spike_counts);
    eprintln!(
        "Tick throughput: {:.3e} ({:.3} ns per tick)",
        tick_throughput,
        1e9 / tick_throughput
    );
    eprintln!(
        "Synapse energy: {:.6e}, neuron energy: {:.6e}",
        summary.total_synapse_energy, summary.total_neuron_energy
    );
}
