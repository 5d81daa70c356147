use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use histkit::data::{write_json, write_parquet, BinAxis, StoredHistogram};

/// Write a handful of demo histogram files to try the extractor and plotter on.
#[derive(Debug, Parser)]
struct Args {
    /// Output directory
    #[arg(default_value = "sample_data")]
    out_dir: PathBuf,
    /// Number of runs (files) to generate
    #[arg(long, default_value_t = 4)]
    runs: usize,
    /// Entries filled per histogram
    #[arg(long, default_value_t = 20_000)]
    entries: usize,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn exponential(&mut self, mean: f64) -> f64 {
        -mean * self.next_f64().max(1e-15).ln()
    }
}

/// Unweighted fill: out-of-range samples land in the flow bins.
fn fill(axes: &[BinAxis], samples: &[Vec<f64>]) -> Vec<f64> {
    let cells: usize = axes.iter().map(|a| a.bins() + 2).product();
    let mut contents = vec![0.0; cells];
    for sample in samples {
        let mut global = 0;
        let mut stride = 1;
        for (axis, &v) in axes.iter().zip(sample) {
            let edges = axis.edges();
            let index = if v < edges[0] {
                0
            } else if v >= edges[edges.len() - 1] {
                axis.bins() + 1
            } else {
                edges.partition_point(|e| *e <= v)
            };
            global += index * stride;
            stride *= axis.bins() + 2;
        }
        contents[global] += 1.0;
    }
    contents
}

fn main() -> Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let mut rng = SimpleRng::new(42);

    // Log-spaced energy binning, 1 keV .. 10 MeV
    let energy_edges: Vec<f64> = (0..=80).map(|i| 10f64.powf(-3.0 + i as f64 * 0.05)).collect();
    let energy_axis = BinAxis::from_edges(energy_edges)?;
    let pos_axis = BinAxis::uniform(40, -10.0, 10.0)?;

    for run in 0..args.runs {
        let mean_energy = 0.5 + run as f64 * 0.25;
        let energies: Vec<Vec<f64>> = (0..args.entries)
            .map(|_| vec![rng.exponential(mean_energy)])
            .collect();
        let hits: Vec<Vec<f64>> = (0..args.entries)
            .map(|_| vec![rng.gauss(0.0, 2.0 + run as f64), rng.gauss(1.0, 3.0)])
            .collect();

        let axes_1d = vec![energy_axis.clone()];
        let mut e_neutron = StoredHistogram::new(
            "ENeutron",
            "Neutron energy [MeV]",
            axes_1d.clone(),
            fill(&axes_1d, &energies),
            None,
        )?;
        let axes_2d = vec![pos_axis.clone(), pos_axis.clone()];
        let hit_map = StoredHistogram::new(
            "HitMap",
            "Hit position [cm]",
            axes_2d.clone(),
            fill(&axes_2d, &hits),
            None,
        )?;

        // The last run misses ENeutron so the plotter has something to skip.
        let mut histograms = vec![hit_map];
        if run + 1 < args.runs {
            e_neutron.title = format!("Neutron energy, run {run} [MeV]");
            histograms.insert(0, e_neutron);
        }

        let stem = format!("run_{run:02}");
        let path = if run % 2 == 0 {
            args.out_dir.join(format!("{stem}.json"))
        } else {
            args.out_dir.join(format!("{stem}.parquet"))
        };
        if run % 2 == 0 {
            write_json(&path, &histograms)?;
        } else {
            write_parquet(&path, &histograms)?;
        }
        println!("Wrote {} histograms to {}", histograms.len(), path.display());
    }

    Ok(())
}
