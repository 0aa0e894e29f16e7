//! Simulated federated rounds over in-process linear-regression clients.
//!
//! Run with `RUST_LOG=fedround=debug cargo run --example simulated_round`.

use std::error::Error;
use std::sync::{Arc, Mutex};

use fedround::{
    Client, ClientError, Coordinator, CoordinatorConfig, ModelFootprint, ModelState, Split, Tensor,
    TrainParams,
};
use rand::prelude::*;
use tracing_subscriber::EnvFilter;

/// Fits `y = w * x + b` on private samples drawn around `y = 3x + 1`.
struct RegressionClient {
    id: String,
    group: String,
    train: Vec<(f32, f32)>,
    test: Vec<(f32, f32)>,
    model: Mutex<(f32, f32)>,
}

impl RegressionClient {
    fn new(index: usize, rng: &mut StdRng) -> Self {
        let n = rng.gen_range(20..120);
        let mut sample = |count: usize| -> Vec<(f32, f32)> {
            (0..count)
                .map(|_| {
                    let x: f32 = rng.gen_range(-1.0..1.0);
                    let noise: f32 = rng.gen_range(-0.1..0.1);
                    (x, 3.0 * x + 1.0 + noise)
                })
                .collect()
        };
        let train = sample(n);
        let test = sample(n / 4 + 1);
        Self {
            id: format!("client_{:02}", index),
            group: (if index % 2 == 0 { "even" } else { "odd" }).to_string(),
            train,
            test,
            model: Mutex::new((0.0, 0.0)),
        }
    }

    fn mse(&self, data: &[(f32, f32)]) -> f32 {
        let (w, b) = *self.model.lock().unwrap();
        data.iter().map(|(x, y)| (w * x + b - y).powi(2)).sum::<f32>() / data.len() as f32
    }
}

fn scalar(state: &ModelState, key: &str) -> Result<f32, ClientError> {
    match state.get(key) {
        Some(Tensor::F32(a)) => a.iter().copied().next().ok_or_else(|| "empty tensor".into()),
        _ => Err(format!("missing f32 parameter '{}'", key).into()),
    }
}

impl Client for RegressionClient {
    type Metrics = f32;

    fn id(&self) -> &str {
        &self.id
    }

    fn group(&self) -> &str {
        &self.group
    }

    fn num_train_samples(&self) -> u64 {
        self.train.len() as u64
    }

    fn num_test_samples(&self) -> u64 {
        self.test.len() as u64
    }

    fn load_state(&self, state: &ModelState) -> Result<(), ClientError> {
        *self.model.lock().unwrap() = (scalar(state, "w")?, scalar(state, "b")?);
        Ok(())
    }

    fn train(&self, params: &TrainParams) -> Result<(u64, ModelState), ClientError> {
        let lr = 0.1;
        let mut model = self.model.lock().unwrap();
        let take = match params.minibatch_fraction {
            Some(f) => ((self.train.len() as f32 * f).ceil() as usize).max(1),
            None => self.train.len(),
        };
        let mut seen = 0u64;
        for _ in 0..params.num_epochs {
            for batch in self.train[..take].chunks(params.batch_size) {
                let (w, b) = *model;
                let (gw, gb) = batch.iter().fold((0.0, 0.0), |(gw, gb), (x, y)| {
                    let err = w * x + b - y;
                    (gw + err * x, gb + err)
                });
                let n = batch.len() as f32;
                *model = (w - lr * 2.0 * gw / n, b - lr * 2.0 * gb / n);
                seen += batch.len() as u64;
            }
        }
        let (w, b) = *model;
        let state = ModelState::new()
            .with("w", Tensor::scalar(w))
            .with("b", Tensor::scalar(b));
        Ok((seen, state))
    }

    fn test(&self, _batch_size: usize, split: Split) -> Result<f32, ClientError> {
        Ok(match split {
            Split::Train => self.mse(&self.train),
            Split::Test => self.mse(&self.test),
        })
    }

    fn footprint(&self) -> ModelFootprint {
        ModelFootprint::Single { bytes: 8 }
    }
}

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = StdRng::seed_from_u64(7);
    let pool: Vec<Arc<RegressionClient>> = (0..30)
        .map(|i| Arc::new(RegressionClient::new(i, &mut rng)))
        .collect();

    let initial = ModelState::new()
        .with("w", Tensor::scalar(0.0))
        .with("b", Tensor::scalar(0.0));
    let config = CoordinatorConfig {
        clients_per_round: 8,
        ..CoordinatorConfig::default()
    };
    let mut coord = Coordinator::new(initial, config)?;

    println!("fedround demo: {} clients, 8 per round\n", pool.len());

    for round in 0..10 {
        coord.select_clients_default(round, &pool);
        let sys = coord.train_round_default(None)?;
        let summary = coord.aggregate_and_commit()?;

        let losses = coord.evaluate_default(None, Split::Test)?;
        let mean_loss = losses.values().sum::<f32>() / losses.len().max(1) as f32;
        let bytes: u64 = sys.values().map(|s| s.bytes_read + s.bytes_written).sum();

        println!(
            "round {:>2}: {} updates, {} samples, {} bytes moved, test mse {:.4}",
            round, summary.n_updates, summary.total_weight, bytes, mean_loss
        );
    }

    let global = coord.global_model();
    println!(
        "\nlearned w = {:.3}, b = {:.3} (target 3.0, 1.0)",
        scalar(global, "w")?,
        scalar(global, "b")?
    );

    let dir = std::env::temp_dir().join("fedround-demo");
    let path = coord.save_model(dir.join("global.flck"))?;
    println!("checkpoint written to {}", path.display());
    Ok(())
}
