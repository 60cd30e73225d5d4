mod cli;
mod sampler;
mod worker;

use clap::Parser;
use lv_core::CancelFlag;
use lv_preview::StepCallback;

use crate::cli::Cli;
use crate::sampler::SyntheticSampler;
use crate::worker::{PreviewWorker, WorkerResponse};

#[cfg(feature = "wgpu")]
type AppBackend = burn_wgpu::Wgpu;

#[cfg(not(feature = "wgpu"))]
type AppBackend = burn_ndarray::NdArray;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    println!("🔭 Latent Preview");
    println!("=================\n");

    // Fail before sampling if the architecture cannot be previewed
    let profile = lv_preview::resolve(cli.architecture)?;

    let device = Default::default();
    let sampler = SyntheticSampler::<AppBackend>::new(cli.sampler_config(profile.latent_channels()), &device);
    log::info!(
        "Sampling {} steps (order {}) with the {} preview profile",
        sampler.config().total_steps(),
        sampler.config().order,
        profile.name
    );

    let mut worker = PreviewWorker::new(cli.output_dir.clone())?;
    let mut sink = worker.sink();
    let cancel = CancelFlag::new();
    let callback = StepCallback::default();

    let outcome = sampler.run(|state| {
        callback.on_step(&mut sink, state, cli.architecture, &cancel)?;

        if cli.cancel_after == Some(state.step) {
            log::info!("Requesting cancellation after step {}", state.step);
            cancel.cancel();
        }
        Ok(())
    });

    worker.shutdown();

    let mut saved = 0;
    let mut last_progress = 0.0;
    while let Some(response) = worker.try_recv_response() {
        match response {
            WorkerResponse::Saved { index, path } => {
                log::debug!("Preview {} -> {}", index, path.display());
                saved += 1;
            }
            WorkerResponse::Progress(p) => last_progress = p,
            WorkerResponse::Error(e) => log::error!("{}", e),
        }
    }

    match outcome {
        Ok(steps) => {
            println!("✓ {} steps, {} previews in {}", steps, saved, cli.output_dir.display());
        }
        Err(e) if e.is_canceled() => {
            println!(
                "✗ Canceled at {:.0}%, {} previews in {}",
                last_progress * 100.0,
                saved,
                cli.output_dir.display()
            );
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
