use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use agc::audio_source::{AudioSource, CpalAudioSource};
use agc::config::{Args, Config};
use agc::core_loop::CoreLoop;
use agc::error::AgcError;
use agc::input::{CrosstermUserInput, UserInput};
use agc::renderer::{NullRenderer, RendererControl};
use agc::status::ConsoleStatusSink;

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    if args.list_devices {
        return match CpalAudioSource::list_devices() {
            Ok(devices) => {
                for (i, name) in devices.iter().enumerate() {
                    println!("[{i}] {name}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("failed to list audio devices: {e}");
                ExitCode::from(e.exit_code() as u8)
            }
        };
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(args: Args) -> Result<(), AgcError> {
    let config = Config::from_args(&args)?;
    info!("starting agc loop for renderer '{}'", config.device);

    let audio_source = CpalAudioSource::open(config.device_index, true)?;
    let interrupted = Arc::new(AtomicBool::new(false));
    let user_input = CrosstermUserInput::new(interrupted.clone()).map_err(|_| {
        AgcError::InvalidConfig("failed to initialize terminal input".into())
    })?;

    let renderer: Arc<dyn RendererControl> = Arc::new(NullRenderer::new());
    let discovery_runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| AgcError::InvalidConfig(format!("failed to start runtime: {e}")))?;
    let handle = discovery_runtime.block_on(renderer.discover(&config.device))?;
    drop(discovery_runtime);

    let core = CoreLoop::new(
        config,
        renderer,
        handle,
        50,
        audio_source.events(),
        user_input.events(),
        Box::new(ConsoleStatusSink::new()),
        interrupted,
    )?;

    core.run()?;
    println!();
    info!("agc loop stopped");
    Ok(())
}
