use std::process::ExitCode;

use anyhow::Context;
use termtune::args::{self, Invocation};
use termtune::event::{EventLoop, InputListener, Ticker};
use termtune::playback::PlaybackController;
use termtune::stream::{DecodedStream, SampleRate, SymphoniaStream};
use termtune::streaming::RodioDevice;
use termtune::tui::TerminalRenderer;
use termtune::{logging, PlayerConfig, PlayerError};
use tracing::{error, info};

fn run(cli: args::CliArgs) -> anyhow::Result<()> {
    let config = PlayerConfig::from_env().map_err(PlayerError::from)?;
    logging::init(&config.log_path());
    info!(file = %cli.file.display(), "starting");

    let stream = SymphoniaStream::open(&cli.file)?;
    let output_rate = config
        .output_sample_rate
        .map(SampleRate::new)
        .unwrap_or_else(|| stream.sample_rate());
    info!(
        rate = %stream.sample_rate(),
        channels = stream.channels(),
        samples = stream.len(),
        "stream opened"
    );

    let device = RodioDevice::init(output_rate, config.buffer_size(output_rate))?;
    let mut controller = PlaybackController::new(Box::new(stream), device, &config);

    let title = cli
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.file.display().to_string());
    let mut renderer = TerminalRenderer::new(title)?;

    EventLoop::new(&controller, &mut renderer).render();
    controller.play()?;

    let listener = InputListener::spawn().context("failed to start the input listener")?;
    EventLoop::new(&controller, &mut renderer)
        .run(listener.events(), Ticker::new(config.tick_interval()));

    listener.stop();
    drop(renderer);
    controller.close();
    info!("stopped");
    Ok(())
}

fn main() -> ExitCode {
    let cli = match args::parse(std::env::args_os()) {
        Ok(Invocation::Play(cli)) => cli,
        Ok(Invocation::Info(text)) => {
            print!("{text}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
