use std::thread;
use std::time::Instant;

use rally_audio::snapshot::SnapshotSource;
use triple_buffer::TripleBuffer;

use crate::engine::{DetectorState, RallyEngine};

/// Commands the UI thread sends to the engine thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Begin a counting session.
    Start,
    /// Stop and finalize the current session.
    Stop,
    /// Clear the counter without finalizing.
    Reset,
    /// Release the capture and exit the thread.
    Shutdown,
}

/// Spawn the engine on its own thread, ticking at `target_fps`.
///
/// Commands arrive over the returned sender; the latest [`DetectorState`]
/// is always readable from the returned buffer output without blocking the
/// engine. The thread exits on [`EngineCommand::Shutdown`] or when every
/// sender is dropped, closing the capture on the way out.
///
/// # Errors
/// Returns an error if the OS refuses to spawn the thread.
pub fn spawn_engine_thread<S: SnapshotSource + 'static>(
    mut engine: RallyEngine<S>,
    target_fps: u32,
) -> anyhow::Result<(flume::Sender<EngineCommand>, triple_buffer::Output<DetectorState>)> {
    let (cmd_tx, cmd_rx) = flume::unbounded::<EngineCommand>();
    let (mut buf_input, buf_output) = TripleBuffer::new(&DetectorState::default()).split();

    thread::Builder::new()
        .name("rally-engine".to_string())
        .spawn(move || {
            let frame_period =
                std::time::Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1)));
            let origin = Instant::now();

            loop {
                let now_ms = origin.elapsed().as_millis() as u64;

                loop {
                    match cmd_rx.try_recv() {
                        Ok(EngineCommand::Start) => {
                            if !engine.start(now_ms) {
                                log::warn!("start command failed, staying idle");
                            }
                        }
                        Ok(EngineCommand::Stop) => engine.stop(now_ms),
                        Ok(EngineCommand::Reset) => engine.reset(),
                        Ok(EngineCommand::Shutdown) => {
                            engine.close();
                            return;
                        }
                        Err(flume::TryRecvError::Empty) => break,
                        Err(flume::TryRecvError::Disconnected) => {
                            engine.close();
                            return;
                        }
                    }
                }

                engine.tick(now_ms);
                buf_input.write(engine.state().clone());

                thread::sleep(frame_period);
            }
        })?;

    Ok((cmd_tx, buf_output))
}
