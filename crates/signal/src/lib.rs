//! RGB signal service: a background renderer fed with discrete display commands.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::{LampError, Rgb};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

const COMMAND_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalCommand {
    /// Every pixel set to one colour.
    Solid(Rgb),
    /// One colour per pixel; short frames are padded with black.
    Paint(Vec<Rgb>),
}

impl SignalCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SignalCommand::Solid(_) => "solid",
            SignalCommand::Paint(_) => "paint",
        }
    }
}

#[async_trait]
pub trait SignalService: Send {
    async fn start(&mut self) -> Result<(), LampError>;
    async fn dispatch(&mut self, command: SignalCommand) -> Result<(), LampError>;
    /// Stops the service. Stopping a service that is not running is a no-op.
    async fn stop(&mut self) -> Result<(), LampError>;
}

/// Output device for rendered frames.
pub trait LedStrip: Send + 'static {
    fn pixel_count(&self) -> usize;
    fn show(&mut self, pixels: &[Rgb]) -> Result<(), LampError>;
}

/// Strip that keeps every shown frame; clones share the same history.
#[derive(Debug, Clone)]
pub struct MemoryStrip {
    pixel_count: usize,
    frames: Arc<Mutex<Vec<Vec<Rgb>>>>,
}

impl MemoryStrip {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            pixel_count,
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn frames(&self) -> Vec<Vec<Rgb>> {
        self.frames
            .lock()
            .map(|frames| frames.clone())
            .unwrap_or_default()
    }

    pub fn last_frame(&self) -> Option<Vec<Rgb>> {
        self.frames().pop()
    }
}

impl LedStrip for MemoryStrip {
    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn show(&mut self, pixels: &[Rgb]) -> Result<(), LampError> {
        self.frames
            .lock()
            .map_err(|_| LampError::Signal("frame buffer lock poisoned".into()))?
            .push(pixels.to_vec());
        Ok(())
    }
}

/// Strip that reports frames through `tracing`; used where no LED driver is attached.
#[derive(Debug, Clone, Copy)]
pub struct TracingStrip {
    pixel_count: usize,
}

impl TracingStrip {
    pub fn new(pixel_count: usize) -> Self {
        Self { pixel_count }
    }
}

impl LedStrip for TracingStrip {
    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn show(&mut self, pixels: &[Rgb]) -> Result<(), LampError> {
        let lit = pixels.iter().filter(|p| **p != Rgb::OFF).count();
        info!(pixels = pixels.len(), lit, "frame shown");
        Ok(())
    }
}

fn render(command: &SignalCommand, pixel_count: usize) -> Vec<Rgb> {
    match command {
        SignalCommand::Solid(color) => vec![*color; pixel_count],
        SignalCommand::Paint(colors) => {
            let mut frame = colors.clone();
            frame.resize(pixel_count, Rgb::OFF);
            frame
        }
    }
}

struct Running<S> {
    commands: mpsc::Sender<SignalCommand>,
    worker: JoinHandle<S>,
}

/// [`SignalService`] rendering on a tokio task.
///
/// The strip moves into the worker on `start` and comes back on `stop`, so the
/// service can be restarted.
pub struct RgbService<S: LedStrip> {
    strip: Option<S>,
    running: Option<Running<S>>,
}

impl<S: LedStrip> RgbService<S> {
    pub fn new(strip: S) -> Self {
        Self {
            strip: Some(strip),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

#[async_trait]
impl<S: LedStrip> SignalService for RgbService<S> {
    async fn start(&mut self) -> Result<(), LampError> {
        if self.running.is_some() {
            return Err(LampError::Signal("rgb service already started".into()));
        }
        let mut strip = self
            .strip
            .take()
            .ok_or_else(|| LampError::Signal("rgb strip unavailable".into()))?;

        let (commands, mut rx) = mpsc::channel::<SignalCommand>(COMMAND_QUEUE_DEPTH);
        let worker = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                let frame = render(&command, strip.pixel_count());
                if let Err(err) = strip.show(&frame) {
                    warn!(command = command.name(), error = %err, "failed to render signal command");
                }
            }
            strip
        });

        self.running = Some(Running { commands, worker });
        info!("rgb service started");
        Ok(())
    }

    async fn dispatch(&mut self, command: SignalCommand) -> Result<(), LampError> {
        let running = self
            .running
            .as_ref()
            .ok_or_else(|| LampError::Signal("rgb service is not running".into()))?;
        debug!(command = command.name(), "dispatching signal command");
        running
            .commands
            .send(command)
            .await
            .map_err(|_| LampError::Signal("rgb worker exited".into()))
    }

    async fn stop(&mut self) -> Result<(), LampError> {
        let Some(Running { commands, worker }) = self.running.take() else {
            return Ok(());
        };
        drop(commands);
        let strip = worker
            .await
            .map_err(|err| LampError::Signal(format!("rgb worker failed: {err}")))?;
        self.strip = Some(strip);
        info!("rgb service stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn solid_command_fills_every_pixel() {
        let strip = MemoryStrip::new(4);
        let mut service = RgbService::new(strip.clone());

        service.start().await.expect("start");
        service
            .dispatch(SignalCommand::Solid(Rgb(10, 20, 30)))
            .await
            .expect("dispatch");
        service.stop().await.expect("stop");

        assert_eq!(strip.last_frame(), Some(vec![Rgb(10, 20, 30); 4]));
    }

    #[tokio::test]
    async fn stop_drains_queued_commands_in_order() {
        let strip = MemoryStrip::new(2);
        let mut service = RgbService::new(strip.clone());

        service.start().await.expect("start");
        service
            .dispatch(SignalCommand::Paint(vec![Rgb(255, 0, 0)]))
            .await
            .expect("paint");
        service
            .dispatch(SignalCommand::Solid(Rgb::OFF))
            .await
            .expect("solid");
        service.stop().await.expect("stop");

        assert_eq!(
            strip.frames(),
            vec![vec![Rgb(255, 0, 0), Rgb::OFF], vec![Rgb::OFF, Rgb::OFF]]
        );
    }

    #[tokio::test]
    async fn dispatch_before_start_is_rejected() {
        let mut service = RgbService::new(MemoryStrip::new(1));
        let err = service
            .dispatch(SignalCommand::Solid(Rgb::OFF))
            .await
            .expect_err("not started");
        assert_eq!(err.kind(), shared::ErrorKind::Signal);
    }

    #[tokio::test]
    async fn service_restarts_after_stop() {
        let strip = MemoryStrip::new(1);
        let mut service = RgbService::new(strip.clone());

        service.stop().await.expect("stop while idle");
        service.start().await.expect("first start");
        assert!(service.start().await.is_err());
        service.stop().await.expect("first stop");
        assert!(!service.is_running());

        service.start().await.expect("second start");
        service
            .dispatch(SignalCommand::Solid(Rgb(1, 2, 3)))
            .await
            .expect("dispatch");
        service.stop().await.expect("second stop");

        assert_eq!(strip.frames().len(), 1);
    }
}
