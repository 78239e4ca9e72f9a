use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::input::{spawn_stdin_reader, Command, Control, InputManager};
use crate::scene::{HeadlessScene, Scene};
use crate::sync::SyncEngine;
use crate::transport::{Transport, TransportEvent};
use log::{error, info, warn};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

pub struct Client {
    transport: Transport,
    engine: SyncEngine<HeadlessScene>,
    input_manager: InputManager,
    config: ClientConfig,
}

impl Client {
    pub async fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = Transport::connect(&config.endpoint).await?;
        let engine = SyncEngine::new(HeadlessScene::new(), config.hit_grace);

        Ok(Client {
            transport,
            engine,
            input_manager: InputManager::new(),
            config,
        })
    }

    pub fn engine(&self) -> &SyncEngine<HeadlessScene> {
        &self.engine
    }

    /// Encodes and sends whatever the engine queued, in order.
    async fn flush_outbound(&mut self) -> Result<(), ClientError> {
        for envelope in self.engine.drain_outbound() {
            let text = envelope.encode().map_err(|e| {
                error!("Failed to encode {}: {}", envelope.topic(), e);
                e
            })?;
            self.transport.send(text).await?;
        }
        Ok(())
    }

    fn handle_event(&mut self, event: TransportEvent) -> Result<(), ClientError> {
        match event {
            TransportEvent::Opened => {
                info!("Joining room {}", self.config.endpoint.room);
                self.engine.on_open();
            }
            TransportEvent::Message(text) => self.engine.handle_text(&text, Instant::now()),
            TransportEvent::Closed { reason } => {
                let reason = reason.unwrap_or_else(|| "closed by server".to_string());
                warn!("Disconnected: {}", reason);
                return Err(ClientError::ConnectionLost(reason));
            }
        }
        Ok(())
    }

    pub async fn run(&mut self) -> Result<(), ClientError> {
        let commands = spawn_stdin_reader();
        self.run_with_commands(commands).await
    }

    /// Drives the session until the user quits or the channel closes.
    pub async fn run_with_commands(
        &mut self,
        mut commands: mpsc::Receiver<Command>,
    ) -> Result<(), ClientError> {
        let mut movement_interval = interval(self.config.movement_interval);
        movement_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frame_interval = interval(self.config.frame_interval);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut stdin_open = true;

        loop {
            let reporting = self.engine.is_reporting();

            tokio::select! {
                event = self.transport.next_event() => {
                    match event {
                        Some(event) => self.handle_event(event)?,
                        None => return Err(ClientError::ConnectionLost("transport stopped".into())),
                    }
                },

                _ = movement_interval.tick(), if reporting => {
                    self.engine.report_movement();
                },

                _ = frame_interval.tick() => {
                    let walk = self.input_manager.walk();
                    let scene = self.engine.scene_mut();
                    scene.set_walk(walk);
                    let sample = scene.sample_frame();
                    self.engine.on_frame_tick(sample, Instant::now());
                },

                command = commands.recv(), if stdin_open => {
                    match command.map(|command| self.input_manager.apply(command)) {
                        Some(Some(Control::Start)) => {
                            self.engine.request_start();
                        }
                        Some(Some(Control::Quit)) => {
                            info!("Quitting");
                            break;
                        }
                        Some(None) => {}
                        None => {
                            info!("Input closed, continuing without controls");
                            stdin_open = false;
                        }
                    }
                },
            }

            self.flush_outbound().await?;
        }

        self.flush_outbound().await?;
        self.transport.close();
        Ok(())
    }
}
