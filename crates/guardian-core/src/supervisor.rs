//! Session supervisor actor
//!
//! Owns the session state machine and its tick producer. All commands and
//! ticks are funnelled through one task, so every transition is serialized
//! and there is never a command/tick race on the session.

use guardian_api::{
    DurationPreset, GeoLocation, GuardianError, GuardianResult, PolicySet, SessionView,
};
use guardian_config::EngineConfig;
use guardian_util::SessionId;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::clock::{Tick, TickerHandle, TimerClock};
use crate::dispatch::{EscalationDispatcher, EscalationPorts};
use crate::events::SessionEvent;
use crate::session::GuardianSession;

enum SupervisorCommand {
    Start {
        policy: PolicySet,
        reply: oneshot::Sender<GuardianResult<SessionId>>,
    },
    SelectDuration {
        preset: DurationPreset,
        reply: oneshot::Sender<GuardianResult<()>>,
    },
    Pause {
        reply: oneshot::Sender<GuardianResult<()>>,
    },
    Resume {
        reply: oneshot::Sender<GuardianResult<()>>,
    },
    Reset {
        reply: oneshot::Sender<GuardianResult<()>>,
    },
    TriggerSos {
        reply: oneshot::Sender<GuardianResult<()>>,
    },
    ReportLocation {
        location: GeoLocation,
    },
    GetView {
        reply: oneshot::Sender<SessionView>,
    },
    Shutdown,
}

struct SessionSupervisor {
    session: GuardianSession,
    clock: TimerClock,

    /// Running tick producer, present exactly while the session is ACTIVE
    ticker: Option<TickerHandle>,
    next_epoch: u64,

    cmd_rx: mpsc::UnboundedReceiver<SupervisorCommand>,
    tick_rx: mpsc::UnboundedReceiver<Tick>,
    tick_tx: mpsc::UnboundedSender<Tick>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionSupervisor {
    /// Spawn the supervisor and its escalation dispatcher, returning the
    /// handle used to drive them.
    pub fn spawn(config: &EngineConfig, ports: EscalationPorts) -> SupervisorHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        EscalationDispatcher::spawn(ports, config.dispatch, event_rx);

        let supervisor = Self {
            session: GuardianSession::new(config.default_preset),
            clock: TimerClock::new(config.tick_interval),
            ticker: None,
            next_epoch: 0,
            cmd_rx,
            tick_rx,
            tick_tx,
            event_tx,
        };
        tokio::spawn(supervisor.run());

        SupervisorHandle { tx: cmd_tx }
    }

    async fn run(mut self) {
        info!("Session supervisor started");
        loop {
            tokio::select! {
                command = self.cmd_rx.recv() => {
                    match command {
                        Some(SupervisorCommand::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                Some(tick) = self.tick_rx.recv() => {
                    self.handle_tick(tick);
                }
            }
        }
        self.ticker = None;
        info!("Session supervisor stopped");
    }

    fn handle_command(&mut self, command: SupervisorCommand) {
        match command {
            SupervisorCommand::Start { policy, reply } => {
                let result = self.session.start(policy, guardian_util::now());
                let result = match result {
                    Ok((session_id, events)) => {
                        self.start_ticker();
                        self.forward(events);
                        Ok(session_id)
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }

            SupervisorCommand::SelectDuration { preset, reply } => {
                let _ = reply.send(self.session.select_duration(preset));
            }

            SupervisorCommand::Pause { reply } => {
                let result = self.session.pause(guardian_util::now()).map(|events| {
                    self.ticker = None;
                    self.forward(events);
                });
                let _ = reply.send(result);
            }

            SupervisorCommand::Resume { reply } => {
                let result = self.session.resume(guardian_util::now()).map(|events| {
                    self.start_ticker();
                    self.forward(events);
                });
                let _ = reply.send(result);
            }

            SupervisorCommand::Reset { reply } => {
                let result = self.session.reset().map(|events| {
                    self.ticker = None;
                    self.forward(events);
                });
                let _ = reply.send(result);
            }

            SupervisorCommand::TriggerSos { reply } => {
                let result = self.session.sos(guardian_util::now()).map(|events| {
                    self.ticker = None;
                    self.forward(events);
                });
                let _ = reply.send(result);
            }

            SupervisorCommand::ReportLocation { location } => {
                self.session.note_location(location);
            }

            SupervisorCommand::GetView { reply } => {
                let _ = reply.send(self.session.view());
            }

            SupervisorCommand::Shutdown => unreachable!("handled in run loop"),
        }
    }

    fn handle_tick(&mut self, tick: Tick) {
        // A tick from a dead producer may still be queued after a transition
        // out of ACTIVE; only the current epoch counts.
        let current = match &self.ticker {
            Some(handle) => handle.epoch(),
            None => {
                debug!(epoch = tick.epoch, "Dropped tick, no active ticker");
                return;
            }
        };
        if tick.epoch != current {
            debug!(epoch = tick.epoch, current, "Dropped stale tick");
            return;
        }

        let events = self.session.tick(guardian_util::now());
        self.forward(events);

        if self.session.state().is_terminal() {
            self.ticker = None;
        }
    }

    fn start_ticker(&mut self) {
        self.next_epoch += 1;
        self.ticker = Some(self.clock.start(self.next_epoch, self.tick_tx.clone()));
    }

    fn forward(&self, events: Vec<SessionEvent>) {
        for event in events {
            let _ = self.event_tx.send(event);
        }
    }
}

/// Cloneable async front for the supervisor actor
#[derive(Clone)]
pub struct SupervisorHandle {
    tx: mpsc::UnboundedSender<SupervisorCommand>,
}

impl SupervisorHandle {
    /// Spawn a supervisor for `config` driving the given ports
    pub fn spawn(config: &EngineConfig, ports: EscalationPorts) -> Self {
        SessionSupervisor::spawn(config, ports)
    }

    pub async fn start(&self, policy: PolicySet) -> GuardianResult<SessionId> {
        self.request(|reply| SupervisorCommand::Start { policy, reply })
            .await?
    }

    pub async fn select_duration(&self, preset: DurationPreset) -> GuardianResult<()> {
        self.request(|reply| SupervisorCommand::SelectDuration { preset, reply })
            .await?
    }

    pub async fn pause(&self) -> GuardianResult<()> {
        self.request(|reply| SupervisorCommand::Pause { reply }).await?
    }

    pub async fn resume(&self) -> GuardianResult<()> {
        self.request(|reply| SupervisorCommand::Resume { reply }).await?
    }

    pub async fn reset(&self) -> GuardianResult<()> {
        self.request(|reply| SupervisorCommand::Reset { reply }).await?
    }

    pub async fn trigger_sos(&self) -> GuardianResult<()> {
        self.request(|reply| SupervisorCommand::TriggerSos { reply }).await?
    }

    /// Fire-and-forget location fix from the UI's location collaborator
    pub fn report_location(&self, location: GeoLocation) {
        let _ = self.tx.send(SupervisorCommand::ReportLocation { location });
    }

    pub async fn view(&self) -> GuardianResult<SessionView> {
        self.request(|reply| SupervisorCommand::GetView { reply }).await
    }

    /// Ask the supervisor to stop. Queued commands ahead of the shutdown are
    /// still processed.
    pub fn shutdown(&self) {
        let _ = self.tx.send(SupervisorCommand::Shutdown);
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SupervisorCommand,
    ) -> GuardianResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .map_err(|_| GuardianError::SupervisorUnavailable)?;
        reply_rx.await.map_err(|_| GuardianError::SupervisorUnavailable)
    }
}
