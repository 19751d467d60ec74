use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, info, log_enabled, trace, warn, Level};

use crate::chip::{
    daemon::{
        clock::TimerClock,
        message::{ControlKind, ControlMessage, Message, MessageError},
        DaemonConfig, DaemonEvent, RunState, Shared,
    },
    Chip, Execution,
};

/// The owner of the chip. Runs on the execution thread until it receives
/// `Message::Shutdown` or every controller is gone.
pub(super) struct Actor<C: Chip> {
    chip: C,
    receiver: Receiver<Message<C::KeyAddress>>,
    published: Shared<C::Snapshot>,
    run_state: RunState,
    clock_speed: u32,
    timers: TimerClock,
    /// When the next instruction is due.
    next_step: Instant,
    trace_instructions: bool,
    event_sink: Option<Sender<DaemonEvent>>,
}

impl<C: Chip> Actor<C> {
    pub(super) fn new(
        chip: C,
        receiver: Receiver<Message<C::KeyAddress>>,
        published: Shared<C::Snapshot>,
        config: DaemonConfig,
    ) -> Self {
        let now = Instant::now();
        Actor {
            chip,
            receiver,
            published,
            run_state: RunState::Paused,
            clock_speed: config.clock_speed.max(1),
            timers: TimerClock::new(now),
            next_step: now,
            trace_instructions: config.trace_instructions,
            event_sink: config.event_sink,
        }
    }

    /// The actor loop. Every iteration drains the queue, then executes an
    /// instruction if one is due and finally waits for the next message or deadline,
    /// whatever comes first. Paused and halted daemons wait for messages only.
    pub(super) fn run(mut self) {
        debug!("[daemon] Execution thread running.");
        loop {
            if !self.drain() {
                break;
            }

            let received = match self.run_state {
                RunState::Running => {
                    let deadline = self.advance(Instant::now());
                    self.receiver.recv_deadline(deadline)
                }
                RunState::Paused | RunState::Halted(_) => self
                    .receiver
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(message) => {
                    if !self.handle(message) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("[daemon] All controllers are gone.");
                    break;
                }
            }
        }
        self.publish();
        info!("[daemon] Execution thread stopped.");
    }

    /// Processes every queued message. Returns false if the loop has to stop.
    fn drain(&mut self) -> bool {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => {
                    if !self.handle(message) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    info!("[daemon] All controllers are gone.");
                    return false;
                }
            }
        }
    }

    /// Updates the timers and executes the next instruction if it is due. Returns
    /// the instant the actor has to wake up again at the latest.
    fn advance(&mut self, now: Instant) -> Instant {
        let ticks = self.timers.elapsed_ticks(now);
        if ticks > 0 {
            self.chip.decrement_timers(ticks);
        }

        let mut stepped = false;
        if self.chip.execution() == Execution::Ready && now >= self.next_step {
            self.step();
            stepped = true;
            self.next_step = now + self.step_interval();
        }
        if ticks > 0 && !stepped {
            self.publish();
        }

        match self.chip.execution() {
            Execution::Ready => self.next_step.min(self.timers.next_tick()),
            Execution::AwaitingKey { .. } => self.timers.next_tick(),
        }
    }

    fn step_interval(&self) -> Duration {
        Duration::from_secs(1) / self.clock_speed
    }

    fn step(&mut self) {
        let address = self.chip.program_counter();
        let traced = if self.trace_instructions || log_enabled!(Level::Trace) {
            Some((self.chip.instruction_at(address), self.chip.disassemble(address)))
        } else {
            None
        };

        let result = self.chip.step();
        if let Err(fault) = result {
            warn!("[chip8] {}", fault);
            self.set_run_state(RunState::Halted(fault));
        }
        self.publish();

        match result {
            Ok(execution) => {
                if let Some((instruction, mnemonic)) = traced {
                    trace!(
                        "[chip8] {:03X}: {}",
                        address,
                        mnemonic.as_deref().unwrap_or("???")
                    );
                    if self.trace_instructions {
                        self.emit(DaemonEvent::Executed {
                            address,
                            instruction,
                            mnemonic,
                        });
                    }
                }
                if let Execution::AwaitingKey { register } = execution {
                    debug!("[chip8] Waiting for a key to store in V{:X}.", register);
                }
            }
            Err(fault) => self.emit(DaemonEvent::Halted(fault)),
        }
    }

    /// Returns false if the loop has to stop.
    fn handle(&mut self, message: Message<C::KeyAddress>) -> bool {
        match message {
            Message::Control(message) => self.control(message),
            Message::KeyDown(key) => {
                debug!("[daemon] Key {:?} down.", key);
                self.chip.set_key_down(key);
                self.publish();
            }
            Message::KeyUp(key) => {
                debug!("[daemon] Key {:?} up.", key);
                self.chip.set_key_up(key);
                self.publish();
            }
            Message::SetClockSpeed(clock_speed) => {
                self.clock_speed = clock_speed.max(1);
                // The next step is due within one interval of the new speed.
                self.next_step = self.next_step.min(Instant::now() + self.step_interval());
                info!(
                    "[daemon] Clock speed set to {} instructions per second.",
                    self.clock_speed
                );
                self.publish();
                self.emit(DaemonEvent::ClockSpeedChanged(self.clock_speed));
            }
            Message::Shutdown => {
                info!("[daemon] Shutting down.");
                if self.run_state == RunState::Running {
                    self.set_run_state(RunState::Paused);
                }
                return false;
            }
        }
        true
    }

    /// Processes a control message and invokes its callback once the resulting
    /// state is published.
    fn control(&mut self, message: ControlMessage) {
        debug!("[daemon] Processing {:?}.", message);
        let result = match message.kind {
            ControlKind::Reset => {
                self.chip.reset();
                if let RunState::Halted(_) = self.run_state {
                    self.set_run_state(RunState::Paused);
                }
                info!("[daemon] Reset.");
                self.emit(DaemonEvent::Reset);
                Ok(())
            }
            ControlKind::LoadRom => match self.chip.load_rom(&message.payload) {
                Ok(len) => {
                    info!("[daemon] Loaded a program of {} bytes.", len);
                    self.emit(DaemonEvent::RomLoaded { len });
                    Ok(())
                }
                Err(error) => {
                    warn!("[daemon] {}", error);
                    self.emit(DaemonEvent::RomRejected(error));
                    Err(MessageError::Rom(error))
                }
            },
            ControlKind::SetRunning => match self.run_state {
                RunState::Halted(fault) => Err(MessageError::Halted(fault)),
                RunState::Paused | RunState::Running => {
                    self.set_run_state(RunState::Running);
                    Ok(())
                }
            },
            ControlKind::SetPaused => {
                if self.run_state == RunState::Running {
                    self.set_run_state(RunState::Paused);
                }
                Ok(())
            }
        };

        self.publish();
        message.complete(result);
    }

    fn set_run_state(&mut self, run_state: RunState) {
        if self.run_state == run_state {
            return;
        }
        if run_state == RunState::Running {
            let now = Instant::now();
            self.timers.restart(now);
            self.next_step = now;
        }
        info!("[daemon] {:?} -> {:?}", self.run_state, run_state);
        self.run_state = run_state;
        self.emit(DaemonEvent::RunStateChanged(run_state));
    }

    fn publish(&self) {
        let snapshot = Arc::new(self.chip.snapshot());
        let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
        published.run_state = self.run_state;
        published.clock_speed = self.clock_speed;
        published.snapshot = snapshot;
    }

    fn emit(&self, event: DaemonEvent) {
        if let Some(sink) = &self.event_sink {
            // A front end that went away does not stop execution.
            let _ = sink.send(event);
        }
    }
}
