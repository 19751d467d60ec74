use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};

use crate::chip::daemon::{
    ControlMessage, Controller, Daemon, DaemonConfig, DaemonError, DaemonEvent, MessageError,
    RunState,
};
use crate::chip::{Chip, Execution, Fault, KeyError, LoadRomError};

const TIMEOUT: Duration = Duration::from_secs(5);

/// A chip that counts what the daemon does with it.
struct FakeChip {
    steps: u32,
    ticks: u32,
    resets: u32,
    rom: Vec<u8>,
    keys: Vec<u8>,
    execution: Execution,
    /// The step that blocks waiting for a key.
    await_at: Option<u32>,
    /// The step that fails.
    fault_at: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
struct FakeSnapshot {
    steps: u32,
    ticks: u32,
    resets: u32,
    rom: Vec<u8>,
    keys: Vec<u8>,
    execution: Execution,
}

impl FakeChip {
    fn new() -> Self {
        FakeChip {
            steps: 0,
            ticks: 0,
            resets: 0,
            rom: Vec::new(),
            keys: Vec::new(),
            execution: Execution::Ready,
            await_at: None,
            fault_at: None,
        }
    }
}

impl Chip for FakeChip {
    type KeyAddress = u8;

    type Snapshot = FakeSnapshot;

    fn reset(&mut self) {
        self.resets += 1;
        self.steps = 0;
        self.rom.clear();
        self.keys.clear();
        self.execution = Execution::Ready;
        self.fault_at = None;
    }

    fn load_rom(&mut self, rom: &[u8]) -> Result<usize, LoadRomError> {
        if rom.len() > 4 {
            return Err(LoadRomError::TooLarge { len: rom.len() });
        }
        self.rom = rom.to_vec();
        Ok(rom.len())
    }

    fn step(&mut self) -> Result<Execution, Fault> {
        if self.fault_at == Some(self.steps) {
            return Err(Fault::UnknownOpcode {
                address: self.program_counter(),
                instruction: 0xFFFF,
            });
        }
        self.steps += 1;
        if self.await_at == Some(self.steps) {
            self.execution = Execution::AwaitingKey { register: 0 };
        }
        Ok(self.execution)
    }

    fn execution(&self) -> Execution {
        self.execution
    }

    fn decrement_timers(&mut self, ticks: u32) {
        self.ticks += ticks;
    }

    fn key_address(key: u8) -> Result<u8, KeyError> {
        if key > 0xF {
            return Err(KeyError::InvalidKey(key));
        }
        Ok(key)
    }

    fn set_key_down(&mut self, key: u8) {
        self.keys.push(key);
        self.execution = Execution::Ready;
    }

    fn set_key_up(&mut self, key: u8) {
        self.keys.retain(|down| *down != key);
    }

    fn disassemble(&self, _address: u16) -> Option<String> {
        Some("NOP".to_string())
    }

    fn instruction_at(&self, _address: u16) -> Option<u16> {
        Some(0)
    }

    fn program_counter(&self) -> u16 {
        0x200 + 2 * self.steps as u16
    }

    fn snapshot(&self) -> FakeSnapshot {
        FakeSnapshot {
            steps: self.steps,
            ticks: self.ticks,
            resets: self.resets,
            rom: self.rom.clone(),
            keys: self.keys.clone(),
            execution: self.execution,
        }
    }
}

fn spawn_fake(chip: FakeChip, clock_speed: u32) -> (Daemon<FakeChip>, Receiver<DaemonEvent>) {
    let (sink, events) = unbounded();
    let daemon = Daemon::spawn(
        chip,
        DaemonConfig {
            clock_speed,
            trace_instructions: true,
            event_sink: Some(sink),
        },
    )
    .unwrap();
    (daemon, events)
}

fn spawn_chip8(clock_speed: u32) -> (Daemon, Receiver<DaemonEvent>) {
    let (sink, events) = unbounded();
    let daemon = Daemon::new(DaemonConfig {
        clock_speed,
        trace_instructions: true,
        event_sink: Some(sink),
    })
    .unwrap();
    (daemon, events)
}

/// Sends `message` and waits until its success callback ran.
fn send_and_wait<C: Chip>(controller: &Controller<C>, message: ControlMessage) {
    let (done, finished) = unbounded();
    controller
        .send(message.on_success(move || done.send(()).unwrap()))
        .unwrap();
    finished.recv_timeout(TIMEOUT).unwrap();
}

/// Waits until every message sent before was processed.
fn barrier<C: Chip>(controller: &Controller<C>) {
    send_and_wait(controller, ControlMessage::set_paused());
}

/// Skips events until one matches `predicate`.
fn wait_for_event<F>(events: &Receiver<DaemonEvent>, predicate: F) -> DaemonEvent
where
    F: Fn(&DaemonEvent) -> bool,
{
    let deadline = Instant::now() + TIMEOUT;
    loop {
        let event = events.recv_deadline(deadline).unwrap();
        if predicate(&event) {
            return event;
        }
    }
}

fn executed_at(address: u16) -> impl Fn(&DaemonEvent) -> bool {
    move |event| matches!(event, DaemonEvent::Executed { address: a, .. } if *a == address)
}

#[test]
fn test_starts_paused() {
    let (daemon, _events) = spawn_fake(FakeChip::new(), 1000);
    assert_eq!(daemon.run_state(), RunState::Paused);
    assert_eq!(daemon.clock_speed(), 1000);
    assert_eq!(daemon.snapshot().steps, 0);
    daemon.shutdown().unwrap();
}

#[test]
fn test_callbacks_fire_on_execution_thread() {
    let (daemon, _events) = spawn_fake(FakeChip::new(), 1000);
    let (sender, names) = unbounded();
    daemon
        .send(ControlMessage::reset().on_success(move || {
            sender
                .send(std::thread::current().name().map(str::to_string))
                .unwrap();
        }))
        .unwrap();

    assert_eq!(
        names.recv_timeout(TIMEOUT).unwrap(),
        Some("chip8-daemon".to_string())
    );
    assert_eq!(daemon.snapshot().resets, 1);
}

#[test]
fn test_rejected_rom_calls_error_callback() {
    let (daemon, events) = spawn_fake(FakeChip::new(), 1000);
    send_and_wait(&daemon, ControlMessage::load_rom(vec![1, 2]));

    let (sender, errors) = unbounded();
    let (success, successes) = unbounded();
    daemon
        .send(
            ControlMessage::load_rom(vec![0; 5])
                .on_success(move || success.send(()).unwrap())
                .on_error(move |error| sender.send(error).unwrap()),
        )
        .unwrap();

    assert_eq!(
        errors.recv_timeout(TIMEOUT).unwrap(),
        MessageError::Rom(LoadRomError::TooLarge { len: 5 })
    );
    assert!(successes.try_recv().is_err());
    assert_eq!(daemon.snapshot().rom, vec![1, 2]);
    wait_for_event(&events, |event| {
        *event == DaemonEvent::RomRejected(LoadRomError::TooLarge { len: 5 })
    });
}

#[test]
fn test_chip8_rejects_rom_of_program_area_size() {
    let (daemon, _events) = spawn_chip8(500);
    let (sender, errors) = unbounded();
    daemon
        .send(
            ControlMessage::load_rom(vec![0xAA; 0xE00])
                .on_error(move |error| sender.send(error).unwrap()),
        )
        .unwrap();

    assert_eq!(
        errors.recv_timeout(TIMEOUT).unwrap(),
        MessageError::Rom(LoadRomError::TooLarge { len: 0xE00 })
    );
    let snapshot = daemon.snapshot();
    assert!(snapshot.memory()[80..].iter().all(|byte| *byte == 0));
}

#[test]
fn test_messages_are_processed_in_order() {
    let (daemon, events) = spawn_fake(FakeChip::new(), 1000);
    daemon.reset().unwrap();
    daemon.load_rom(vec![7]).unwrap();
    daemon.set_clock_speed(250).unwrap();
    barrier(&daemon);

    let received: Vec<DaemonEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            DaemonEvent::Reset,
            DaemonEvent::RomLoaded { len: 1 },
            DaemonEvent::ClockSpeedChanged(250),
        ]
    );
    assert_eq!(daemon.clock_speed(), 250);
}

#[test]
fn test_run_and_pause() {
    let (daemon, events) = spawn_fake(FakeChip::new(), 1000);
    daemon.set_running().unwrap();
    wait_for_event(&events, |event| {
        *event == DaemonEvent::RunStateChanged(RunState::Running)
    });
    wait_for_event(&events, executed_at(0x204));

    barrier(&daemon);
    assert_eq!(daemon.run_state(), RunState::Paused);
    let steps = daemon.snapshot().steps;
    assert!(steps >= 3);

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(daemon.snapshot().steps, steps);
}

#[test]
fn test_clock_speed_is_at_least_one() {
    let (daemon, events) = spawn_fake(FakeChip::new(), 0);
    assert_eq!(daemon.clock_speed(), 1);

    daemon.set_clock_speed(0).unwrap();
    barrier(&daemon);
    assert_eq!(daemon.clock_speed(), 1);
    assert!(events
        .try_iter()
        .any(|event| event == DaemonEvent::ClockSpeedChanged(1)));
}

#[test]
fn test_timers_count_while_running() {
    let (daemon, _events) = spawn_fake(FakeChip::new(), 100);
    daemon.set_running().unwrap();

    let deadline = Instant::now() + TIMEOUT;
    while daemon.snapshot().ticks < 3 {
        assert!(Instant::now() < deadline, "timers did not count");
        std::thread::sleep(Duration::from_millis(5));
    }

    barrier(&daemon);
    let ticks = daemon.snapshot().ticks;
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(daemon.snapshot().ticks, ticks);
}

#[test]
fn test_fault_halts_until_reset() {
    let mut chip = FakeChip::new();
    chip.fault_at = Some(2);
    let (daemon, events) = spawn_fake(chip, 1000);
    daemon.set_running().unwrap();

    let fault = Fault::UnknownOpcode {
        address: 0x204,
        instruction: 0xFFFF,
    };
    assert_eq!(
        wait_for_event(&events, |event| matches!(event, DaemonEvent::Halted(_))),
        DaemonEvent::Halted(fault)
    );
    assert_eq!(daemon.run_state(), RunState::Halted(fault));
    assert_eq!(daemon.snapshot().steps, 2);

    let (sender, errors) = unbounded();
    daemon
        .send(ControlMessage::set_running().on_error(move |error| sender.send(error).unwrap()))
        .unwrap();
    assert_eq!(
        errors.recv_timeout(TIMEOUT).unwrap(),
        MessageError::Halted(fault)
    );

    send_and_wait(&daemon, ControlMessage::reset());
    assert_eq!(daemon.run_state(), RunState::Paused);

    send_and_wait(&daemon, ControlMessage::set_running());
    assert_eq!(daemon.run_state(), RunState::Running);
}

#[test]
fn test_awaiting_key_stops_stepping() {
    let mut chip = FakeChip::new();
    chip.await_at = Some(1);
    let (daemon, events) = spawn_fake(chip, 1000);
    daemon.set_running().unwrap();
    wait_for_event(&events, executed_at(0x200));

    std::thread::sleep(Duration::from_millis(50));
    let snapshot = daemon.snapshot();
    assert_eq!(snapshot.steps, 1);
    assert_eq!(snapshot.execution, Execution::AwaitingKey { register: 0 });
    assert_eq!(daemon.run_state(), RunState::Running);

    daemon.set_key_down(0xA).unwrap();
    wait_for_event(&events, executed_at(0x202));
    assert_eq!(daemon.snapshot().keys, vec![0xA]);
}

#[test]
fn test_pause_while_awaiting_key() {
    let mut chip = FakeChip::new();
    chip.await_at = Some(1);
    let (daemon, events) = spawn_fake(chip, 1000);
    daemon.set_running().unwrap();
    wait_for_event(&events, executed_at(0x200));

    barrier(&daemon);
    assert_eq!(daemon.run_state(), RunState::Paused);
}

#[test]
fn test_reset_while_awaiting_key() {
    let (daemon, events) = spawn_chip8(1000);
    // LD V3, K
    daemon.load_rom(vec![0xF3, 0x0A]).unwrap();
    daemon.set_running().unwrap();
    wait_for_event(&events, executed_at(0x200));
    assert_eq!(
        daemon.snapshot().execution(),
        Execution::AwaitingKey { register: 3 }
    );

    let (sender, snapshots) = unbounded();
    let controller = daemon.controller();
    daemon
        .send(ControlMessage::reset().on_success(move || {
            sender.send(controller.snapshot()).unwrap();
        }))
        .unwrap();

    let snapshot = snapshots.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(snapshot.execution(), Execution::Ready);
    assert_eq!(snapshot.program_counter(), 0x200);
    assert_eq!(snapshot.register(3), 0);
}

#[test]
fn test_faster_clock_speed_applies_to_next_step() {
    let (daemon, events) = spawn_fake(FakeChip::new(), 1);
    daemon.set_running().unwrap();
    wait_for_event(&events, executed_at(0x200));

    let changed = Instant::now();
    daemon.set_clock_speed(1000).unwrap();
    wait_for_event(&events, executed_at(0x202));
    assert!(changed.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_chip8_wait_for_key() {
    let (daemon, events) = spawn_chip8(1000);
    // LD V3, K; JP 0x202
    daemon.load_rom(vec![0xF3, 0x0A, 0x12, 0x02]).unwrap();
    daemon.set_running().unwrap();
    wait_for_event(&events, executed_at(0x200));
    assert_eq!(
        daemon.snapshot().execution(),
        Execution::AwaitingKey { register: 3 }
    );

    daemon.set_key_down(0x7).unwrap();
    wait_for_event(&events, executed_at(0x202));
    barrier(&daemon);

    let snapshot = daemon.snapshot();
    assert_eq!(snapshot.register(3), 0x7);
    assert_eq!(snapshot.program_counter(), 0x202);
    assert!(snapshot.key_down(0x7));

    daemon.set_key_up(0x7).unwrap();
    barrier(&daemon);
    assert!(!daemon.snapshot().key_down(0x7));
}

#[test]
fn test_chip8_delay_timer_counts_down() {
    let (daemon, _events) = spawn_chip8(1000);
    // LD V0, 60; LD DT, V0; JP 0x204
    daemon
        .load_rom(vec![0x60, 0x3C, 0xF0, 0x15, 0x12, 0x04])
        .unwrap();
    daemon.set_running().unwrap();

    let deadline = Instant::now() + TIMEOUT;
    loop {
        let delay_timer = daemon.snapshot().delay_timer();
        if delay_timer > 0 && delay_timer < 58 {
            break;
        }
        assert!(Instant::now() < deadline, "delay timer did not count down");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_chip8_unknown_opcode_halts() {
    let (daemon, events) = spawn_chip8(1000);
    daemon.load_rom(vec![0x60, 0x05, 0xFF, 0xFF]).unwrap();
    daemon.set_running().unwrap();

    let fault = Fault::UnknownOpcode {
        address: 0x202,
        instruction: 0xFFFF,
    };
    wait_for_event(&events, |event| *event == DaemonEvent::Halted(fault));
    assert_eq!(daemon.run_state(), RunState::Halted(fault));
    assert_eq!(daemon.snapshot().register(0), 5);
    assert_eq!(daemon.snapshot().program_counter(), 0x202);
}

#[test]
fn test_executed_event_carries_instruction() {
    let (daemon, events) = spawn_chip8(1000);
    daemon.load_rom(vec![0x60, 0x05, 0x12, 0x02]).unwrap();
    daemon.set_running().unwrap();

    match wait_for_event(&events, executed_at(0x200)) {
        DaemonEvent::Executed {
            instruction,
            mnemonic,
            ..
        } => {
            assert_eq!(instruction, Some(0x6005));
            assert!(mnemonic.is_some());
        }
        event => panic!("unexpected event {:?}", event),
    }
}

#[test]
fn test_invalid_key_is_rejected() {
    let (daemon, _events) = spawn_fake(FakeChip::new(), 1000);
    assert!(matches!(
        daemon.set_key_down(0x10),
        Err(DaemonError::Key(KeyError::InvalidKey(0x10)))
    ));
    assert!(matches!(
        daemon.set_key_up(0xFF),
        Err(DaemonError::Key(KeyError::InvalidKey(0xFF)))
    ));
}

#[test]
fn test_controller_outlives_daemon() {
    let (daemon, events) = spawn_fake(FakeChip::new(), 1000);
    let controller = daemon.controller();
    send_and_wait(&controller, ControlMessage::load_rom(vec![3]));
    drop(daemon);

    assert!(matches!(controller.reset(), Err(DaemonError::Disconnected)));
    assert_eq!(controller.snapshot().rom, vec![3]);
    assert!(events.try_iter().any(|event| event == DaemonEvent::RomLoaded { len: 1 }));
}

#[test]
fn test_shutdown_leaves_running() {
    let (daemon, events) = spawn_fake(FakeChip::new(), 1000);
    let controller = daemon.controller();
    send_and_wait(&daemon, ControlMessage::set_running());
    daemon.shutdown().unwrap();

    assert_eq!(controller.run_state(), RunState::Paused);
    assert!(events
        .try_iter()
        .any(|event| event == DaemonEvent::RunStateChanged(RunState::Paused)));
}

#[test]
fn test_panicking_callback_is_reported() {
    let (daemon, _events) = spawn_fake(FakeChip::new(), 1000);
    daemon
        .send(ControlMessage::reset().on_success(|| panic!("callback failed")))
        .unwrap();

    assert!(matches!(
        daemon.shutdown(),
        Err(DaemonError::ExecutionThreadPanicked)
    ));
}
