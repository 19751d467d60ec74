//! An implementation of a CHIP-8 interpreter that runs as a background execution
//! daemon. The instruction set follows the description
//! [here](https://en.wikipedia.org/wiki/CHIP-8#Opcode_table).
//!
//! The daemon owns the machine state on a dedicated thread and is driven by control
//! messages (reset, ROM loading, run/pause, key input). Front ends never touch the
//! machine directly; they read immutable snapshots that the daemon publishes after
//! every tick. A cursive based text user interface lives in `src/bin`.
pub mod chip;
