use std::sync::Arc;

use cursive::{
    theme::{BaseColor, Color, ColorStyle},
    view::View,
    Printer, Vec2,
};

use crate::chip::chip8::{Chip8, Snapshot};

/// Represents the screen of the CHIP-8 as of some snapshot.
pub struct Display {
    snapshot: Arc<Snapshot>,
}

impl Display {
    /// Creates a new display showing `snapshot`.
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        Display { snapshot }
    }

    pub fn set_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        self.snapshot = snapshot;
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new(Arc::new(Snapshot::new(&Chip8::new())))
    }
}

/// Implements cursive::view::View for Display to enable drawing it
/// as a View out of the box. Every pixel takes one cell.
impl View for Display {
    fn draw(&self, printer: &Printer) {
        let mode = self.snapshot.screen_mode();
        printer.with_color(
            ColorStyle::new(Color::Dark(BaseColor::Black), Color::RgbLowRes(0, 0, 0)),
            |printer| {
                for y in 0..mode.height() {
                    for x in 0..mode.width() {
                        if self.snapshot.pixel(x, y) {
                            printer.print((x, y), " ");
                        }
                    }
                }
            },
        );
    }

    fn required_size(&mut self, _: Vec2) -> Vec2 {
        let mode = self.snapshot.screen_mode();
        Vec2::new(mode.width(), mode.height())
    }
}

/// Formats registers, timers and the stack of `snapshot` for a side panel.
pub fn describe_registers(snapshot: &Snapshot) -> String {
    let mut lines = Vec::with_capacity(28);
    lines.push(format!(
        "PC {:04X}  {}",
        snapshot.program_counter(),
        snapshot
            .disassemble(snapshot.program_counter())
            .unwrap_or_else(|| "???".to_string())
    ));
    lines.push(format!("I  {:04X}", snapshot.index()));
    lines.push(format!(
        "DT {:02X}  ST {:02X}",
        snapshot.delay_timer(),
        snapshot.sound_timer()
    ));
    lines.push(String::new());

    for (register, value) in snapshot.registers().iter().enumerate() {
        lines.push(format!("V{:X} {:02X}", register, value));
    }
    lines.push(String::new());

    lines.push(format!("SP {:X}", snapshot.stack_pointer()));
    let depth = snapshot.stack_pointer() as usize;
    for (slot, address) in snapshot.stack().iter().enumerate().skip(1).take(depth) {
        lines.push(format!("{:X}: {:04X}", slot, address));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::Chip;

    #[test]
    fn test_describe_registers() {
        let mut chip = Chip8::new();
        chip.load_rom(&[0x6A, 0x42, 0x22, 0x08]).unwrap();
        chip.step().unwrap();
        chip.step().unwrap();

        let description = describe_registers(&chip.snapshot());
        assert!(description.starts_with("PC 0208"));
        assert!(description.contains("VA 42"));
        assert!(description.contains("SP 1"));
        assert!(description.contains("1: 0204"));
    }

    #[test]
    fn test_required_size_follows_screen_mode() {
        let mut display = Display::default();
        assert_eq!(display.required_size(Vec2::new(0, 0)), Vec2::new(64, 32));
    }
}
