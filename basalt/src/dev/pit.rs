//! 8254 programmable interval timer.

use x86_64::instructions::port::Port;

const CHANNEL0: u16 = 0x40;
const CONTROL: u16 = 0x43;

/// The 8254's input clock rate in Hz.
const PIT_HZ: u32 = 1193180;

/// Programs channel 0 to interrupt `freq` times per second on IRQ 0.
///
/// # Safety
/// Reprograms a global hardware timer; call once during boot, before
/// interrupts are enabled.
pub unsafe fn init(freq: u32) {
    // Input clock divided by the frequency, rounded to nearest.
    let count = ((PIT_HZ + freq / 2) / freq) as u16;

    let mut control = Port::<u8>::new(CONTROL);
    let mut channel0 = Port::<u8>::new(CHANNEL0);
    unsafe {
        // Control word: counter 0, LSB then MSB, mode 2 (rate generator).
        control.write(0x34);
        channel0.write((count & 0xff) as u8);
        channel0.write((count >> 8) as u8);
    }
}
