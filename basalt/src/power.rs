//! System power raw operation.

use x86_64::instructions::port::Port;

/// Powers the machine off.
///
/// Tries the emulator-specific exit ports first; if none of them work (real
/// hardware), falls back to halting forever.
///
/// This function should be run with interrupts disabled.
pub fn power_off() -> ! {
    x86_64::instructions::interrupts::disable();

    // QEMU / Bochs / VirtualBox power-off ports.
    let emulators: [(u16, u16); 4] = [(0xb004, 0x2000), (0x604, 0x2000), (0x3004, 0x3400), (0x600, 0x34)];
    for (port, value) in emulators {
        unsafe {
            Port::<u16>::new(port).write(value);
        }
    }

    halt_loop()
}

/// Halts the CPU forever.
pub fn halt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}
