//! Language items.

use core::panic::PanicInfo;

/// A panic is a broken kernel invariant; executing further would corrupt
/// unrelated threads. Print what we know and stop the machine.
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    unsafe {
        basalt::interrupt::InterruptState::disable();
        // The panicking context may itself hold the console.
        basalt::kprint::force_unlock();
    }
    println!("Kernel PANIC: {info}");
    basalt::power::power_off()
}
