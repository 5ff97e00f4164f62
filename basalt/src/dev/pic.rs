//! Legacy 8259 programmable interrupt controller.

use pic8259::ChainedPics;
use spin::Mutex;

/// Vector that IRQ 0 is remapped to; IRQs occupy vectors 32..48.
pub const PIC_1_OFFSET: u8 = 32;
/// Vector that IRQ 8 is remapped to.
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Remaps the PICs above the exception vectors and masks every line except
/// IRQ 0, the timer.
pub fn init() {
    unsafe {
        let mut pics = PICS.lock();
        pics.initialize();
        pics.write_masks(0xfe, 0xff);
    }
}

/// Acknowledges the in-service interrupt on `vector`.
pub fn eoi(vector: u8) {
    unsafe {
        PICS.lock().notify_end_of_interrupt(vector);
    }
}
