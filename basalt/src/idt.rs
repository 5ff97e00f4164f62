//! Interrupt descriptor table and handler entries.
//!
//! Exceptions are fatal in this kernel: there is no user mode to recover
//! into, so each fault handler panics with the saved frame. External
//! interrupts are acknowledged at the PIC and forwarded through the
//! `do_handle_interrupt` seam that the kernel crate defines.

use lazy_static::lazy_static;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};

unsafe extern "Rust" {
    fn do_handle_interrupt(vector: usize);
}

macro_rules! irq_handler {
    ($name:ident, $vector:expr) => {
        extern "x86-interrupt" fn $name(_frame: InterruptStackFrame) {
            crate::dev::pic::eoi($vector);
            unsafe {
                do_handle_interrupt($vector as usize);
            }
        }
    };
}

irq_handler!(irq32, 32);
irq_handler!(irq33, 33);
irq_handler!(irq34, 34);
irq_handler!(irq35, 35);
irq_handler!(irq36, 36);
irq_handler!(irq37, 37);
irq_handler!(irq38, 38);
irq_handler!(irq39, 39);
irq_handler!(irq40, 40);
irq_handler!(irq41, 41);
irq_handler!(irq42, 42);
irq_handler!(irq43, 43);
irq_handler!(irq44, 44);
irq_handler!(irq45, 45);
irq_handler!(irq46, 46);
irq_handler!(irq47, 47);

extern "x86-interrupt" fn handle_divide_error(frame: InterruptStackFrame) {
    panic!("Divide Error!\n{:#?}", frame);
}

extern "x86-interrupt" fn handle_breakpoint(frame: InterruptStackFrame) {
    panic!("Breakpoint!\n{:#?}", frame);
}

extern "x86-interrupt" fn handle_invalid_opcode(frame: InterruptStackFrame) {
    panic!("Invalid Opcode!\n{:#?}", frame);
}

extern "x86-interrupt" fn handle_general_protection_fault(frame: InterruptStackFrame, ec: u64) {
    panic!("General Protection Fault! (error code {:#x})\n{:#?}", ec, frame);
}

extern "x86-interrupt" fn handle_double_fault(frame: InterruptStackFrame, _ec: u64) -> ! {
    panic!("Double Fault!\n{:#?}", frame);
}

extern "x86-interrupt" fn handle_page_fault(frame: InterruptStackFrame, ec: PageFaultErrorCode) {
    panic!(
        "Unexpected page fault at {:?}: {:?}\n{:#?}",
        x86_64::registers::control::Cr2::read(),
        ec,
        frame
    );
}

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();
        idt.divide_error.set_handler_fn(handle_divide_error);
        idt.breakpoint.set_handler_fn(handle_breakpoint);
        idt.invalid_opcode.set_handler_fn(handle_invalid_opcode);
        idt.general_protection_fault
            .set_handler_fn(handle_general_protection_fault);
        idt.double_fault.set_handler_fn(handle_double_fault);
        idt.page_fault.set_handler_fn(handle_page_fault);
        idt[32].set_handler_fn(irq32);
        idt[33].set_handler_fn(irq33);
        idt[34].set_handler_fn(irq34);
        idt[35].set_handler_fn(irq35);
        idt[36].set_handler_fn(irq36);
        idt[37].set_handler_fn(irq37);
        idt[38].set_handler_fn(irq38);
        idt[39].set_handler_fn(irq39);
        idt[40].set_handler_fn(irq40);
        idt[41].set_handler_fn(irq41);
        idt[42].set_handler_fn(irq42);
        idt[43].set_handler_fn(irq43);
        idt[44].set_handler_fn(irq44);
        idt[45].set_handler_fn(irq45);
        idt[46].set_handler_fn(irq46);
        idt[47].set_handler_fn(irq47);
        idt
    };
}

/// Loads the IDT and remaps the PIC. Interrupts stay disabled; the kernel
/// enables them once the thread system is up.
pub fn init() {
    IDT.load();
    crate::dev::pic::init();
}
