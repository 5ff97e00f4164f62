//! Serial device driver.
//!
//! The COM1 port is the kernel's console; QEMU mirrors it to stdio.

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

const COM1: u16 = 0x3f8;

lazy_static! {
    pub(crate) static ref SERIAL1: Mutex<SerialPort> = {
        let mut port = unsafe { SerialPort::new(COM1) };
        port.init();
        Mutex::new(port)
    };
}
