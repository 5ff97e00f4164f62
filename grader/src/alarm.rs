//! Timer sleep tests.

use crate::journal::Journal;
use alloc::format;
use alloc::sync::Arc;
use seos::thread::ThreadBuilder;
use seos::timer;

pub fn alarm_single() {
    let start = timer::ticks();
    timer::sleep(5);
    assert!(timer::elapsed(start) >= 5, "sleep returned early");
}

pub fn subtick_delay() {
    let start = timer::ticks();
    timer::usleep(500);
    assert!(timer::elapsed(start) <= 2, "a sub-tick delay must busy-wait");
}

pub fn alarm_ordering() {
    let journal = Arc::new(Journal::new());

    // Priorities are deliberately inverse to the deadlines: wake order
    // must follow the deadlines anyway.
    for (pri, t) in [(40u32, 30i64), (20, 10), (30, 20)] {
        let journal = journal.clone();
        ThreadBuilder::new(format!("sleep{t}"))
            .priority(pri)
            .spawn(move || {
                let begin = timer::ticks();
                timer::sleep(t);
                assert!(timer::elapsed(begin) >= t, "sleep returned early");
                journal.push(t);
            })
            .unwrap();
    }

    timer::sleep(60);
    assert_eq!(journal.snapshot(), [10, 20, 30]);
}
