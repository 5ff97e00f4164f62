//! Kernel threads.
//!
//! A thread is an independent flow of control with its own stack. At any
//! instant exactly one thread is running; the rest are ready, blocked on a
//! synchronization primitive or a timer deadline, or dying and waiting to
//! be reaped. Scheduling is strict priority: whenever a readying or
//! priority-changing event occurs, the highest-priority ready thread gets
//! the CPU, and equal priorities round-robin in FIFO order.
//!
//! ## Thread recovery from `rsp`
//!
//! Every thread stack is a [`STACK_SIZE`]-aligned block whose lowest words
//! hold a pointer back to the owning [`Thread`] and a magic value. Masking
//! the stack pointer therefore finds the running thread in a few
//! instructions, and a corrupted magic exposes a stack overflow at the
//! moment it matters most. The boot stack is aligned the same way so the
//! initial thread can be adopted by [`init`] without a context switch.
//!
//! ## Effective vs. base priority
//!
//! `priority` is the value scheduling decisions use; it incorporates
//! donations from threads blocked on locks the thread holds (see
//! [`crate::sync::Lock`]). `base_priority` is what the thread's owner set
//! and is all that remains once every donation is withdrawn.

pub mod scheduler;

use crate::KernelError;
use crate::list::{Link, List};
use crate::sync::{Lock, Semaphore};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use basalt::interrupt::{InterruptGuard, InterruptState};
use core::arch::{asm, naked_asm};
use core::marker::PhantomPinned;
use core::mem::{offset_of, size_of};
use core::ptr::{null, null_mut};

pub use scheduler::TIME_SLICE;

/// Lowest possible priority.
pub const PRI_MIN: u32 = 0;
/// Priority assigned to threads that do not ask for one.
pub const PRI_DEFAULT: u32 = 31;
/// Highest possible priority.
pub const PRI_MAX: u32 = 63;

/// Size and alignment of each thread's stack.
pub const STACK_SIZE: usize = 0x8000;
/// Thread magic to detect stack overflow.
pub(crate) const THREAD_MAGIC: usize = 0x74a5_91fe_23b0_6a4d;

const _: () = assert!(STACK_SIZE == basalt::boot::BOOT_STACK_SIZE);

/// Selects the multilevel feedback queue scheduling policy.
///
/// The policy's arithmetic is not implemented; the kernel always schedules
/// by strict priority regardless of this flag.
pub static MLFQS: crate::sync::atomic::AtomicBool = crate::sync::atomic::AtomicBool::new(false);

/// The thread stack.
///
/// The back-pointer and magic sit at the lowest addresses; the usable
/// stack grows down from `_usable_marker` at the top.
#[repr(C, align(0x8000))]
pub(crate) struct ThreadStack {
    pub(crate) thread: *mut Thread,
    pub(crate) magic: usize,
    /// Padding to fill up to [`STACK_SIZE`].
    _pad: [u8; STACK_SIZE - size_of::<*mut Thread>() - size_of::<usize>()],
    /// Marker of the address of usable stack.
    _usable_marker: [u8; 0],
    _pin: PhantomPinned,
}

/// A possible state of a thread.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Status {
    /// Running right now.
    Running,
    /// On the ready queue, waiting for the CPU.
    Ready,
    /// Waiting on a semaphore, lock, condition variable or timer deadline.
    Blocked,
    /// Finished; storage is reclaimed at the next scheduling point.
    Dying,
}

/// A thread control block.
///
/// Threads are allocated once and never move; every queue references them
/// through the embedded link nodes, and other threads refer to them by raw
/// pointer. `ready_link` is shared by the ready queue, a semaphore's
/// waiters and the sleep list, which is sound because a thread can occupy
/// at most one of those at a time. `donation_link` is used exclusively for
/// membership in some other thread's `donors`.
#[repr(C)]
pub struct Thread {
    /// Saved stack pointer while the thread is switched out.
    ///
    /// Must stay the first field: the context switch addresses the record
    /// through `&mut thread.sp`.
    pub(crate) sp: usize,
    /// Thread id, unique per boot.
    pub tid: u64,
    /// Short human label.
    pub name: String,
    pub(crate) status: Status,
    /// Effective priority.
    pub(crate) priority: u32,
    /// Priority set by the thread's owner, ignoring donations.
    pub(crate) base_priority: u32,
    /// Threads donating priority to this one, highest first.
    pub(crate) donors: List,
    /// The lock this thread is blocked on, if any.
    pub(crate) waiting_lock: *const Lock,
    pub(crate) ready_link: Link,
    pub(crate) donation_link: Link,
    /// Tick at which to wake from [`crate::timer::sleep`]; meaningful only
    /// while on the sleep list.
    pub(crate) wakeup_tick: i64,
    stack: Box<ThreadStack>,
}

impl Thread {
    pub(crate) unsafe fn from_ready_link(link: *const Link) -> *mut Thread {
        unsafe { link.byte_sub(offset_of!(Thread, ready_link)) as *mut Thread }
    }

    pub(crate) unsafe fn from_donation_link(link: *const Link) -> *mut Thread {
        unsafe { link.byte_sub(offset_of!(Thread, donation_link)) as *mut Thread }
    }
}

/// Ready-queue and waiter comparator: higher effective priority first,
/// FIFO among equals.
pub(crate) fn ready_less(a: *const Link, b: *const Link) -> bool {
    unsafe { (*Thread::from_ready_link(a)).priority > (*Thread::from_ready_link(b)).priority }
}

/// Donor comparator: higher effective priority first.
pub(crate) fn donation_less(a: *const Link, b: *const Link) -> bool {
    unsafe { (*Thread::from_donation_link(a)).priority > (*Thread::from_donation_link(b)).priority }
}

fn running_stack() -> *mut ThreadStack {
    let sp: usize;
    unsafe {
        asm!("mov {}, rsp", out(reg) sp);
    }
    (sp & !(STACK_SIZE - 1)) as *mut ThreadStack
}

pub(crate) fn current_ptr() -> *mut Thread {
    let stack = running_stack();
    unsafe {
        assert_eq!(
            (*stack).magic,
            THREAD_MAGIC,
            "stack overflow detected; you might have allocated big local variables"
        );
        (*stack).thread
    }
}

/// Runs `f` with the current thread as an argument.
#[inline]
pub fn with_current<R>(f: impl FnOnce(&mut Thread) -> R) -> R {
    unsafe { f(&mut *current_ptr()) }
}

/// The current thread's id.
pub fn current_tid() -> u64 {
    with_current(|th| th.tid)
}

/// The current thread's name.
pub fn current_name() -> String {
    with_current(|th| th.name.clone())
}

// Statistics, updated from the timer interrupt.
static mut IDLE_TICKS: i64 = 0;
static mut KERNEL_TICKS: i64 = 0;
static mut USER_TICKS: i64 = 0;

/// Called by the timer interrupt handler on every tick.
pub(crate) fn tick() {
    unsafe {
        if current_ptr() == scheduler::idle_thread() {
            IDLE_TICKS += 1;
        } else {
            KERNEL_TICKS += 1;
        }

        scheduler::THREAD_TICKS += 1;
        if scheduler::THREAD_TICKS >= TIME_SLICE {
            crate::interrupt::yield_on_return();
        }
    }
}

/// Prints the per-bucket tick statistics.
pub fn print_stats() {
    unsafe {
        println!(
            "Thread: {} idle ticks, {} kernel ticks, {} user ticks",
            IDLE_TICKS, KERNEL_TICKS, USER_TICKS
        );
    }
}

fn allocate_tid() -> u64 {
    static TID_LOCK: Lock = Lock::new();
    static mut NEXT_TID: u64 = 1;

    TID_LOCK.acquire();
    let tid = unsafe {
        let tid = NEXT_TID;
        NEXT_TID += 1;
        tid
    };
    TID_LOCK.release();
    tid
}

/// Initializes the thread system by turning the currently-executing code
/// into the initial thread, named `"main"` and running at [`PRI_DEFAULT`].
///
/// This works only because boot switched onto a [`STACK_SIZE`]-aligned
/// stack. Must be called with interrupts disabled, before any other thread
/// operation.
pub fn init() {
    assert_eq!(InterruptState::current(), InterruptState::Off);

    unsafe {
        let stack = running_stack();
        (*stack).magic = THREAD_MAGIC;

        let th = Box::new(Thread {
            sp: 0,
            tid: 0,
            name: String::from("main"),
            status: Status::Running,
            priority: PRI_DEFAULT,
            base_priority: PRI_DEFAULT,
            donors: List::new(),
            waiting_lock: null(),
            ready_link: Link::new(),
            donation_link: Link::new(),
            wakeup_tick: 0,
            stack: Box::from_raw(stack),
        });
        let th = Box::into_raw(th);
        (*stack).thread = th;
        scheduler::set_initial(th);
        (*th).tid = allocate_tid();
    }
}

/// Starts preemptive scheduling: spawns the idle thread, enables
/// interrupts, and waits until the idle thread has finished initializing.
pub fn start() {
    let started = Arc::new(Semaphore::new(0));
    {
        let started = started.clone();
        ThreadBuilder::new("idle")
            .priority(PRI_MIN)
            .spawn(move || idle(started))
            .expect("failed to create the idle thread");
    }

    unsafe { InterruptState::enable() };
    assert_eq!(InterruptState::current(), InterruptState::On);

    started.down();
    assert!(!scheduler::idle_thread().is_null());
}

/// The idle thread. Runs when no other thread is ready.
///
/// After signalling [`start`] it blocks immediately and never reappears on
/// the ready queue; the scheduler returns it specially when the queue is
/// empty.
fn idle(started: Arc<Semaphore>) {
    scheduler::set_idle(current_ptr());
    started.up();

    loop {
        unsafe { InterruptState::disable() };
        block();
        basalt::interrupt::enable_and_halt();
    }
}

/// Puts the current thread to sleep until [`unblock`] wakes it.
///
/// Must be called with interrupts disabled. The caller is responsible for
/// first placing the thread on whatever wait queue it should be woken
/// from; usually one of the synchronization primitives is the better tool.
pub fn block() {
    assert!(!crate::interrupt::context());
    assert_eq!(InterruptState::current(), InterruptState::Off);
    scheduler::do_schedule(Status::Blocked);
}

/// Transitions a blocked thread to ready and inserts it into the ready
/// queue in priority order.
///
/// Does not preempt: the caller decides whether a preemption check should
/// follow, so that it can atomically update its own state first.
///
/// # Safety
/// `th` must point to a live thread that is blocked and not on any queue
/// reachable through `ready_link`.
pub unsafe fn unblock(th: *mut Thread) {
    let _guard = InterruptGuard::new();
    unsafe {
        assert_eq!((*th).status, Status::Blocked, "unblock of a thread that is not blocked");
        (*th).status = Status::Ready;
        scheduler::ready_insert(th);
    }
}

/// Yields the CPU. The current thread is re-inserted into the ready queue
/// and may be scheduled again immediately.
pub fn yield_now() {
    assert!(!crate::interrupt::context());

    let _guard = InterruptGuard::new();
    unsafe {
        let cur = current_ptr();
        if cur != scheduler::idle_thread() {
            scheduler::ready_insert(cur);
        }
        scheduler::do_schedule(Status::Ready);
    }
}

/// Deschedules the current thread and destroys it at the next scheduling
/// point. Never returns.
pub fn exit() -> ! {
    assert!(!crate::interrupt::context());

    unsafe { InterruptState::disable() };
    scheduler::do_schedule(Status::Dying);
    unreachable!("a dying thread was scheduled again");
}

/// Sets the current thread's base priority, recomputes its effective
/// priority, and yields if it no longer outranks the ready queue.
pub fn set_priority(priority: u32) {
    assert!(priority <= PRI_MAX, "priority {priority} out of range");

    {
        let _guard = InterruptGuard::new();
        unsafe {
            let cur = current_ptr();
            (*cur).base_priority = priority;
            recompute_priority(cur);
        }
    }
    preempt();
}

/// Returns the current thread's effective priority.
pub fn get_priority() -> u32 {
    let _guard = InterruptGuard::new();
    unsafe { (*current_ptr()).priority }
}

/// Recomputes `th`'s effective priority from its base priority and its
/// donors. Donor lists are not re-sorted when a parked donor's priority
/// changes, so this scans rather than trusting the front entry.
pub(crate) unsafe fn recompute_priority(th: *mut Thread) {
    unsafe {
        let mut priority = (*th).base_priority;
        for link in (*th).donors.iter() {
            let donor = Thread::from_donation_link(link.as_ptr());
            priority = priority.max((*donor).priority);
        }
        (*th).priority = priority;
    }
}

/// Yields if the front of the ready queue strictly outranks the current
/// thread. From interrupt context the yield is deferred to the handler's
/// return path.
pub fn preempt() {
    let _guard = InterruptGuard::new();
    unsafe {
        let outranked = match scheduler::ready_front() {
            Some(front) => (*front).priority > (*current_ptr()).priority,
            None => false,
        };
        if !outranked {
            return;
        }
        if crate::interrupt::context() {
            crate::interrupt::yield_on_return();
        } else {
            yield_now();
        }
    }
}

/// A struct to mimic the stack state the context switch restores.
#[repr(C)]
struct ContextSwitchFrame<F: FnOnce() + Send> {
    r15: usize,
    r14: usize,
    r13: usize,
    r12: usize,
    bx: usize,
    bp: usize,
    ret_addr: usize,
    thread_fn: *mut F,
    end_of_stack: usize,
}

/// The context-switch magic.
///
/// Saves the callee-saved registers on the outgoing stack, parks the stack
/// pointer in `*prev_sp`, and resumes the incoming thread from `next_sp`.
/// The caller-saved registers need no attention: to the outgoing thread
/// this is an ordinary function call.
#[unsafe(naked)]
pub(crate) unsafe extern "C" fn context_switch(_prev_sp: *mut usize, _next_sp: usize) {
    naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov rsp, rsi",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    )
}

/// A struct to build a new thread.
pub struct ThreadBuilder {
    name: String,
    priority: u32,
}

impl ThreadBuilder {
    /// Creates a new thread builder for a thread named `name`, at
    /// [`PRI_DEFAULT`] unless [`ThreadBuilder::priority`] overrides it.
    pub fn new<I>(name: I) -> Self
    where
        String: From<I>,
    {
        Self {
            name: String::from(name),
            priority: PRI_DEFAULT,
        }
    }

    /// Sets the new thread's priority.
    pub fn priority(mut self, priority: u32) -> Self {
        assert!(priority <= PRI_MAX, "priority {priority} out of range");
        self.priority = priority;
        self
    }

    /// Spawns the thread and returns its id.
    ///
    /// The new thread enters the ready queue immediately; if it outranks
    /// the caller it runs before `spawn` returns. Fails with
    /// [`KernelError::NoMemory`] when thread storage cannot be allocated.
    pub fn spawn<F: FnOnce() + Send + 'static>(self, thread_fn: F) -> Result<u64, KernelError> {
        let mut stack = unsafe {
            Box::<ThreadStack>::try_new_uninit()
                .map_err(|_| KernelError::NoMemory)?
                .assume_init()
        };
        stack.magic = THREAD_MAGIC;
        stack.thread = null_mut();

        let th = Box::try_new(Thread {
            sp: 0,
            tid: 0,
            name: self.name,
            status: Status::Blocked,
            priority: self.priority,
            base_priority: self.priority,
            donors: List::new(),
            waiting_lock: null(),
            ready_link: Link::new(),
            donation_link: Link::new(),
            wakeup_tick: 0,
            stack,
        })
        .map_err(|_| KernelError::NoMemory)?;

        let th = Box::into_raw(into_thread(th, thread_fn));
        unsafe {
            (*th).tid = allocate_tid();
            let tid = (*th).tid;
            unblock(th);
            preempt();
            Ok(tid)
        }
    }
}

fn into_thread<F: FnOnce() + Send + 'static>(mut th: Box<Thread>, thread_fn: F) -> Box<Thread> {
    /// The very beginning of the thread.
    #[unsafe(naked)]
    unsafe extern "C" fn start<F: FnOnce() + Send>() -> ! {
        naked_asm!(
            "pop rdi",
            "sti",
            "jmp {}",
            sym thread_start::<F>
        )
    }

    extern "C" fn thread_start<F: FnOnce() + Send>(thread_fn: *mut F) {
        let thread_fn = unsafe { Box::from_raw(thread_fn) };
        thread_fn();
        exit();
    }

    let stack = th.stack.as_mut();
    let frame = unsafe {
        ((&mut stack._usable_marker as *mut _ as usize - size_of::<ContextSwitchFrame<F>>())
            as *mut ContextSwitchFrame<F>)
            .as_mut()
            .unwrap()
    };
    *frame = ContextSwitchFrame {
        r15: 0,
        r14: 0,
        r13: 0,
        r12: 0,
        bx: 0,
        bp: 0,
        ret_addr: start::<F> as usize,
        thread_fn: Box::into_raw(Box::new(thread_fn)),
        end_of_stack: 0,
    };
    th.sp = frame as *mut _ as usize;
    th.stack.thread = th.as_mut() as *mut _;
    th
}
