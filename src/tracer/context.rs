use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::registers::Registers;

/// Where the tracee currently sits in the ptrace state machine.
///
/// Only `SignalStopped` may be resumed by `SIGCONT`; only `PtraceStopped` may
/// be resumed by `PTRACE_CONT`. Confusing the two is a kernel-level bug, not
/// a recoverable error, which is why [`crate::tracer::Tracer::cont`] refuses
/// to issue `PTRACE_CONT` against a `SignalStopped` tracee.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ProcessState {
    Dead,
    Detached,
    Running,
    SignalStopped,
    PtraceStopped,
}

impl ProcessState {
    pub fn is_dead(self) -> bool {
        self == ProcessState::Dead
    }
}

/// One software breakpoint: the address it traps at, the byte it displaced
/// (filled in when armed), and the callback fired on a hit.
pub struct Breakpoint {
    pub addr: u64,
    pub orig_byte: Option<u8>,
    pub callback: Option<Box<dyn FnMut()>>,
}

impl Breakpoint {
    pub fn new(addr: u64, callback: Option<Box<dyn FnMut()>>) -> Breakpoint {
        Breakpoint {
            addr,
            orig_byte: None,
            callback,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.orig_byte.is_some()
    }
}

/// Owns everything the tracer needs to know about one traced peer: its pid,
/// state-machine position, breakpoint set, and cached register snapshots.
pub struct TraceeContext {
    pub pid: Pid,
    pub started: bool,
    pub last_wait_status: Option<WaitStatus>,
    pub current_state: ProcessState,
    pub expected_next_state: ProcessState,
    pub breakpoints: Vec<Breakpoint>,
    pub last_breakpoint_hit: Option<usize>,
    pub run_callback: Option<Box<dyn FnMut()>>,
    pub cached_regs: Option<Registers>,
}

impl TraceeContext {
    pub fn new(pid: Pid) -> TraceeContext {
        TraceeContext {
            pid,
            started: false,
            last_wait_status: None,
            current_state: ProcessState::PtraceStopped,
            expected_next_state: ProcessState::PtraceStopped,
            breakpoints: Vec::new(),
            last_breakpoint_hit: None,
            run_callback: None,
            cached_regs: None,
        }
    }

    pub fn find_breakpoint(&self, addr: u64) -> Option<usize> {
        self.breakpoints.iter().position(|bp| bp.addr == addr)
    }
}
