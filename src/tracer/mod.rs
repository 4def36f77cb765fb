mod breakpoint;
mod clobber;
mod run;

pub mod context;

use nix::libc::{c_void, user_fpregs_struct, PTRACE_GETFPREGS, PTRACE_SETFPREGS};
use nix::sys::ptrace;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::mem::MaybeUninit;
use std::ptr;

use crate::error::{EngineError, EngineResult};
use crate::log;
use crate::logging::LogLevel::*;
use crate::registers::{Registers, SupportedArch};

pub use context::{Breakpoint, ProcessState, TraceeContext};

/// Owns the ptrace state machine for one traced peer process.
///
/// Thin wrappers around `nix::sys::ptrace`/`nix::sys::wait` primitives live
/// here; the trickier composite operations (breakpoint arm/disarm/resume,
/// the run loop, `clobber_address`) live in sibling modules that extend this
/// same type.
pub struct Tracer {
    pub ctx: TraceeContext,
}

impl Tracer {
    pub fn new(pid: Pid) -> Tracer {
        Tracer {
            ctx: TraceeContext::new(pid),
        }
    }

    fn require_attached(&self) -> EngineResult<()> {
        if self.ctx.current_state == ProcessState::Detached {
            return Err(EngineError::NotAttached);
        }
        if self.ctx.current_state == ProcessState::Dead {
            return Err(EngineError::TraceeGone);
        }
        Ok(())
    }

    /// `PTRACE_ATTACH`.
    pub fn attach(&mut self) -> EngineResult<()> {
        ptrace::attach(self.ctx.pid).map_err(EngineError::from_ptrace)?;
        self.ctx.expected_next_state = ProcessState::SignalStopped;
        Ok(())
    }

    pub fn attach_wait(&mut self) -> EngineResult<WaitStatus> {
        self.attach()?;
        self.waitpid(None)?.ok_or(EngineError::InvalidState(
            "attach_wait expected a blocking wait to observe a state change",
        ))
    }

    /// `PTRACE_DETACH`. Transitions to `Detached` unconditionally first: once
    /// detach has been requested there is no going back, regardless of
    /// whether the kernel call itself succeeds.
    pub fn detach(&mut self) -> EngineResult<()> {
        self.ctx.current_state = ProcessState::Detached;
        ptrace::detach(self.ctx.pid, None).map_err(EngineError::from_ptrace)
    }

    /// Ptrace exposes no tracer-initiated stop; deliver `SIGSTOP` instead.
    pub fn stop(&mut self) -> EngineResult<()> {
        self.require_attached()?;
        kill(self.ctx.pid, Signal::SIGSTOP).map_err(EngineError::from_ptrace)?;
        self.ctx.expected_next_state = ProcessState::SignalStopped;
        Ok(())
    }

    pub fn stop_wait(&mut self) -> EngineResult<WaitStatus> {
        self.stop()?;
        self.waitpid(None)?.ok_or(EngineError::InvalidState(
            "stop_wait expected a blocking wait to observe a state change",
        ))
    }

    /// Polymorphic on `current_state`: a `SignalStopped` tracee is resumed
    /// with `SIGCONT`; anything else is resumed with `PTRACE_CONT`. Issuing
    /// `PTRACE_CONT` against a signal-stopped tracee is undefined in the
    /// kernel, so that combination is rejected outright.
    pub fn cont(&mut self) -> EngineResult<()> {
        self.require_attached()?;
        match self.ctx.current_state {
            ProcessState::SignalStopped => {
                kill(self.ctx.pid, Signal::SIGCONT).map_err(EngineError::from_ptrace)?;
            }
            ProcessState::Dead => return Err(EngineError::TraceeGone),
            _ => {
                ptrace::cont(self.ctx.pid, None).map_err(EngineError::from_ptrace)?;
            }
        }
        self.ctx.expected_next_state = ProcessState::PtraceStopped;
        Ok(())
    }

    pub fn cont_wait(&mut self) -> EngineResult<WaitStatus> {
        self.cont()?;
        self.waitpid(None)?.ok_or(EngineError::InvalidState(
            "cont_wait expected a blocking wait to observe a state change",
        ))
    }

    pub fn singlestep(&mut self) -> EngineResult<()> {
        self.require_attached()?;
        ptrace::step(self.ctx.pid, None).map_err(EngineError::from_ptrace)?;
        self.ctx.expected_next_state = ProcessState::PtraceStopped;
        Ok(())
    }

    pub fn singlestep_wait(&mut self) -> EngineResult<WaitStatus> {
        self.singlestep()?;
        self.waitpid(None)?.ok_or(EngineError::InvalidState(
            "singlestep_wait expected a blocking wait to observe a state change",
        ))
    }

    pub fn syscall(&mut self) -> EngineResult<()> {
        self.require_attached()?;
        ptrace::syscall(self.ctx.pid, None).map_err(EngineError::from_ptrace)?;
        self.ctx.expected_next_state = ProcessState::PtraceStopped;
        Ok(())
    }

    pub fn syscall_wait(&mut self) -> EngineResult<WaitStatus> {
        self.syscall()?;
        self.waitpid(None)?.ok_or(EngineError::InvalidState(
            "syscall_wait expected a blocking wait to observe a state change",
        ))
    }

    /// `waitpid`, classifying the resulting status into `current_state`.
    /// `opts = None` blocks; `Some(WaitPidFlag::WNOHANG)` polls.
    ///
    /// Returns `Ok(None)` when `WNOHANG` observed no state change, and
    /// `Ok(Some(status))` otherwise.
    pub fn waitpid(&mut self, opts: Option<WaitPidFlag>) -> EngineResult<Option<WaitStatus>> {
        let status = match waitpid(self.ctx.pid, opts) {
            Ok(s) => s,
            Err(e) => return Err(EngineError::from_wait(e)),
        };

        if let WaitStatus::StillAlive = status {
            return Ok(None);
        }

        self.ctx.current_state = classify_wait_status(&status);
        self.ctx.last_wait_status = Some(status);

        if self.ctx.current_state == ProcessState::Dead {
            log!(LogDebug, "tracee {} is dead", self.ctx.pid);
        }

        Ok(Some(status))
    }

    pub fn peek(&self, addr: u64) -> EngineResult<u64> {
        self.require_attached()?;
        let word = ptrace::read(self.ctx.pid, addr as *mut c_void)
            .map_err(EngineError::from_ptrace)?;
        Ok(word as u64)
    }

    pub fn poke(&self, addr: u64, data: u64) -> EngineResult<()> {
        self.require_attached()?;
        ptrace::write(
            self.ctx.pid,
            addr as *mut c_void,
            data as *mut c_void,
        )
        .map_err(EngineError::from_ptrace)
    }

    pub fn getregs(&mut self) -> EngineResult<Registers> {
        self.require_attached()?;
        let regs = ptrace::getregs(self.ctx.pid).map_err(EngineError::from_ptrace)?;
        let regs = Registers::new(SupportedArch::X8664, regs);
        self.ctx.cached_regs = Some(regs);
        Ok(regs)
    }

    pub fn setregs(&mut self, regs: &Registers) -> EngineResult<()> {
        self.require_attached()?;
        ptrace::setregs(self.ctx.pid, *regs.inner()).map_err(EngineError::from_ptrace)
    }

    /// `PTRACE_GETFPREGS` has no safe wrapper in the `nix` version this
    /// crate pins, so it is issued via the raw `libc::ptrace` entry point
    /// the same way `nix`'s own safe wrappers are implemented internally.
    pub fn getfpregs(&self) -> EngineResult<user_fpregs_struct> {
        self.require_attached()?;
        let mut regs = MaybeUninit::<user_fpregs_struct>::uninit();
        let ret = unsafe {
            nix::libc::ptrace(
                PTRACE_GETFPREGS,
                self.ctx.pid.as_raw(),
                ptr::null_mut::<c_void>(),
                regs.as_mut_ptr() as *mut c_void,
            )
        };
        if ret < 0 {
            return Err(EngineError::from_ptrace(nix::Error::last()));
        }
        Ok(unsafe { regs.assume_init() })
    }

    pub fn setfpregs(&self, regs: &user_fpregs_struct) -> EngineResult<()> {
        self.require_attached()?;
        let ret = unsafe {
            nix::libc::ptrace(
                PTRACE_SETFPREGS,
                self.ctx.pid.as_raw(),
                ptr::null_mut::<c_void>(),
                regs as *const _ as *mut c_void,
            )
        };
        if ret < 0 {
            return Err(EngineError::from_ptrace(nix::Error::last()));
        }
        Ok(())
    }

    pub fn set_run_callback(&mut self, cb: Box<dyn FnMut()>) {
        self.ctx.run_callback = Some(cb);
    }

    pub fn set_breakpoint(&mut self, addr: u64, callback: Option<Box<dyn FnMut()>>) -> usize {
        self.ctx.breakpoints.push(Breakpoint::new(addr, callback));
        self.ctx.breakpoints.len() - 1
    }
}

/// Classifies a `WaitStatus` into the state-machine's `ProcessState`, per
/// the engine's canonical wait-classification table. This is the one place
/// that performs this classification; composite `*_wait` operations funnel
/// through [`Tracer::waitpid`] to reach it.
fn classify_wait_status(status: &WaitStatus) -> ProcessState {
    match status {
        WaitStatus::Exited(_, _) | WaitStatus::Signaled(_, _, _) => ProcessState::Dead,
        WaitStatus::Stopped(_, Signal::SIGSTOP) => ProcessState::SignalStopped,
        WaitStatus::Stopped(_, _)
        | WaitStatus::PtraceEvent(_, _, _)
        | WaitStatus::PtraceSyscall(_) => ProcessState::PtraceStopped,
        WaitStatus::Continued(_) => ProcessState::Running,
        WaitStatus::StillAlive => ProcessState::Running,
    }
}
