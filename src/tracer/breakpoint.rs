use super::context::ProcessState;
use super::Tracer;
use crate::error::{EngineError, EngineResult};
use crate::log;
use crate::logging::LogLevel::*;

const INT3: u8 = 0xCC;

/// Outcome of resuming past a breakpoint hit.
#[derive(Debug, Eq, PartialEq)]
pub enum ResumeOutcome {
    Terminated,
    Stopped,
}

fn word_with_low_byte(word: u64, byte: u8) -> u64 {
    (word & !0xFFu64) | u64::from(byte)
}

impl Tracer {
    /// `PEEKTEXT` the word at `addr`, stash it as `orig_byte`, then write
    /// the word back with its low byte replaced by `0xCC`.
    pub fn arm_breakpoint(&mut self, index: usize) -> EngineResult<()> {
        let addr = self.ctx.breakpoints[index].addr;
        let word = self.peek(addr)?;
        self.ctx.breakpoints[index].orig_byte = Some((word & 0xFF) as u8);
        self.poke(addr, word_with_low_byte(word, INT3))?;
        log!(LogDebug, "armed breakpoint at {:#x}", addr);
        Ok(())
    }

    pub fn disarm_breakpoint(&mut self, index: usize) -> EngineResult<()> {
        let bp = &self.ctx.breakpoints[index];
        let addr = bp.addr;
        let orig_byte = match bp.orig_byte {
            Some(b) => b,
            None => return Ok(()),
        };
        let word = self.peek(addr)?;
        self.poke(addr, word_with_low_byte(word, orig_byte))?;
        self.ctx.breakpoints[index].orig_byte = None;
        Ok(())
    }

    pub fn arm_all_breakpoints(&mut self) -> EngineResult<()> {
        for i in 0..self.ctx.breakpoints.len() {
            if !self.ctx.breakpoints[i].is_armed() {
                self.arm_breakpoint(i)?;
            }
        }
        Ok(())
    }

    /// The trickiest routine in the tracer. The tracee has just trapped into
    /// the `0xCC` byte, so its IP sits one byte past the breakpoint address
    /// (x86 traps after executing the faulting instruction). To step past
    /// it cleanly: rewind IP, disarm, single-step one real instruction,
    /// re-arm, then resume normally.
    pub fn breakpoint_resume(&mut self, index: usize) -> EngineResult<ResumeOutcome> {
        let addr = self.ctx.breakpoints[index].addr;

        let mut regs = self.getregs()?;
        regs.set_ip(addr)?;
        self.setregs(&regs)?;

        self.disarm_breakpoint(index)?;

        let status = self.singlestep_wait()?;
        let _ = status;
        if self.ctx.current_state == ProcessState::Dead {
            return Ok(ResumeOutcome::Terminated);
        }

        self.arm_breakpoint(index)?;

        self.cont_wait()?;
        match self.ctx.current_state {
            ProcessState::Dead => Ok(ResumeOutcome::Terminated),
            ProcessState::PtraceStopped | ProcessState::SignalStopped => {
                Ok(ResumeOutcome::Stopped)
            }
            _ => Err(EngineError::InvalidState(
                "breakpoint_resume: cont_wait left the tracee in an unexpected state",
            )),
        }
    }
}
