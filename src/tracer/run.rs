use super::context::ProcessState;
use super::Tracer;
use crate::error::{EngineError, EngineResult};

impl Tracer {
    /// Arms every registered breakpoint, invokes the run-starting callback
    /// if one was set, then loops `Cont + Wait` until the tracee exits.
    /// Every stop at `IP - 1` matching a known breakpoint dispatches its
    /// callback and steps past it; any other stop is just resumed.
    pub fn run(&mut self) -> EngineResult<()> {
        self.ctx.started = true;
        self.arm_all_breakpoints()?;

        if let Some(mut cb) = self.ctx.run_callback.take() {
            cb();
            self.ctx.run_callback = Some(cb);
        }

        self.cont_wait()?;
        if self.ctx.current_state == ProcessState::Dead {
            return Ok(());
        }
        if self.ctx.current_state != ProcessState::PtraceStopped
            && self.ctx.current_state != ProcessState::SignalStopped
        {
            return Err(EngineError::InvalidState(
                "run: initial cont_wait did not leave the tracee stopped",
            ));
        }

        loop {
            let regs = self.getregs()?;
            let ip = regs.ip()?;

            let hit = ip.checked_sub(1).and_then(|addr| self.ctx.find_breakpoint(addr));

            match hit {
                Some(index) => {
                    self.ctx.last_breakpoint_hit = Some(index);
                    if let Some(mut cb) = self.ctx.breakpoints[index].callback.take() {
                        cb();
                        self.ctx.breakpoints[index].callback = Some(cb);
                    }
                    self.breakpoint_resume(index)?;
                }
                None => {
                    self.cont_wait()?;
                }
            }

            if self.ctx.current_state == ProcessState::Dead {
                return Ok(());
            }
        }
    }
}
