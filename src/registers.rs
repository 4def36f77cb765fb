use nix::libc::user_regs_struct;

use crate::error::{EngineError, EngineResult};

/// Instruction-set architectures this crate knows how to find an instruction
/// pointer in. Kept as an enum rather than a `cfg`-only split because a
/// single process running under this engine could in principle be 32- or
/// 64-bit regardless of the host's own architecture.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SupportedArch {
    X8664,
}

/// Thin wrapper over the raw `user_regs_struct` ptrace hands back. Only the
/// instruction pointer is pinned here: everything else a caller needs can be
/// read straight off the inner struct.
#[derive(Copy, Clone)]
pub struct Registers {
    arch: SupportedArch,
    regs: user_regs_struct,
}

impl Registers {
    pub fn new(arch: SupportedArch, regs: user_regs_struct) -> Registers {
        Registers { arch, regs }
    }

    pub fn arch(&self) -> SupportedArch {
        self.arch
    }

    pub fn inner(&self) -> &user_regs_struct {
        &self.regs
    }

    pub fn inner_mut(&mut self) -> &mut user_regs_struct {
        &mut self.regs
    }

    /// Current instruction pointer, architecture-neutral to the caller.
    pub fn ip(&self) -> EngineResult<u64> {
        get_ip(self)
    }

    pub fn set_ip(&mut self, val: u64) -> EngineResult<()> {
        set_ip(self, val)
    }
}

/// The core pins architectural coupling to this single knob: `get_ip` and
/// `set_ip`. Everything above them (breakpoint arm/disarm/resume) is
/// architecture-neutral.
pub fn get_ip(regs: &Registers) -> EngineResult<u64> {
    match regs.arch {
        SupportedArch::X8664 => Ok(regs.regs.rip),
    }
}

pub fn set_ip(regs: &mut Registers, val: u64) -> EngineResult<()> {
    match regs.arch {
        SupportedArch::X8664 => {
            regs.regs.rip = val;
            Ok(())
        }
    }
}

#[allow(dead_code)]
fn unsupported_arch() -> EngineError {
    EngineError::Unsupported("non-x86_64 architectures are not supported")
}
