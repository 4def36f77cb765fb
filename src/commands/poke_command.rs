use nix::unistd::Pid;

use super::EngineCommand;
use crate::error::EngineResult;
use crate::tracer::Tracer;

pub struct PokeCommand {
    pid: i32,
    addr: u64,
    value: u64,
}

impl PokeCommand {
    pub fn new(pid: i32, addr: u64, value: u64) -> PokeCommand {
        PokeCommand { pid, addr, value }
    }
}

impl EngineCommand for PokeCommand {
    fn run(&mut self) -> EngineResult<()> {
        let mut tracer = Tracer::new(Pid::from_raw(self.pid));
        tracer.attach_wait()?;
        tracer.poke(self.addr, self.value)?;
        tracer.detach()?;
        println!("wrote {:#x} at {:#x}", self.value, self.addr);
        Ok(())
    }
}
