use nix::unistd::Pid;
use serde::Serialize;

use super::EngineCommand;
use crate::error::{EngineError, EngineResult};
use crate::matchengine::{self, Needle};
use crate::region::maps;
use crate::tracer::Tracer;

pub struct SearchCommand {
    pid: i32,
    op: String,
    needle: String,
    aligned: bool,
}

impl SearchCommand {
    pub fn new(pid: i32, op: String, needle: String, aligned: bool) -> SearchCommand {
        SearchCommand {
            pid,
            op,
            needle,
            aligned,
        }
    }
}

#[derive(Serialize)]
struct Hit {
    addr: u64,
}

impl EngineCommand for SearchCommand {
    fn run(&mut self) -> EngineResult<()> {
        let needle = Needle::parse(&self.needle)?;
        let regions = maps::discover(self.pid)?;

        let mut tracer = Tracer::new(Pid::from_raw(self.pid));
        tracer.attach_wait()?;

        let list = match self.op.as_str() {
            "eq" => matchengine::search::search_eq(&tracer, &regions, &needle, self.aligned),
            "ne" => matchengine::search::search_ne(&tracer, &regions, &needle, self.aligned),
            "lt" => matchengine::search::search_lt(&tracer, &regions, &needle, self.aligned),
            "le" => matchengine::search::search_le(&tracer, &regions, &needle, self.aligned),
            "gt" => matchengine::search::search_gt(&tracer, &regions, &needle, self.aligned),
            "ge" => matchengine::search::search_ge(&tracer, &regions, &needle, self.aligned),
            other => Err(EngineError::Unsupported(unsupported_op(other))),
        };

        tracer.detach()?;

        let list = list?;
        let hits: Vec<Hit> = list.iter().map(|o| Hit { addr: o.addr }).collect();
        println!("{}", serde_json::to_string_pretty(&hits).unwrap());
        Ok(())
    }
}

fn unsupported_op(_op: &str) -> &'static str {
    "unknown search operator (expected eq, ne, lt, le, gt or ge)"
}
