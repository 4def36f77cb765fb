use nix::unistd::Pid;
use serde::Serialize;

use super::EngineCommand;
use crate::error::{EngineError, EngineResult};
use crate::matchengine::value::{flags_for_width, MatchObject, TypedValue};
use crate::matchengine::{filter_engine, MatchList, Needle};
use crate::tracer::Tracer;

/// Re-checks a caller-supplied address list against one predicate. Meant as
/// a manual smoke-testing entry point, not a replacement for holding onto
/// the `MatchList` a library caller gets back from a search.
pub struct FilterCommand {
    pid: i32,
    op: String,
    needle: String,
    addrs: Vec<u64>,
}

impl FilterCommand {
    pub fn new(pid: i32, op: String, needle: String, addrs: Vec<u64>) -> FilterCommand {
        FilterCommand {
            pid,
            op,
            needle,
            addrs,
        }
    }
}

#[derive(Serialize)]
struct Hit {
    addr: u64,
}

impl EngineCommand for FilterCommand {
    fn run(&mut self) -> EngineResult<()> {
        let mut tracer = Tracer::new(Pid::from_raw(self.pid));
        tracer.attach_wait()?;

        let mut list = MatchList::new();
        for &addr in &self.addrs {
            let word = tracer.peek(addr)?;
            let value = TypedValue::from_bytes(word.to_ne_bytes(), flags_for_width(8));
            list.insert(MatchObject::new(addr, value));
        }

        match self.op.as_str() {
            "changed" => filter_engine::match_changed(&tracer, &mut list),
            "unchanged" => filter_engine::match_unchanged(&tracer, &mut list),
            "increased" => filter_engine::match_increased(&tracer, &mut list),
            "decreased" => filter_engine::match_decreased(&tracer, &mut list),
            "eq" | "ne" | "lt" | "le" | "gt" | "ge" => {
                let needle = Needle::parse(&self.needle)?;
                match self.op.as_str() {
                    "eq" => filter_engine::match_eq(&tracer, &mut list, &needle),
                    "ne" => filter_engine::match_ne(&tracer, &mut list, &needle),
                    "lt" => filter_engine::match_lt(&tracer, &mut list, &needle),
                    "le" => filter_engine::match_le(&tracer, &mut list, &needle),
                    "gt" => filter_engine::match_gt(&tracer, &mut list, &needle),
                    "ge" => filter_engine::match_ge(&tracer, &mut list, &needle),
                    _ => unreachable!(),
                }
            }
            other => return Err(EngineError::Unsupported(unsupported_op(other))),
        }

        tracer.detach()?;

        let hits: Vec<Hit> = list.iter().map(|o| Hit { addr: o.addr }).collect();
        println!("{}", serde_json::to_string_pretty(&hits).unwrap());
        Ok(())
    }
}

fn unsupported_op(_op: &str) -> &'static str {
    "unknown filter operator"
}
