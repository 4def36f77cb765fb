use crate::error::EngineResult;
use crate::flags::ChunkClass;
use crate::log;
use crate::logging::LogLevel::*;
use crate::region::RegionSet;
use crate::tracer::Tracer;

use super::backend::{open_pid_mem, select_backend, PtraceOps, ProcMemOps, ProcessOps};
use super::predicate::{self, RangeBounds};
use super::store::MatchList;
use super::value::{Needle, TypedValue};

/// Sweeps every region in `regions`, emitting a `MatchObject` for every
/// address whose freshly-read value satisfies `pred`. Backend selection
/// (ProcMem vs ptrace sliding window) follows §4.6: ProcMem is used when the
/// tracee's `/proc/<pid>/mem` is both readable and openable, otherwise the
/// tracer's own ptrace connection is used.
fn search_with<F>(
    tracer: &Tracer,
    regions: &RegionSet,
    aligned: bool,
    pred: F,
) -> EngineResult<MatchList>
where
    F: Fn(&TypedValue) -> bool,
{
    let pid = tracer.ctx.pid.as_raw();
    let class = crate::flags::Flags::get().default_search_chunk_class;
    let mut list = MatchList::with_chunk_class(class);

    if select_backend(pid) {
        let file = open_pid_mem(pid, false)?;
        let mut backend = ProcMemOps::new(file, aligned);
        sweep(&mut backend, regions, &pred, &mut list)?;
    } else {
        let mut backend = PtraceOps::new(tracer, aligned);
        sweep(&mut backend, regions, &pred, &mut list)?;
    }

    log!(LogDebug, "search produced {} candidates", list.size());
    Ok(list)
}

fn sweep<B, F>(
    backend: &mut B,
    regions: &RegionSet,
    pred: &F,
    list: &mut MatchList,
) -> EngineResult<()>
where
    B: ProcessOps,
    F: Fn(&TypedValue) -> bool,
{
    for region in regions.iter() {
        if backend.set(region)? {
            continue;
        }
        while let Some(obj) = backend.next()? {
            if pred(&obj.value) {
                list.insert(obj);
            }
        }
    }
    backend.fini()
}

pub fn search_eq(tracer: &Tracer, regions: &RegionSet, needle: &Needle, aligned: bool) -> EngineResult<MatchList> {
    search_with(tracer, regions, aligned, |v| predicate::match_eq(needle, v))
}

pub fn search_ne(tracer: &Tracer, regions: &RegionSet, needle: &Needle, aligned: bool) -> EngineResult<MatchList> {
    search_with(tracer, regions, aligned, |v| predicate::match_ne(needle, v))
}

pub fn search_lt(tracer: &Tracer, regions: &RegionSet, needle: &Needle, aligned: bool) -> EngineResult<MatchList> {
    search_with(tracer, regions, aligned, |v| predicate::match_lt(needle, v))
}

pub fn search_le(tracer: &Tracer, regions: &RegionSet, needle: &Needle, aligned: bool) -> EngineResult<MatchList> {
    search_with(tracer, regions, aligned, |v| predicate::match_le(needle, v))
}

pub fn search_gt(tracer: &Tracer, regions: &RegionSet, needle: &Needle, aligned: bool) -> EngineResult<MatchList> {
    search_with(tracer, regions, aligned, |v| predicate::match_gt(needle, v))
}

pub fn search_ge(tracer: &Tracer, regions: &RegionSet, needle: &Needle, aligned: bool) -> EngineResult<MatchList> {
    search_with(tracer, regions, aligned, |v| predicate::match_ge(needle, v))
}

pub fn search_range(
    tracer: &Tracer,
    regions: &RegionSet,
    lower: &Needle,
    upper: &Needle,
    bounds: RangeBounds,
    aligned: bool,
) -> EngineResult<MatchList> {
    search_with(tracer, regions, aligned, |v| {
        predicate::match_range(lower, upper, v, bounds)
    })
}
