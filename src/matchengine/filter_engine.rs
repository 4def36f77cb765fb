use crate::error::EngineResult;
use crate::tracer::Tracer;

use super::backend::{open_pid_mem, select_backend, ProcMemOps};
use super::predicate::{self, RangeBounds};
use super::store::MatchList;
use super::value::{flags_for_width, Needle, TypedValue};

/// Re-reads a single already-known address, picking the same backend a
/// fresh search would. Unlike search, filtering does not walk a region —
/// it probes specific surviving addresses one at a time.
fn reread(tracer: &Tracer, addr: u64) -> EngineResult<TypedValue> {
    let pid = tracer.ctx.pid.as_raw();
    if select_backend(pid) {
        let file = open_pid_mem(pid, false)?;
        // `read_at` below probes one address directly rather than walking a
        // region with `next()`, so stride/alignment never comes into play.
        let ops = ProcMemOps::new(file, true);
        Ok(ops.read_at(addr)?.value)
    } else {
        let word = tracer.peek(addr)?;
        Ok(TypedValue::from_bytes(word.to_ne_bytes(), flags_for_width(8)))
    }
}

/// Re-reads every candidate in `list` and retains it only if `pred(new)`
/// holds; an address that can no longer be read is treated as a non-match
/// and dropped, consistent with the engine never recovering state for a
/// gone tracee mid-filter.
fn filter_with<F>(tracer: &Tracer, list: &mut MatchList, pred: F)
where
    F: Fn(&TypedValue) -> bool,
{
    list.retain(|orig| match reread(tracer, orig.addr) {
        Ok(new) => pred(&new),
        Err(_) => false,
    });
}

fn filter_with_orig<F>(tracer: &Tracer, list: &mut MatchList, pred: F)
where
    F: Fn(&TypedValue, &TypedValue) -> bool,
{
    list.retain(|orig| match reread(tracer, orig.addr) {
        Ok(new) => pred(&orig.value, &new),
        Err(_) => false,
    });
}

pub fn match_eq(tracer: &Tracer, list: &mut MatchList, needle: &Needle) {
    filter_with(tracer, list, |v| predicate::match_eq(needle, v));
}

pub fn match_ne(tracer: &Tracer, list: &mut MatchList, needle: &Needle) {
    filter_with(tracer, list, |v| predicate::match_ne(needle, v));
}

pub fn match_lt(tracer: &Tracer, list: &mut MatchList, needle: &Needle) {
    filter_with(tracer, list, |v| predicate::match_lt(needle, v));
}

pub fn match_le(tracer: &Tracer, list: &mut MatchList, needle: &Needle) {
    filter_with(tracer, list, |v| predicate::match_le(needle, v));
}

pub fn match_gt(tracer: &Tracer, list: &mut MatchList, needle: &Needle) {
    filter_with(tracer, list, |v| predicate::match_gt(needle, v));
}

pub fn match_ge(tracer: &Tracer, list: &mut MatchList, needle: &Needle) {
    filter_with(tracer, list, |v| predicate::match_ge(needle, v));
}

pub fn match_range(
    tracer: &Tracer,
    list: &mut MatchList,
    lower: &Needle,
    upper: &Needle,
    bounds: RangeBounds,
) {
    filter_with(tracer, list, |v| {
        predicate::match_range(lower, upper, v, bounds)
    });
}

pub fn match_changed(tracer: &Tracer, list: &mut MatchList) {
    filter_with_orig(tracer, list, predicate::match_changed);
}

pub fn match_unchanged(tracer: &Tracer, list: &mut MatchList) {
    filter_with_orig(tracer, list, predicate::match_unchanged);
}

pub fn match_increased(tracer: &Tracer, list: &mut MatchList) {
    filter_with_orig(tracer, list, predicate::match_increased);
}

pub fn match_decreased(tracer: &Tracer, list: &mut MatchList) {
    filter_with_orig(tracer, list, predicate::match_decreased);
}
