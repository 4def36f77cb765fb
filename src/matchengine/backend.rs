use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;

use nix::sys::uio::pread;
use nix::unistd::{access, AccessFlags};

use super::value::{flags_for_width, MatchObject, TypedValue};
use crate::error::EngineResult;
use crate::region::Region;
use crate::tracer::Tracer;

/// Capability every memory read backend exposes. `init`/`fini` bracket a
/// whole search or filter pass; `set`/`next` drive it one region at a time.
pub trait ProcessOps {
    fn set(&mut self, region: &Region) -> EngineResult<bool>;
    fn next(&mut self) -> EngineResult<Option<MatchObject>>;
    fn fini(&mut self) -> EngineResult<()>;
}

fn mem_path(pid: i32) -> String {
    format!("/proc/{}/mem", pid)
}

pub fn can_read_pid_mem(pid: i32) -> bool {
    access(mem_path(pid).as_str(), AccessFlags::R_OK).is_ok()
}

pub fn can_write_pid_mem(pid: i32) -> bool {
    access(mem_path(pid).as_str(), AccessFlags::W_OK).is_ok()
}

pub fn open_pid_mem(pid: i32, write: bool) -> EngineResult<File> {
    let mut opts = OpenOptions::new();
    opts.read(true);
    if write {
        opts.write(true);
    }
    opts.custom_flags(0);
    Ok(opts.open(mem_path(pid))?)
}

/// Reads exactly `buf.len()` bytes at `offset`, retrying on short reads
/// until the buffer fills or EOF is hit; the mirror of
/// `read_pid_mem_loop_fd`. Returns the number of bytes actually filled.
fn pread_loop(fd: i32, buf: &mut [u8], offset: i64) -> EngineResult<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = pread(fd, &mut buf[total..], offset + total as i64)?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// `/proc/<pid>/mem`-backed reader. Each `next()` call just pulls the next
/// 8-byte window via `pread` rather than maintaining a sliding window like
/// `PtraceOps`; the only state carried between calls is the cursor, which
/// advances by one word in aligned mode or one byte in unaligned mode.
pub struct ProcMemOps {
    file: File,
    aligned: bool,
    cursor: u64,
    region_end: u64,
}

impl ProcMemOps {
    pub fn new(file: File, aligned: bool) -> ProcMemOps {
        ProcMemOps {
            file,
            aligned,
            cursor: 0,
            region_end: 0,
        }
    }

    fn stride(&self) -> u64 {
        if self.aligned {
            WORD_BYTES as u64
        } else {
            1
        }
    }

    fn read_object_at(&self, addr: u64) -> EngineResult<MatchObject> {
        let mut buf = [0u8; 8];
        let got = pread_loop(self.file.as_raw_fd(), &mut buf, addr as i64)?;
        let flags = flags_for_width(got);
        Ok(MatchObject::new(addr, TypedValue::from_bytes(buf, flags)))
    }

    /// Re-reads a single already-known address; used by the filter engine,
    /// which does not walk a region but probes specific surviving
    /// addresses.
    pub fn read_at(&self, addr: u64) -> EngineResult<MatchObject> {
        self.read_object_at(addr)
    }
}

impl ProcessOps for ProcMemOps {
    fn set(&mut self, region: &Region) -> EngineResult<bool> {
        self.cursor = region.start;
        self.region_end = region.end;
        Ok(region.len() < 8)
    }

    fn next(&mut self) -> EngineResult<Option<MatchObject>> {
        if self.cursor + 8 > self.region_end {
            if self.cursor >= self.region_end {
                return Ok(None);
            }
            // Short tail: fewer than 8 bytes remain. Aligned mode has
            // nothing left it can emit at word stride once a full word no
            // longer fits; unaligned mode emits one reduced-width object.
            if self.aligned {
                self.cursor = self.region_end;
                return Ok(None);
            }
            let remaining = (self.region_end - self.cursor) as usize;
            let mut buf = [0u8; 8];
            let got = pread_loop(self.file.as_raw_fd(), &mut buf[..remaining], self.cursor as i64)?;
            let flags = flags_for_width(got);
            let obj = MatchObject::new(self.cursor, TypedValue::from_bytes(buf, flags));
            self.cursor += 1;
            return Ok(Some(obj));
        }

        let obj = self.read_object_at(self.cursor)?;
        self.cursor += self.stride();
        Ok(Some(obj))
    }

    fn fini(&mut self) -> EngineResult<()> {
        Ok(())
    }
}

const WORD_BYTES: usize = 8;

/// Ptrace-backed sliding-window reader. Maintains a window of whole machine
/// words read via `PEEKTEXT`, re-sliced into either word-stride (aligned) or
/// byte-stride (unaligned) candidates as the window slides forward.
pub struct PtraceOps<'t> {
    tracer: &'t Tracer,
    aligned: bool,
    window: Vec<u8>,
    /// Address of `window[0]`.
    window_base: u64,
    cursor: u64,
    region_end: u64,
}

impl<'t> PtraceOps<'t> {
    pub fn new(tracer: &'t Tracer, aligned: bool) -> PtraceOps<'t> {
        PtraceOps {
            tracer,
            aligned,
            window: Vec::new(),
            window_base: 0,
            cursor: 0,
            region_end: 0,
        }
    }

    fn stride(&self) -> u64 {
        if self.aligned {
            WORD_BYTES as u64
        } else {
            1
        }
    }

    fn fetch_word_at(&mut self, addr: u64) -> EngineResult<()> {
        let word = self.tracer.peek(addr)?;
        self.window.extend_from_slice(&word.to_ne_bytes());
        Ok(())
    }

    fn window_has(&self, from: u64, len: usize) -> bool {
        from >= self.window_base
            && (from - self.window_base) as usize + len <= self.window.len()
    }

    /// Ensures the window holds at least `len` bytes starting at `from`,
    /// fetching and shifting as needed. `from` must be monotonically
    /// non-decreasing across calls within one region.
    fn ensure_window(&mut self, from: u64, len: usize) -> EngineResult<bool> {
        while !self.window_has(from, len) {
            if from >= self.region_end {
                return Ok(false);
            }
            let next_word_addr = self.window_base + self.window.len() as u64;
            if next_word_addr >= self.region_end && self.window.is_empty() {
                return Ok(false);
            }
            if next_word_addr > self.region_end.saturating_sub(1) && !self.window.is_empty() {
                // No more whole words available in the region; cannot grow
                // further, caller must fall back to a short read.
                return Ok(false);
            }
            self.fetch_word_at(next_word_addr)?;

            // Trim the window down to the trailing bytes we still need for
            // continuity (one word for aligned mode, `WORD_BYTES - 1`
            // trailing bytes for unaligned mode) once it grows past that.
            let keep_from = from.saturating_sub(self.window_base);
            if keep_from > 0 {
                let drop = keep_from as usize;
                self.window.drain(0..drop.min(self.window.len()));
                self.window_base += drop as u64;
            }
        }
        Ok(true)
    }
}

impl<'t> ProcessOps for PtraceOps<'t> {
    fn set(&mut self, region: &Region) -> EngineResult<bool> {
        self.window.clear();
        self.window_base = region.start;
        self.cursor = region.start;
        self.region_end = region.end;
        Ok(region.len() < WORD_BYTES as u64)
    }

    fn next(&mut self) -> EngineResult<Option<MatchObject>> {
        if self.cursor >= self.region_end {
            return Ok(None);
        }

        if self.ensure_window(self.cursor, WORD_BYTES)? {
            let offset = (self.cursor - self.window_base) as usize;
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&self.window[offset..offset + 8]);
            let obj = MatchObject::new(self.cursor, TypedValue::from_bytes(bytes, flags_for_width(8)));
            self.cursor += self.stride();
            return Ok(Some(obj));
        }

        // Short tail: fewer than 8 bytes remain in the region. Only
        // meaningful in unaligned mode; aligned mode has nothing left to
        // emit once a full word no longer fits.
        if self.aligned {
            self.cursor = self.region_end;
            return Ok(None);
        }

        let remaining = (self.region_end - self.cursor) as usize;
        if remaining == 0 {
            return Ok(None);
        }
        if !self.window_has(self.cursor, remaining) {
            // Window wasn't primed with even the short tail; try once more
            // with a direct read of whatever whole words remain.
            let _ = self.ensure_window(self.cursor, remaining);
        }
        if !self.window_has(self.cursor, remaining) {
            return Ok(None);
        }
        let offset = (self.cursor - self.window_base) as usize;
        let mut bytes = [0u8; 8];
        bytes[..remaining].copy_from_slice(&self.window[offset..offset + remaining]);
        let obj = MatchObject::new(
            self.cursor,
            TypedValue::from_bytes(bytes, flags_for_width(remaining)),
        );
        self.cursor += 1;
        Ok(Some(obj))
    }

    fn fini(&mut self) -> EngineResult<()> {
        self.window.clear();
        Ok(())
    }
}

/// Chooses ProcMem when both readable and openable; otherwise ptrace. The
/// tracee must already be stopped for ptrace reads.
pub fn select_backend(pid: i32) -> bool {
    if crate::flags::Flags::get().force_procmem_backend {
        return true;
    }
    can_read_pid_mem(pid) && open_pid_mem(pid, false).is_ok()
}
