use std::env;

lazy_static! {
    static ref FLAGS: Flags = init_flags();
}

/// Default chunk size class requested by a fresh search. One of `Tiny`,
/// `Small`, `Medium`, `Large` or `Huge` as described in the match store.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChunkClass {
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
}

impl ChunkClass {
    pub fn capacity(self) -> usize {
        match self {
            ChunkClass::Tiny => 50,
            ChunkClass::Small => 100,
            ChunkClass::Medium => 200,
            ChunkClass::Large => 400,
            ChunkClass::Huge => 800,
        }
    }
}

#[derive(Clone)]
pub struct Flags {
    /// Whether any warning or error that would be logged is treated as fatal.
    /// Mostly useful for tests that want to fail fast on the first `LogWarn`.
    pub fatal_errors_and_warnings: bool,
    /// Chunk size class a fresh search allocates by default.
    pub default_search_chunk_class: ChunkClass,
    /// Force ptrace reads through `/proc/<pid>/mem` even if the sliding
    /// ptrace backend is otherwise eligible; useful for exercising the
    /// ProcMem path deterministically in tests.
    pub force_procmem_backend: bool,
}

impl Flags {
    pub fn get() -> &'static Flags {
        &FLAGS
    }
}

fn env_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(v) => v != "0" && !v.is_empty(),
        Err(_) => false,
    }
}

pub fn init_flags() -> Flags {
    Flags {
        fatal_errors_and_warnings: env_flag("MEMTRACE_FATAL_WARNINGS"),
        default_search_chunk_class: ChunkClass::Huge,
        force_procmem_backend: env_flag("MEMTRACE_FORCE_PROCMEM"),
    }
}
