pub mod filter;
pub mod maps;

use bitflags::bitflags;

bitflags! {
    pub struct Permissions: u8 {
        const READ    = 0b0000_0001;
        const WRITE   = 0b0000_0010;
        const EXEC    = 0b0000_0100;
        const PRIVATE = 0b0000_1000;
        const SHARED  = 0b0001_0000;
    }
}

/// A contiguous virtual address range of the tracee with uniform
/// permissions, as parsed from one line of `/proc/<pid>/maps`.
#[derive(Clone, Debug)]
pub struct Region {
    pub id: u64,
    pub start: u64,
    pub end: u64,
    pub perms: Permissions,
    pub pathname: String,
}

impl Region {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// Owning, insertion-ordered collection of regions, with a monotonically
/// increasing id assigned to each one as it is added.
#[derive(Default)]
pub struct RegionSet {
    regions: Vec<Region>,
    next_id: u64,
}

impl RegionSet {
    pub fn new() -> RegionSet {
        RegionSet {
            regions: Vec::new(),
            next_id: 0,
        }
    }

    pub fn insert(&mut self, start: u64, end: u64, perms: Permissions, pathname: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.regions.push(Region {
            id,
            start,
            end,
            perms,
            pathname,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    pub fn find_by_address(&self, addr: u64) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(addr))
    }
}
