use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use nix::unistd::{access, AccessFlags};

use super::{Permissions, RegionSet};
use crate::error::EngineResult;
use crate::log;
use crate::logging::LogLevel::*;

fn maps_path(pid: i32) -> String {
    format!("/proc/{}/maps", pid)
}

/// Probes whether `/proc/<pid>/maps` is readable without opening it, so a
/// caller can decide whether to even attempt discovery.
pub fn can_read_pid_maps(pid: i32) -> bool {
    access(Path::new(&maps_path(pid)), AccessFlags::R_OK).is_ok()
}

/// One parsed line of `/proc/<pid>/maps`:
///
/// ```text
/// <start>-<end> rwxp|s <offset> <major>:<minor> <inode> [pathname]
/// ```
struct ParsedLine {
    start: u64,
    end: u64,
    read: bool,
    write: bool,
    exec: bool,
    cow: char,
    pathname: String,
}

fn parse_line(line: &str) -> Option<ParsedLine> {
    let mut fields = line.splitn(6, ' ').filter(|f| !f.is_empty());

    let addr_range = fields.next()?;
    let perms = fields.next()?;
    let _offset = fields.next()?;
    let _dev = fields.next()?;
    let _inode = fields.next()?;
    // Whatever remains after the five fixed columns, trimmed of the
    // whitespace padding `/proc/*/maps` uses to align pathnames, is the
    // pathname (possibly empty, possibly a pseudo-path like `[heap]`).
    let pathname = line
        .splitn(6, ' ')
        .nth(5)
        .unwrap_or("")
        .trim_start()
        .to_string();

    let (start_s, end_s) = {
        let mut it = addr_range.splitn(2, '-');
        (it.next()?, it.next()?)
    };
    let start = u64::from_str_radix(start_s, 16).ok()?;
    let end = u64::from_str_radix(end_s, 16).ok()?;

    let mut chars = perms.chars();
    let read = chars.next()? == 'r';
    let write = chars.next()? == 'w';
    let exec = chars.next()? == 'x';
    let cow = chars.next()?;

    Some(ParsedLine {
        start,
        end,
        read,
        write,
        exec,
        cow,
        pathname,
    })
}

/// Parses `/proc/<pid>/maps` into a [`RegionSet`], keeping only regions with
/// both read and write permissions: the engine cannot meaningfully search
/// executable-only or read-only scratch.
pub fn discover(pid: i32) -> EngineResult<RegionSet> {
    let file = fs::File::open(maps_path(pid))?;
    let reader = io::BufReader::new(file);

    let mut set = RegionSet::new();

    for line in reader.lines() {
        let line = line?;
        let parsed = match parse_line(&line) {
            Some(p) => p,
            None => {
                log!(LogWarn, "skipping unparseable maps line: {:?}", line);
                continue;
            }
        };

        if !(parsed.read && parsed.write) {
            continue;
        }

        let mut perms = Permissions::empty();
        if parsed.read {
            perms |= Permissions::READ;
        }
        if parsed.write {
            perms |= Permissions::WRITE;
        }
        if parsed.exec {
            perms |= Permissions::EXEC;
        }
        match parsed.cow {
            'p' => perms |= Permissions::PRIVATE,
            's' => perms |= Permissions::SHARED,
            _ => {}
        }

        set.insert(parsed.start, parsed.end, perms, parsed.pathname);
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_heap_line() {
        let line = "7f1234560000-7f1234581000 rw-p 00000000 00:00 0                  [heap]";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.start, 0x7f1234560000);
        assert_eq!(parsed.end, 0x7f1234581000);
        assert!(parsed.read);
        assert!(parsed.write);
        assert!(!parsed.exec);
        assert_eq!(parsed.pathname, "[heap]");
    }

    #[test]
    fn parses_a_line_with_no_pathname() {
        let line = "7f1234560000-7f1234581000 rw-p 00000000 00:00 0";
        let parsed = parse_line(line).unwrap();
        assert_eq!(parsed.pathname, "");
    }

    #[test]
    fn discover_filters_to_read_write_regions() {
        // A synthetic in-process smoke test: discover() on our own pid
        // should always find at least the stack, which is rw.
        let pid = std::process::id() as i32;
        let set = discover(pid).expect("own /proc/self/maps must be readable");
        assert!(!set.is_empty());
        for region in set.iter() {
            assert!(region.perms.contains(Permissions::READ));
            assert!(region.perms.contains(Permissions::WRITE));
            assert!(region.start < region.end);
        }
    }
}
