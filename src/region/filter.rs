use regex::Regex;

use super::RegionSet;

/// Non-owning view over a subset of a [`RegionSet`]'s regions, referenced by
/// id rather than by pointer. The `RegionSet` a filter list was built from
/// must outlive the filter list, which the borrow below enforces.
pub struct RegionFilterList<'a> {
    set: &'a RegionSet,
    ids: Vec<u64>,
}

impl<'a> RegionFilterList<'a> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &super::Region> + '_ {
        self.ids.iter().filter_map(move |id| self.set.find_by_id(*id))
    }
}

fn build<'a, F>(set: &'a RegionSet, invert: bool, mut matches: F) -> RegionFilterList<'a>
where
    F: FnMut(&super::Region) -> bool,
{
    let ids = set
        .iter()
        .filter(|r| matches(r) != invert)
        .map(|r| r.id)
        .collect();
    RegionFilterList { set, ids }
}

fn basename(pathname: &str) -> &str {
    pathname.rsplit('/').next().unwrap_or(pathname)
}

pub fn filter_pathname(set: &RegionSet, needle: &str) -> RegionFilterList<'_> {
    build(set, false, |r| r.pathname == needle)
}

pub fn filter_out_pathname(set: &RegionSet, needle: &str) -> RegionFilterList<'_> {
    build(set, true, |r| r.pathname == needle)
}

pub fn filter_basename(set: &RegionSet, needle: &str) -> RegionFilterList<'_> {
    build(set, false, |r| basename(&r.pathname) == needle)
}

pub fn filter_out_basename(set: &RegionSet, needle: &str) -> RegionFilterList<'_> {
    build(set, true, |r| basename(&r.pathname) == needle)
}

pub fn filter_regex(set: &RegionSet, pattern: &Regex) -> RegionFilterList<'_> {
    build(set, false, |r| pattern.is_match(&r.pathname))
}

pub fn filter_out_regex(set: &RegionSet, pattern: &Regex) -> RegionFilterList<'_> {
    build(set, true, |r| pattern.is_match(&r.pathname))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Permissions;

    fn sample_set() -> RegionSet {
        let mut set = RegionSet::new();
        set.insert(0x1000, 0x2000, Permissions::READ | Permissions::WRITE, "[heap]".into());
        set.insert(
            0x3000,
            0x4000,
            Permissions::READ | Permissions::WRITE,
            "/lib/libc.so.6".into(),
        );
        set.insert(0x5000, 0x6000, Permissions::READ | Permissions::WRITE, "".into());
        set
    }

    #[test]
    fn pathname_filter_is_exact() {
        let set = sample_set();
        let filtered = filter_pathname(&set, "[heap]");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.iter().next().unwrap().pathname, "[heap]");
    }

    #[test]
    fn basename_filter_strips_directory() {
        let set = sample_set();
        let filtered = filter_basename(&set, "libc.so.6");
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn inverted_filter_is_the_complement() {
        let set = sample_set();
        let filtered = filter_out_pathname(&set, "[heap]");
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn regex_filter_matches_pattern() {
        let set = sample_set();
        let re = Regex::new(r"^/lib/.*\.so(\.\d+)*$").unwrap();
        let filtered = filter_regex(&set, &re);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn empty_filter_yields_nothing() {
        let set = sample_set();
        let filtered = filter_pathname(&set, "/does/not/exist");
        assert!(filtered.is_empty());
        assert_eq!(filtered.iter().count(), 0);
    }
}
