use serde::Serialize;

use super::EngineCommand;
use crate::error::EngineResult;
use crate::region::maps;

pub struct DiscoverCommand {
    pid: i32,
}

impl DiscoverCommand {
    pub fn new(pid: i32) -> DiscoverCommand {
        DiscoverCommand { pid }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegionRow {
    id: u64,
    start: u64,
    end: u64,
    read: bool,
    write: bool,
    exec: bool,
    pathname: String,
}

impl EngineCommand for DiscoverCommand {
    fn run(&mut self) -> EngineResult<()> {
        let set = maps::discover(self.pid)?;
        let rows: Vec<RegionRow> = set
            .iter()
            .map(|r| RegionRow {
                id: r.id,
                start: r.start,
                end: r.end,
                read: r.perms.contains(crate::region::Permissions::READ),
                write: r.perms.contains(crate::region::Permissions::WRITE),
                exec: r.perms.contains(crate::region::Permissions::EXEC),
                pathname: r.pathname.clone(),
            })
            .collect();

        let serialized = serde_json::to_string_pretty(&rows).unwrap();
        println!("{}", serialized);
        Ok(())
    }
}
