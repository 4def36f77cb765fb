use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "memtrace", about = "attach, scan and patch a running process")]
pub struct MemtraceOptions {
    #[structopt(subcommand)]
    pub cmd: MemtraceSubCommand,
}

#[derive(StructOpt, Debug, Clone)]
pub enum MemtraceSubCommand {
    /// List the writable regions of a process.
    Discover {
        pid: i32,
    },
    /// Search writable regions for an initial needle value.
    Search {
        pid: i32,
        op: String,
        needle: String,
        #[structopt(long)]
        unaligned: bool,
    },
    /// Re-check every address printed by a previous `search`/`filter`.
    Filter {
        pid: i32,
        op: String,
        needle: String,
        #[structopt(long)]
        addrs: Vec<u64>,
    },
    /// Write a raw 8-byte word at an address via ptrace.
    Poke {
        pid: i32,
        #[structopt(parse(try_from_str = parse_hex_or_dec))]
        addr: u64,
        value: u64,
    },
}

fn parse_hex_or_dec(s: &str) -> Result<u64, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}
