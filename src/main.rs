use structopt::StructOpt;

use memtrace::commands::cli_options::{MemtraceOptions, MemtraceSubCommand};
use memtrace::commands::discover_command::DiscoverCommand;
use memtrace::commands::filter_command::FilterCommand;
use memtrace::commands::poke_command::PokeCommand;
use memtrace::commands::search_command::SearchCommand;
use memtrace::commands::EngineCommand;

fn main() {
    env_logger::init();

    let options = MemtraceOptions::from_args();

    let result = match options.cmd {
        MemtraceSubCommand::Discover { pid } => DiscoverCommand::new(pid).run(),
        MemtraceSubCommand::Search {
            pid,
            op,
            needle,
            unaligned,
        } => SearchCommand::new(pid, op, needle, !unaligned).run(),
        MemtraceSubCommand::Filter {
            pid,
            op,
            needle,
            addrs,
        } => FilterCommand::new(pid, op, needle, addrs).run(),
        MemtraceSubCommand::Poke { pid, addr, value } => PokeCommand::new(pid, addr, value).run(),
    };

    if let Err(err) = result {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
