use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

pub(crate) struct Options {
    /// Source files, in the order they were given.
    pub(crate) files: Vec<PathBuf>,
    /// Read one additional source from standard input under this name.
    pub(crate) stdin: Option<String>,
    pub(crate) dump_cst: bool,
    pub(crate) dump_ast: bool,
    pub(crate) color: bool,
}

pub(crate) fn arguments() -> Options {
    let matches = Command::new("wake")
        .about("Parse build-language sources and report their problems")
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .num_args(0..)
                .value_parser(clap::builder::ValueParser::path_buf())
                .help("Source files to process, merged by package"),
        )
        .arg(
            Arg::new("stdin")
                .long("stdin")
                .value_name("NAME")
                .help("Additionally read a source from standard input under the given file name"),
        )
        .arg(
            Arg::new("dump-cst")
                .long("dump-cst")
                .action(ArgAction::SetTrue)
                .help("Print the concrete syntax tree of each file"),
        )
        .arg(
            Arg::new("dump-ast")
                .long("dump-ast")
                .action(ArgAction::SetTrue)
                .help("Print the lowered packages"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .help("Disable colored diagnostics"),
        )
        .get_matches();

    Options {
        files: matches
            .get_many::<PathBuf>("files")
            .map(|files| files.cloned().collect())
            .unwrap_or_default(),
        stdin: matches.get_one::<String>("stdin").cloned(),
        dump_cst: matches.get_flag("dump-cst"),
        dump_ast: matches.get_flag("dump-ast"),
        color: !matches.get_flag("no-color"),
    }
}
