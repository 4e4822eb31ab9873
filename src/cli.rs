use clap::{App, Arg, ArgMatches};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

// Exit codes for the compiler stages
pub const ERR_SYNTAX: i32 = 1;
pub const ERR_SEMANTIC: i32 = 2;
pub const ERR_CODEGEN: i32 = 3;
pub const ERR_USAGE: i32 = 4;

pub fn configure_cli() -> clap::App<'static, 'static> {
    let app = App::new("AKA Compiler")
        .version("0.1.0")
        .author("erich")
        .about("Compiles annotated AKA syntax trees into Jasmin assembly for the JVM")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true)
                .required(true)
                .help("Annotated syntax tree file (JSON) to compile"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .required(false)
                .help("Directory the object file is written to; defaults to the current directory"),
        )
        .arg(
            Arg::with_name("mode")
                .long("mode")
                .possible_values(&["compile", "convert", "execute"])
                .takes_value(true)
                .help("What to do with the tree. Only compile is supported; convert and execute are recognized but rejected."),
        )
        .arg(
            Arg::with_name("log-level")
                .long("log-level")
                .possible_values(&["trace", "debug", "info", "error"])
                .takes_value(true)
                .help("Enables logging at the given level"),
        );
    app
}

pub fn get_log_level(args: &ArgMatches) -> Option<LevelFilter> {
    args.value_of("log-level").map(|level| match level {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        _ => LevelFilter::Error,
    })
}

pub fn configure_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
}
