use crate::CLAP_STYLING;
use clap::{arg, command};
use docgraph::handlers::DEFAULT_DB_PATH;

const FORMATS: [&str; 4] = ["auto", "html", "json", "traffic"];
const ESCAPES: [&str; 2] = ["quote-swap", "backslash"];

fn input_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-i --"input" <PATH_OR_URL>)
            .required(false)
            .help("A document file or an http(s) URL to read")
            .conflicts_with("inputs-file"),
    )
    .arg(
        arg!(-I --"inputs-file" <PATH>)
            .required(false)
            .help("Path to a newline-delimited list of files and URLs")
            .value_parser(clap::value_parser!(std::path::PathBuf))
            .conflicts_with("input"),
    )
    .arg(
        arg!(-f --"format" <FORMAT>)
            .required(false)
            .help("Document format: auto, html, json, traffic")
            .value_parser(FORMATS)
            .default_value("auto"),
    )
    .arg(
        arg!(--"escape" <POLICY>)
            .required(false)
            .help("How quotes inside text are made safe: quote-swap, backslash")
            .value_parser(ESCAPES)
            .default_value("quote-swap"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("docgraph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("docgraph")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress progress bars and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log library activity to stderr").required(false))
        .subcommand_required(true)
        .subcommand(
            command!("init")
                .about("Creates the graph database and installs its uniqueness constraints")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the graph database")
                        .default_value(DEFAULT_DB_PATH),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            input_args(command!("convert").about(
                "Convert documents to graph statements and print them, nodes first, then links",
            ))
            .arg(
                arg!(--"counter-ids")
                    .required(false)
                    .help("Use sequential identifiers instead of random UUIDs")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                arg!(-o --"output" <PATH>)
                    .required(false)
                    .help("Write statements to a file (default: stdout)")
                    .value_parser(clap::value_parser!(std::path::PathBuf)),
            ),
        )
        .subcommand(
            input_args(
                command!("ingest")
                    .about("Convert documents and write the resulting graph into the database"),
            )
            .arg(
                arg!(--"db" <PATH>)
                    .required(false)
                    .help("Location of the graph database")
                    .default_value(DEFAULT_DB_PATH),
            )
            .arg(
                arg!(-t --"threads" <NUM_WORKERS>)
                    .required(false)
                    .help("The number of ingestion workers, each with its own session.")
                    .value_parser(clap::value_parser!(usize))
                    .default_value("10"),
            )
            .arg(
                arg!(-r --"report-format" <FORMAT>)
                    .required(false)
                    .help("Report format: text, json")
                    .value_parser(["text", "json"])
                    .default_value("text"),
            )
            .arg(
                arg!(-o --"output" <PATH>)
                    .required(false)
                    .help("Save report to file (default: display to screen)")
                    .value_parser(clap::value_parser!(std::path::PathBuf)),
            ),
        )
        .subcommand(
            command!("stats")
                .about("Show node counts per label and link counts per type")
                .arg(
                    arg!(--"db" <PATH>)
                        .required(false)
                        .help("Location of the graph database")
                        .default_value(DEFAULT_DB_PATH),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}
