use crate::CLAP_STYLING;
use clap::arg;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("pagesnap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("pagesnap")
        .styles(CLAP_STYLING)
        .about(
            "Captures a self-contained snapshot of a web page: markup, external and \
            inline stylesheets and scripts, and the page's CSS custom properties.",
        )
        .arg(arg!([URL]).required(false).help("The page to snapshot"))
        .arg(
            arg!(--"imports" <MODE>)
                .required(false)
                .help(
                    "How stylesheet @import directives are handled: inlined recursively, \
                    or kept in place with absolute targets",
                )
                .value_parser(["recursive", "flat"])
                .default_value("recursive"),
        )
        .arg(
            arg!(--"variables" <SCOPE>)
                .required(false)
                .help(
                    "Where CSS custom properties are collected from: ':root' blocks only, \
                    or every declaration in the collected CSS",
                )
                .value_parser(["root-only", "global"])
                .default_value("root-only"),
        )
        .arg(
            arg!(-d --"depth" <LEVELS>)
                .required(false)
                .help("Maximum @import recursion depth")
                .value_parser(clap::value_parser!(usize))
                .default_value("3"),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Write the snapshot to a file instead of stdout")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(arg!(--"pretty" "Pretty-print the JSON output").required(false))
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
}
