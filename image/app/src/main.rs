/*++

Licensed under the Apache-2.0 license.

File Name:

   main.rs

Abstract:

    Main entry point of the ACR blob imaging application

--*/
use std::path::PathBuf;

use clap::{arg, value_parser, Command};
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod create;
mod inspect;

/// Entry point
fn main() {
    let sub_cmds = vec![
        Command::new("create")
            .about("Create a new ACR non-WPR blob")
            .arg(
                arg!(--"config" <FILE> "Blob Configuration file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"out" <FILE> "Output blob file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"desc-out" <FILE> "Output ACR descriptor file")
                    .required(false)
                    .value_parser(value_parser!(PathBuf)),
            ),
        Command::new("inspect")
            .about("Decode a staged or post-run ACR blob")
            .arg(
                arg!(--"blob" <FILE> "Blob file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"desc" <FILE> "ACR descriptor file")
                    .required(false)
                    .value_parser(value_parser!(PathBuf)),
            ),
    ];

    let cmd = Command::new("acr-image")
        .arg_required_else_help(true)
        .arg(arg!(-v --verbose "Log every placement decision").global(true))
        .subcommands(sub_cmds)
        .about("ACR secure boot blob tools")
        .get_matches();

    let level = if cmd.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = SimpleLogger::new().with_level(level).init();

    let result = match cmd.subcommand() {
        Some(("create", args)) => create::run_cmd(args),
        Some(("inspect", args)) => inspect::run_cmd(args),
        _ => unreachable!(),
    };

    if let Err(err) = result {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
