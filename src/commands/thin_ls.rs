extern crate clap;

use clap::{Arg, ArgAction};
use std::path::Path;

use crate::commands::engine::*;
use crate::commands::utils::*;
use crate::commands::Command;
use crate::thin::ls::*;

pub struct ThinLsCommand;

fn fields_help() -> String {
    let names: Vec<String> = ALL_FIELDS.iter().map(|f| f.to_string()).collect();
    format!(
        "Where <FIELDS> is a comma separated list from:\n  {}",
        names.join(", ")
    )
}

impl ThinLsCommand {
    fn cli(&self) -> clap::Command {
        clap::Command::new(self.name())
            .version(crate::tools_version!())
            .about("List thin volumes within a pool")
            .after_help(fields_help())
            .args_override_self(true)
            // flags
            .arg(
                Arg::new("METADATA_SNAPSHOT")
                    .help("Use metadata snapshot")
                    .short('m')
                    .long("metadata-snap")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("NO_HEADERS")
                    .help("Don't output headers")
                    .long("no-headers")
                    .action(ArgAction::SetTrue),
            )
            // options
            .arg(
                Arg::new("FORMAT")
                    .help("Give a comma separated list of fields to be output")
                    .short('o')
                    .long("format")
                    .value_name("FIELDS")
                    .value_delimiter(',')
                    .action(ArgAction::Set),
            )
            // arguments
            .arg(
                Arg::new("INPUT")
                    .help("Specify the input device")
                    .index(1),
            )
    }
}

impl<'a> Command<'a> for ThinLsCommand {
    fn name(&self) -> &'a str {
        "thin_ls"
    }

    fn run(&self, args: &mut dyn Iterator<Item = std::ffi::OsString>) -> exitcode::ExitCode {
        let matches = self.cli().get_matches_from(args);
        let report = mk_report(false);

        // selectors are checked before the input is even looked at
        let fields = match matches.get_many::<String>("FORMAT") {
            Some(names) => match parse_fields(&names.collect::<Vec<_>>()) {
                Ok(fields) => fields,
                Err(e) => return to_exit_code::<()>(&report, Err(e.into())),
            },
            None => DEFAULT_FIELDS.to_vec(),
        };

        let input_file = match matches.get_one::<String>("INPUT") {
            Some(input) => Path::new(input),
            None => return to_exit_code::<()>(&report, Err(LsError::MissingInput.into())),
        };

        if let Err(e) = check_input_file(input_file).and_then(check_file_not_tiny) {
            return to_exit_code::<()>(&report, Err(e));
        }

        let opts = ThinLsOptions {
            input: input_file,
            engine_opts: parse_engine_opts(&matches),
            fields,
            no_headers: matches.get_flag("NO_HEADERS"),
            report: report.clone(),
        };

        to_exit_code(&report, ls(opts))
    }
}
