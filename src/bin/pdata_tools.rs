use std::ffi::OsStr;
use std::path::Path;
use std::process::exit;

use thinls::commands::*;

fn get_basename(path: &OsStr) -> &Path {
    let p = Path::new(path);
    match p.file_name() {
        Some(name) => Path::new(name),
        None => p,
    }
}

fn register_commands<'a>() -> Vec<Box<dyn Command<'a>>> {
    vec![Box::new(thin_ls::ThinLsCommand)]
}

fn usage(commands: &[Box<dyn Command>]) {
    eprintln!("Usage: <command> <args>");
    eprintln!("commands:");
    commands.iter().for_each(|c| eprintln!("  {}", c.name()));
}

fn main_() -> exitcode::ExitCode {
    let commands = register_commands();
    let mut args = std::env::args_os().peekable();

    args.next_if(|path| get_basename(path) == Path::new("pdata_tools"));
    let cmd = match args.peek() {
        Some(cmd) => cmd,
        None => {
            usage(&commands);
            return exitcode::USAGE;
        }
    };

    if let Some(c) = commands
        .iter()
        .find(|c| get_basename(cmd) == Path::new(c.name()))
    {
        c.run(&mut args)
    } else {
        eprintln!("unrecognised command");
        usage(&commands);
        exitcode::USAGE
    }
}

fn main() {
    exit(main_())
}
