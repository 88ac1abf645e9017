use std::process::exit;

use thinls::commands::thin_ls::ThinLsCommand;
use thinls::commands::Command;

fn main() {
    exit(ThinLsCommand.run(&mut std::env::args_os()))
}
