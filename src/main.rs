//! itemforge - Command-line tool for rendering Minecraft-style item images

use std::process::ExitCode;

use itemforge::cli;

fn main() -> ExitCode {
    cli::run()
}
