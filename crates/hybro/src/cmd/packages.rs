use crate::cmd::PackagesArgs;
use crate::demo;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{render_packages, OutputFormat};

pub fn run(_args: PackagesArgs, format: OutputFormat) -> CliResult<i32> {
    let modules = demo::demo().packages.describe();
    println!("{}", render_packages(&modules, format));
    Ok(SUCCESS)
}
