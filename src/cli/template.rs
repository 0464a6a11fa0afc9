use crate::cli::write_or_print;
use crate::error::Result;
use crate::importer::generate_template;

pub fn run(output: Option<String>) -> Result<()> {
    write_or_print(&generate_template(), output.as_deref())
}
