//! Output Formatting

use serde::Serialize;

use crate::error::CliResult;

/// Print as pretty JSON on stdout
pub fn print_json<T: Serialize>(data: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}
