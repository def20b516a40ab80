use clap::Args;
use serde::Serialize;
use uiaquery_script::decode_command;

use crate::OutputFormat;
use crate::util::{CliResult, read_argument};

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Wrapped command, or `@file` holding one command per line.
    #[arg(value_name = "COMMAND")]
    pub command: String,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct DecodedCommand {
    index: usize,
    script: String,
}

/// Unwrap base64 commands back into their readable scripts.
pub fn run(args: &DecodeArgs) -> CliResult<String> {
    let input = read_argument(&args.command)?;
    let decoded = input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| Ok(DecodedCommand { index: index + 1, script: decode_command(line)? }))
        .collect::<Result<Vec<_>, uiaquery_script::DecodeError>>()?;
    if decoded.is_empty() {
        return Err("no command to decode".into());
    }

    match args.format {
        OutputFormat::Text => Ok(render_text(&decoded)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&decoded)? + "\n"),
    }
}

fn render_text(decoded: &[DecodedCommand]) -> String {
    if let [single] = decoded {
        return ensure_newline(&single.script);
    }
    decoded.iter().map(|command| format!("# command {}\n{}", command.index, ensure_newline(&command.script))).collect()
}

fn ensure_newline(script: &str) -> String {
    if script.ends_with('\n') { script.to_owned() } else { format!("{script}\n") }
}
