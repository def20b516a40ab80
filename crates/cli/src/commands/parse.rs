use clap::Args;
use uiaquery_xpath::parse;

use crate::util::CliResult;

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    #[arg(value_name = "XPATH")]
    pub expression: String,
}

/// Parse a selector and render its expression tree.
pub fn run(args: &ParseArgs) -> CliResult<String> {
    match parse(&args.expression) {
        Ok(expr) => Ok(format!("{expr:#?}\n")),
        Err(err) => {
            let mut message = format!("invalid selector: {}", err.message);
            if let Some(position) = err.position {
                message.push_str(&format!("\n  {}\n  {}^", args.expression, " ".repeat(position)));
            }
            Err(message.into())
        }
    }
}
