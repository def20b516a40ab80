use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use uiaquery_runtime::{RemoteSession, ReplayChannel, Resolution, SessionConfig, resolve_selector};

use crate::OutputFormat;
use crate::util::{CliResult, read_argument};

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[arg(value_name = "XPATH")]
    pub expression: String,
    /// Host output for the next round trip, inline or as `@file`. Repeat for
    /// later round trips; once exhausted the host answers with nothing.
    #[arg(long = "response", value_name = "OUTPUT")]
    pub responses: Vec<String>,
    /// Resolve every match instead of the first.
    #[arg(long = "all")]
    pub all: bool,
    /// Runtime id of the element relative paths start from.
    #[arg(long = "context", value_name = "ID")]
    pub context: Option<String>,
    /// Let `//` from the context element match the element itself.
    #[arg(long = "include-context")]
    pub include_context: bool,
    #[arg(long = "timeout-ms", value_name = "MILLIS")]
    pub timeout_ms: Option<u64>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlanSummary {
    calls: Vec<PlannedCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Resolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<PlanFailure>,
}

#[derive(Debug, Serialize)]
struct PlannedCall {
    index: usize,
    script: String,
}

#[derive(Debug, Serialize)]
struct PlanFailure {
    kind: &'static str,
    message: String,
}

/// Compile a selector against canned host output and report every remote
/// script it produced. Query failures are part of the report, not an error
/// of the command.
pub fn run(config: &SessionConfig, args: &PlanArgs) -> CliResult<String> {
    let summary = plan(config, args)?;
    match args.format {
        OutputFormat::Text => Ok(render_plan_text(&summary)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&summary)? + "\n"),
    }
}

pub(crate) fn plan(config: &SessionConfig, args: &PlanArgs) -> CliResult<PlanSummary> {
    let responses = args.responses.iter().map(|response| read_argument(response)).collect::<CliResult<Vec<_>>>()?;
    let mut config = config.clone();
    if let Some(timeout_ms) = args.timeout_ms {
        config = config.with_command_timeout(Duration::from_millis(timeout_ms));
    }
    let include_context = args.include_context || config.include_context_element_in_search;

    let channel = Arc::new(ReplayChannel::sequence(responses));
    let session = RemoteSession::with_config(channel.clone(), config);
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    let outcome = runtime.block_on(resolve_selector(
        &session,
        &args.expression,
        args.all,
        args.context.as_deref(),
        include_context,
    ));
    tracing::debug!(round_trips = session.round_trips(), ok = outcome.is_ok(), "plan finished");

    let calls = channel
        .scripts()
        .into_iter()
        .enumerate()
        .map(|(index, script)| PlannedCall { index: index + 1, script })
        .collect();
    let (result, error) = match outcome {
        Ok(resolution) => (Some(resolution), None),
        Err(err) => (None, Some(PlanFailure { kind: err.kind().as_str(), message: err.to_string() })),
    };
    Ok(PlanSummary { calls, result, error })
}

fn colorize_heading(label: &str) -> String {
    label.if_supports_color(Stream::Stdout, |text| text.bold().fg_rgb::<79, 166, 255>().to_string()).to_string()
}

fn colorize_id(id: &str) -> String {
    id.if_supports_color(Stream::Stdout, |text| text.fg_rgb::<136, 192, 74>().to_string()).to_string()
}

fn colorize_failure(message: &str) -> String {
    message.if_supports_color(Stream::Stdout, |text| text.red().to_string()).to_string()
}

pub(crate) fn render_plan_text(summary: &PlanSummary) -> String {
    let mut output = String::new();
    for call in &summary.calls {
        let _ = writeln!(output, "{}", colorize_heading(&format!("# round trip {}", call.index)));
        let _ = write!(output, "{}", call.script);
        if !call.script.ends_with('\n') {
            output.push('\n');
        }
    }
    if summary.calls.is_empty() {
        let _ = writeln!(output, "{}", colorize_heading("# no round trips"));
    }

    if let Some(error) = &summary.error {
        let _ = writeln!(output, "{}", colorize_failure(&format!("error ({}): {}", error.kind, error.message)));
    }
    if let Some(result) = &summary.result {
        match result {
            Resolution::One(handle) => {
                let _ = writeln!(output, "element {}", colorize_id(handle.id.as_str()));
            }
            Resolution::Many(handles) if handles.is_empty() => output.push_str("no elements\n"),
            Resolution::Many(handles) => {
                for handle in handles {
                    let _ = writeln!(output, "element {}", colorize_id(handle.id.as_str()));
                }
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Drop SGR escape sequences (`ESC [ ... m`) so assertions see plain text.
    fn strip_ansi(input: &str) -> String {
        let mut plain = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find('\u{1b}') {
            plain.push_str(&rest[..start]);
            rest = rest[start..].find('m').map_or("", |end| &rest[start + end + 1..]);
        }
        plain.push_str(rest);
        plain
    }

    #[rstest]
    fn strip_ansi_keeps_plain_text() {
        assert_eq!(strip_ansi("\u{1b}[1;38;2;79;166;255m# round trip 1\u{1b}[0m\n"), "# round trip 1\n");
        assert_eq!(strip_ansi("no escapes"), "no escapes");
    }

    fn args(expression: &str, responses: &[&str]) -> PlanArgs {
        PlanArgs {
            expression: expression.to_owned(),
            responses: responses.iter().map(|&response| response.to_owned()).collect(),
            all: false,
            context: None,
            include_context: false,
            timeout_ms: None,
            format: OutputFormat::Text,
        }
    }

    #[rstest]
    fn text_lists_the_script_and_the_element() {
        let output = run(&SessionConfig::default(), &args("//Window[@Name='Notepad']", &["12.34.56\n"]))
            .expect("plan");
        let output = strip_ansi(&output);
        assert!(output.starts_with("# round trip 1\n"));
        assert!(output.contains("[PropertyCondition]::new([AutomationElement]::NameProperty, 'Notepad')"));
        assert!(output.ends_with("element 12.34.56\n"));
    }

    #[rstest]
    fn query_failures_are_reported() {
        let output = run(&SessionConfig::default(), &args("//Window", &[])).expect("plan");
        assert!(strip_ansi(&output).contains("error (no such element)"));

        let output = run(&SessionConfig::default(), &args("//foo[", &[])).expect("plan");
        let output = strip_ansi(&output);
        assert!(output.starts_with("# no round trips\n"));
        assert!(output.contains("error (invalid selector)"));
    }

    #[rstest]
    fn json_carries_calls_and_result() {
        let mut plan_args = args("(//Button)[2]", &["1.1\n1.2\n1.3\n"]);
        plan_args.all = true;
        plan_args.format = OutputFormat::Json;
        let output = run(&SessionConfig::default(), &plan_args).expect("plan");
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value["result"], serde_json::json!([{ "element-6066-11e4-a6c6-4dc7cdd8e8a5": "1.2" }]));
        assert_eq!(value["calls"][0]["index"], 1);
        assert!(value.get("error").is_none());
    }

    #[rstest]
    fn empty_results_are_reported_as_such() {
        let mut plan_args = args("//Button", &[]);
        plan_args.all = true;
        let output = run(&SessionConfig::default(), &plan_args).expect("plan");
        let output = strip_ansi(&output);
        assert!(output.starts_with("# round trip 1\n"));
        assert!(output.ends_with("no elements\n"));
    }

    #[rstest]
    #[case(false, "[TreeScope]::Descendants")]
    #[case(true, "[TreeScope]::Subtree")]
    fn include_context_flag_widens_the_search(#[case] include: bool, #[case] scope: &str) {
        let mut plan_args = args(".//Button", &[]);
        plan_args.context = Some("4.2".to_owned());
        plan_args.include_context = include;
        plan_args.all = true;
        let summary = plan(&SessionConfig::default(), &plan_args).expect("plan");
        assert!(summary.calls[0].script.contains(scope));
    }

    #[rstest]
    fn configured_default_includes_the_context() {
        let mut plan_args = args(".//Button", &[]);
        plan_args.context = Some("4.2".to_owned());
        plan_args.all = true;
        let config = SessionConfig::default().with_include_context_element_in_search(true);
        let summary = plan(&config, &plan_args).expect("plan");
        assert!(summary.calls[0].script.contains("[TreeScope]::Subtree"));
    }
}
