use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::runtime_id::RuntimeId;

const WRAP_PREFIX: &str =
    "(Invoke-Expression -Command ([System.Text.Encoding]::UTF8.GetString([System.Convert]::FromBase64String('";
const WRAP_SUFFIX: &str = "'))))";

/// Definitions every query relies on. Hosts that do not set up the element
/// table, the automation root and the cache request themselves run this once
/// per session.
pub const PRELUDE: &str = "using namespace System.Windows.Automation\n\
Add-Type -AssemblyName UIAutomationClient\n\
Add-Type -AssemblyName UIAutomationTypes\n\
$elementTable = @{}\n\
$rootElement = [AutomationElement]::RootElement\n\
$cacheRequest = [CacheRequest]::new()\n\
$cacheRequest.TreeFilter = [Automation]::ControlViewCondition\n\
$cacheRequest.Push()\n";

/// PowerShell text ready to be executed by the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    script: String,
}

impl Query {
    pub fn new(script: impl Into<String>) -> Self {
        Self { script: script.into() }
    }

    /// The readable script.
    pub fn script(&self) -> &str {
        &self.script
    }

    /// The script wrapped for the command channel; see [`encode_command`].
    pub fn to_command(&self) -> String {
        encode_command(&self.script)
    }
}

/// Wrap a script as a single base64 `Invoke-Expression` line, so quoting and
/// line breaks inside the script never interact with the host's input framing.
pub fn encode_command(script: &str) -> String {
    format!("{WRAP_PREFIX}{}{WRAP_SUFFIX}", STANDARD.encode(script.as_bytes()))
}

/// Reverse of [`encode_command`].
pub fn decode_command(command: &str) -> Result<String, DecodeError> {
    let payload = command
        .trim()
        .strip_prefix(WRAP_PREFIX)
        .and_then(|rest| rest.strip_suffix(WRAP_SUFFIX))
        .ok_or(DecodeError::NotWrapped)?;
    let bytes = STANDARD.decode(payload).map_err(|err| DecodeError::Base64(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| DecodeError::Base64(err.to_string()))
}

/// Split realized query output into runtime ids. Blank lines are skipped.
pub fn decode_ids(output: &str) -> Result<Vec<RuntimeId>, DecodeError> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| RuntimeId::parse(line).map_err(|_| DecodeError::Id(line.to_owned())))
        .collect()
}

/// Lines of a per-element text query, with trailing line breaks removed.
pub fn decode_lines(output: &str) -> Vec<String> {
    output.lines().map(|line| line.trim_end_matches('\r').to_owned()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Decode every rectangle of a [`rect_query`](crate::ElementRef::rect_query),
/// one per element.
///
/// Empty rectangles come back with infinite components, which are reported
/// as `i32::MAX`.
pub fn decode_rects(output: &str) -> Result<Vec<Rect>, DecodeError> {
    let max = i32::MAX.to_string();
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let normalized = line
                .replace("\"-Infinity\"", &format!("-{max}"))
                .replace("\"Infinity\"", &max)
                .replace("-Infinity", &format!("-{max}"))
                .replace("Infinity", &max);
            serde_json::from_str(&normalized).map_err(|err| DecodeError::Json(err.to_string()))
        })
        .collect()
}

/// The first rectangle of a [`rect_query`](crate::ElementRef::rect_query).
pub fn decode_rect(output: &str) -> Result<Option<Rect>, DecodeError> {
    Ok(decode_rects(output)?.into_iter().next())
}

/// Decode the JSON arrays of a
/// [`properties_query`](crate::ElementRef::properties_query), one row per element.
pub fn decode_property_rows(output: &str) -> Result<Vec<Vec<Option<String>>>, DecodeError> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(|err| DecodeError::Json(err.to_string())))
        .collect()
}

/// The first row of [`decode_property_rows`], empty when nothing came back.
pub fn decode_properties(output: &str) -> Result<Vec<Option<String>>, DecodeError> {
    Ok(decode_property_rows(output)?.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn command_wrapping_round_trips_scripts_with_quotes_and_newlines() {
        let script = "$a = 'it''s'\n\"two  spaces\"";
        let command = encode_command(script);
        assert!(command.starts_with("(Invoke-Expression -Command"));
        assert!(!command.contains('\n'));
        assert_eq!(decode_command(&command).as_deref(), Ok(script));
    }

    #[rstest]
    fn decode_rejects_plain_text() {
        assert_eq!(decode_command("Get-Process"), Err(DecodeError::NotWrapped));
    }

    #[rstest]
    #[case("12.34.56\n", vec!["12.34.56"])]
    #[case("1.1\r\n1.2\r\n\r\n", vec!["1.1", "1.2"])]
    #[case("", vec![])]
    fn decodes_id_lines(#[case] output: &str, #[case] expected: Vec<&str>) {
        let ids: Vec<String> = decode_ids(output).expect("ids").iter().map(ToString::to_string).collect();
        assert_eq!(ids, expected);
    }

    #[rstest]
    fn malformed_id_lines_are_reported() {
        assert_eq!(decode_ids("1.1\nWARNING: x\n"), Err(DecodeError::Id("WARNING: x".into())));
    }

    #[rstest]
    fn decodes_rectangles_with_infinite_components() {
        let rect = decode_rect("{\"x\":\"Infinity\",\"y\":-Infinity,\"width\":0,\"height\":0}\n")
            .expect("rect")
            .expect("some");
        assert!((rect.x - f64::from(i32::MAX)).abs() < f64::EPSILON);
        assert!((rect.y + f64::from(i32::MAX)).abs() < f64::EPSILON);

        let rect = decode_rect("{\"x\":10,\"y\":20.5,\"width\":300,\"height\":40}").expect("rect");
        assert_eq!(rect, Some(Rect { x: 10.0, y: 20.5, width: 300.0, height: 40.0 }));
        assert_eq!(decode_rect("").expect("empty"), None);
    }

    #[rstest]
    fn decodes_property_arrays() {
        let values = decode_properties("[\"Calc\",null,\"True\"]\n").expect("values");
        assert_eq!(values, vec![Some("Calc".into()), None, Some("True".into())]);
        assert_eq!(decode_properties("").expect("empty"), Vec::<Option<String>>::new());
    }

    #[rstest]
    fn decodes_one_row_per_element() {
        let rows = decode_property_rows("[\"a\"]\n\n[null]\n").expect("rows");
        assert_eq!(rows, vec![vec![Some("a".into())], vec![None]]);
        let rects = decode_rects("{\"x\":1,\"y\":2,\"width\":3,\"height\":4}\n{\"x\":5,\"y\":6,\"width\":7,\"height\":8}")
            .expect("rects");
        assert_eq!(rects.len(), 2);
        assert!((rects[1].x - 5.0).abs() < f64::EPSILON);
        assert!(decode_property_rows("not json").is_err());
    }
}
