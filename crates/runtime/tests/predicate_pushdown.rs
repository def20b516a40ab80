use std::sync::Arc;

use rstest::rstest;
use uiaquery_runtime::{ErrorKind, RemoteSession, ReplayChannel, resolve_selector};
use uiaquery_script::{Condition, ControlType, ElementRef, Property, ScriptValue, TreeScope};

fn replay(channel: ReplayChannel) -> (Arc<ReplayChannel>, RemoteSession) {
    let channel = Arc::new(channel);
    let session = RemoteSession::new(channel.clone());
    (channel, session)
}

#[tokio::test]
async fn pushed_down_predicate_matches_a_hand_built_search() {
    let (channel, session) = replay(ReplayChannel::constant("5.6\n"));
    resolve_selector(&session, "//Window[@Name='Calc']", false, None, false).await.expect("found");

    let name = Condition::property_equals(Property::Name, ScriptValue::String("Calc".into())).expect("condition");
    let expected = ElementRef::Root
        .find_first(TreeScope::Descendants, Condition::control_type(ControlType::Window).and(name))
        .to_query();
    assert_eq!(channel.scripts(), vec![expected.script().to_owned()]);
}

#[rstest]
#[case("//Button[@IsEnabled=true()]", "[PropertyCondition]::new([AutomationElement]::IsEnabledProperty, $true)")]
#[case("//Button[@IsOffscreen='False']", "[PropertyCondition]::new([AutomationElement]::IsOffscreenProperty, $false)")]
#[case("//Button[@ProcessId=42]", "[PropertyCondition]::new([AutomationElement]::ProcessIdProperty, [int32]42)")]
#[case("//Button[@ProcessId='42']", "[PropertyCondition]::new([AutomationElement]::ProcessIdProperty, [int32]42)")]
#[case("//*[@RuntimeId='1.2.3']", "[PropertyCondition]::new([AutomationElement]::RuntimeIdProperty, [int32[]]@(1, 2, 3))")]
#[case("//Slider[@Orientation='Vertical']", "[OrientationType]::Vertical")]
#[case("//Button[@Name=concat('O', 'K')]", "[AutomationElement]::NameProperty, 'OK')")]
#[case("//Button['OK'=@Name]", "[AutomationElement]::NameProperty, 'OK')")]
#[case("//Button[@AutomationId=\"it's\"]", "[AutomationElement]::AutomationIdProperty, 'it''s')")]
#[case("//List", "[OrCondition]::new([PropertyCondition]::new([AutomationElement]::ControlTypeProperty, [ControlType]::List), [PropertyCondition]::new([AutomationElement]::ControlTypeProperty, [ControlType]::DataGrid))")]
#[case("//AppBar", "[AutomationElement]::LocalizedControlTypeProperty, 'app bar')")]
#[case("//Button[@Name='a' or @Name='b']", "[OrCondition]::new([PropertyCondition]::new([AutomationElement]::NameProperty, 'a')")]
#[case("//Button[@Name='a'][@AutomationId='b']", "[AndCondition]::new([AndCondition]::new(")]
#[tokio::test]
async fn pushdown_renders_native_conditions(#[case] selector: &str, #[case] fragment: &str) {
    let (channel, session) = replay(ReplayChannel::constant(""));
    resolve_selector(&session, selector, true, None, false).await.expect("resolve");
    assert_eq!(channel.call_count(), 1, "{selector}");
    let script = &channel.scripts()[0];
    assert!(script.contains(fragment), "{selector}: {script}");
}

#[tokio::test]
async fn wildcard_with_pushdown_uses_the_property_condition_alone() {
    let (channel, session) = replay(ReplayChannel::constant(""));
    resolve_selector(&session, "//*[@AutomationId='x']", true, None, false).await.expect("resolve");
    let script = &channel.scripts()[0];
    assert!(script.contains(
        "$condition = [PropertyCondition]::new([AutomationElement]::AutomationIdProperty, 'x')\n"
    ));
}

#[rstest]
#[case("//Button[@ProcessId='abc']")]
#[case("//Button[@IsEnabled='maybe']")]
#[case("//Button[@RuntimeId='1.x']")]
#[case("//Button[@Orientation='Diagonal']")]
#[case("//Window/Button[@ProcessId=concat('4', 'x')]")]
#[case("//Window/Button[@IsEnabled=substring('maybe', 1)]")]
#[case("//Window[Button[@ProcessId=1.5 + 1]]")]
#[case("(//Window)[1][@RuntimeId=concat('1.', 'y')]")]
#[tokio::test]
async fn unencodable_values_fail_before_any_round_trip(#[case] selector: &str) {
    let (channel, session) = replay(ReplayChannel::constant("1\n"));
    let err = resolve_selector(&session, selector, true, None, false).await.expect_err("encode error");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(channel.call_count(), 0);
}

/// Answers the search with two buttons and property reads by element.
fn two_buttons() -> ReplayChannel {
    ReplayChannel::new(|script| {
        Ok(if script.contains("-InputObject") {
            if script.contains("$elementTable['1.1']") { "[\"OK\"]\n" } else { "[\"Cancel\"]\n" }
        } else {
            "1.1\n1.2\n"
        }
        .to_owned())
    })
}

#[tokio::test]
async fn inequality_is_filtered_per_candidate() {
    let (channel, session) = replay(two_buttons());
    let resolution = resolve_selector(&session, "//Button[@Name!='OK']", true, None, false).await.expect("resolve");
    let ids: Vec<String> = resolution.into_vec().into_iter().map(|h| h.id.to_string()).collect();
    assert_eq!(ids, ["1.2"]);
    let scripts = channel.scripts();
    assert_eq!(scripts.len(), 3);
    assert!(!scripts[0].contains("NameProperty"));
}

#[tokio::test]
async fn residual_functions_see_each_candidate() {
    let (channel, session) = replay(two_buttons());
    let resolution =
        resolve_selector(&session, "//Button[starts-with(@Name, 'Can')]", false, None, false).await.expect("resolve");
    assert_eq!(resolution.into_vec()[0].id.as_str(), "1.2");
    assert_eq!(channel.call_count(), 3);
}
