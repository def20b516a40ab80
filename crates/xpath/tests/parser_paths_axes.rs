use rstest::rstest;
use uiaquery_xpath::ast::{Axis, Expr, KindTest, NameTest, NodeTest, QName, WildcardName};
use uiaquery_xpath::parse;

fn steps(input: &str) -> (bool, Vec<uiaquery_xpath::Step>) {
    match parse(input).expect("parse failed") {
        Expr::LocationPath(path) => (path.absolute, path.steps),
        other => panic!("unexpected: {other:?}"),
    }
}

#[rstest]
#[case("child::Button", Axis::Child)]
#[case("Button", Axis::Child)]
#[case("descendant::Button", Axis::Descendant)]
#[case("descendant-or-self::Button", Axis::DescendantOrSelf)]
#[case("parent::Pane", Axis::Parent)]
#[case("ancestor::Window", Axis::Ancestor)]
#[case("ancestor-or-self::Window", Axis::AncestorOrSelf)]
#[case("following::Edit", Axis::Following)]
#[case("following-sibling::Edit", Axis::FollowingSibling)]
#[case("preceding::Edit", Axis::Preceding)]
#[case("preceding-sibling::Edit", Axis::PrecedingSibling)]
#[case("self::Edit", Axis::SelfAxis)]
#[case("attribute::Name", Axis::Attribute)]
#[case("@Name", Axis::Attribute)]
#[case("namespace::x", Axis::Namespace)]
fn axis_single_step(#[case] input: &str, #[case] axis: Axis) {
    let (absolute, steps) = steps(input);
    assert!(!absolute);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].axis, axis);
}

#[rstest]
#[case(".", Axis::SelfAxis)]
#[case("..", Axis::Parent)]
fn abbreviated_steps_expand_to_node_tests(#[case] input: &str, #[case] axis: Axis) {
    let (_, steps) = steps(input);
    assert_eq!(steps[0].axis, axis);
    assert_eq!(steps[0].test, NodeTest::Kind(KindTest::AnyKind));
}

#[rstest]
#[case("//Button", 2)]
#[case("Pane//Button", 3)]
#[case("//Pane//Button", 4)]
#[case("/Window", 1)]
#[case("/", 0)]
fn double_slash_inserts_descendant_or_self(#[case] input: &str, #[case] count: usize) {
    let (_, steps) = steps(input);
    assert_eq!(steps.len(), count);
}

#[rstest]
fn absolute_paths_are_flagged() {
    assert!(steps("/Window/Pane").0);
    assert!(steps("//Window").0);
    assert!(!steps("Window").0);
}

#[rstest]
#[case("*", NodeTest::Name(NameTest::Wildcard(WildcardName::Any)))]
#[case("uia:*", NodeTest::Name(NameTest::Wildcard(WildcardName::Prefix("uia".into()))))]
#[case("node()", NodeTest::Kind(KindTest::AnyKind))]
#[case("text()", NodeTest::Kind(KindTest::Text))]
#[case("comment()", NodeTest::Kind(KindTest::Comment))]
#[case("processing-instruction()", NodeTest::Kind(KindTest::ProcessingInstruction(None)))]
#[case(
    "processing-instruction('x')",
    NodeTest::Kind(KindTest::ProcessingInstruction(Some("x".into())))
)]
#[case("ListItem", NodeTest::Name(NameTest::QName(QName::local("ListItem"))))]
fn node_tests(#[case] input: &str, #[case] expected: NodeTest) {
    let (_, steps) = steps(input);
    assert_eq!(steps[0].test, expected);
}

#[rstest]
fn predicates_attach_to_their_step() {
    let (_, steps) = steps("//Window[@Name='Calc'][1]/Button");
    assert_eq!(steps[1].predicates.len(), 2);
    assert!(steps[2].predicates.is_empty());
}

#[rstest]
fn axis_names_are_valid_element_names() {
    let (_, steps) = steps("child/parent");
    assert_eq!(steps[0].test, NodeTest::Name(NameTest::QName(QName::local("child"))));
    assert_eq!(steps[1].axis, Axis::Child);
}
