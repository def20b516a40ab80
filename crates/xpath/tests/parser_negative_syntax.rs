use rstest::rstest;
use uiaquery_xpath::parse;

#[rstest]
#[case("")]
#[case("//foo[")]
#[case("//")]
#[case("@")]
#[case("child::")]
#[case("1 +")]
#[case("(")]
#[case("//Button[@Name='x'")]
#[case("'unterminated")]
#[case("$var")]
#[case("//Button]")]
#[case("concat('a',)")]
fn malformed_selectors_fail(#[case] input: &str) {
    let err = parse(input).expect_err("expected parse error");
    assert_eq!(err.input, input);
    assert!(!err.message.is_empty());
}
