//! Lowering of the expression tree into an evaluation plan.
//!
//! Everything that can be decided without the remote host is decided here,
//! before the first round trip: function names and arities, the
//! classification of every step predicate, `//` canonicalization and whether
//! a final step only needs its first match.

use tracing::trace;
use uiaquery_script::{FindMode, Property};
use uiaquery_xpath::ast::{BinaryOp, ComparisonOp, Literal};
use uiaquery_xpath::{Axis, Expr, KindTest, NameTest, NodeTest, Step};

use crate::error::QueryError;
use crate::functions::Function;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Plan {
    String(String),
    Number(f64),
    Binary { op: BinaryOp, left: Box<Plan>, right: Box<Plan> },
    Comparison { op: ComparisonOp, left: Box<Plan>, right: Box<Plan> },
    Negate(Box<Plan>),
    Union(Box<Plan>, Box<Plan>),
    LocationPath { absolute: bool, steps: Vec<StepPlan> },
    Path { filter: Box<Plan>, steps: Vec<StepPlan> },
    /// A self step carrying the filter's predicates, applied to all element
    /// results of `primary` at once.
    Filter { primary: Box<Plan>, step: Box<StepPlan> },
    Call { function: Function, args: Vec<Plan> },
}

/// One location step with its predicates sorted by how they are evaluated.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StepPlan {
    pub axis: Axis,
    pub test: NodeTest,
    /// Folded into the native search condition.
    pub pushdown: Vec<Pushdown>,
    pub positions: Vec<PositionSpec>,
    /// Evaluated locally per candidate, in predicate order.
    pub residual: Vec<Plan>,
    pub mode: FindMode,
}

impl StepPlan {
    fn new(axis: Axis, test: NodeTest) -> Self {
        Self { axis, test, pushdown: Vec::new(), positions: Vec::new(), residual: Vec::new(), mode: FindMode::All }
    }

    /// Steps without positions or residual predicates run in one remote call
    /// for the whole context; the others run once per context element.
    pub(crate) fn is_per_context(&self) -> bool {
        !self.positions.is_empty() || !self.residual.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pushdown {
    /// `@property = value`; `value` needs no element to evaluate.
    Equals { property: Property, value: Plan },
    And(Box<Pushdown>, Box<Pushdown>),
    Or(Box<Pushdown>, Box<Pushdown>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PositionSpec {
    /// 1-based; evaluates without elements.
    Index(Plan),
    Last,
}

#[derive(Debug)]
enum Predicate {
    Position(PositionSpec),
    Pushdown(Pushdown),
    Residual(Plan),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LowerOptions {
    pub want_all: bool,
    pub include_context_element_in_search: bool,
}

pub(crate) fn lower(expr: &Expr, options: LowerOptions) -> Result<Plan, QueryError> {
    let mut plan = Lowering { options }.expr(expr)?;
    if !options.want_all {
        mark_find_first(&mut plan);
    }
    Ok(plan)
}

struct Lowering {
    options: LowerOptions,
}

impl Lowering {
    fn expr(&self, expr: &Expr) -> Result<Plan, QueryError> {
        Ok(match expr {
            Expr::Literal(Literal::String(text)) => Plan::String(text.clone()),
            Expr::Literal(Literal::Number(number)) => Plan::Number(*number),
            Expr::FunctionCall { name, args } => {
                let function = Function::resolve(name)
                    .ok_or_else(|| QueryError::InvalidSelector(format!("XPath function {name}() not found.")))?;
                function.check_arity(args.len())?;
                Plan::Call { function, args: self.exprs(args)? }
            }
            Expr::Binary { left, op, right } => {
                Plan::Binary { op: *op, left: Box::new(self.expr(left)?), right: Box::new(self.expr(right)?) }
            }
            Expr::Comparison { left, op, right } => {
                Plan::Comparison { op: *op, left: Box::new(self.expr(left)?), right: Box::new(self.expr(right)?) }
            }
            Expr::Negate(inner) => Plan::Negate(Box::new(self.expr(inner)?)),
            Expr::Union { left, right } => Plan::Union(Box::new(self.expr(left)?), Box::new(self.expr(right)?)),
            Expr::LocationPath(path) => {
                let mut steps = path.steps.clone();
                if path.absolute
                    && let Some(first) = steps.first_mut()
                    && first.axis == Axis::Child
                {
                    first.axis = Axis::SelfAxis;
                }
                Plan::LocationPath { absolute: path.absolute, steps: self.steps(&steps)? }
            }
            Expr::Path { filter, steps } => Plan::Path { filter: Box::new(self.expr(filter)?), steps: self.steps(steps)? },
            Expr::Filter { primary, predicates } => {
                let step = Step::new(Axis::SelfAxis, NodeTest::Kind(KindTest::AnyKind)).with_predicates(predicates.clone());
                Plan::Filter { primary: Box::new(self.expr(primary)?), step: Box::new(self.step(&step)?) }
            }
        })
    }

    fn exprs(&self, exprs: &[Expr]) -> Result<Vec<Plan>, QueryError> {
        exprs.iter().map(|expr| self.expr(expr)).collect()
    }

    fn steps(&self, steps: &[Step]) -> Result<Vec<StepPlan>, QueryError> {
        collapse_double_slash(steps, self.options.include_context_element_in_search)
            .iter()
            .map(|step| self.step(step))
            .collect()
    }

    fn step(&self, step: &Step) -> Result<StepPlan, QueryError> {
        if step.axis == Axis::Attribute && !step.predicates.is_empty() {
            return Err(QueryError::InvalidSelector("predicates on attribute steps are not supported".to_owned()));
        }
        let mut plan = StepPlan::new(step.axis, step.test.clone());
        for predicate in &step.predicates {
            match self.classify_predicate(predicate)? {
                Predicate::Position(position) => plan.positions.push(position),
                Predicate::Pushdown(pushdown) => plan.pushdown.push(pushdown),
                Predicate::Residual(residual) => plan.residual.push(residual),
            }
        }
        Ok(plan)
    }

    fn classify_predicate(&self, predicate: &Expr) -> Result<Predicate, QueryError> {
        if is_call(predicate, "last") {
            return Ok(Predicate::Position(PositionSpec::Last));
        }
        if let Expr::Comparison { left, op: ComparisonOp::Eq, right } = predicate {
            for (position, other) in [(left, right), (right, left)] {
                if !is_call(position, "position") {
                    continue;
                }
                if is_call(other, "last") {
                    return Ok(Predicate::Position(PositionSpec::Last));
                }
                if is_element_free(other) {
                    return Ok(Predicate::Position(PositionSpec::Index(self.expr(other)?)));
                }
            }
        }
        if is_numeric(predicate) && is_element_free(predicate) {
            return Ok(Predicate::Position(PositionSpec::Index(self.expr(predicate)?)));
        }
        if let Some(pushdown) = self.pushdown(predicate)? {
            trace!(?pushdown, "predicate folded into search condition");
            return Ok(Predicate::Pushdown(pushdown));
        }
        Ok(Predicate::Residual(self.expr(predicate)?))
    }

    /// `@property = value` with an allow-listed property and an element-free
    /// value, or `and`/`or` of two such predicates.
    fn pushdown(&self, predicate: &Expr) -> Result<Option<Pushdown>, QueryError> {
        match predicate {
            Expr::Comparison { left, op: ComparisonOp::Eq, right } => {
                let operands = match (pushdown_property(left), pushdown_property(right)) {
                    (Some(property), None) if is_element_free(right) => Some((property, right)),
                    (None, Some(property)) if is_element_free(left) => Some((property, left)),
                    _ => None,
                };
                let Some((property, value)) = operands else {
                    return Ok(None);
                };
                let value = self.expr(value)?;
                check_literal(property, &value)?;
                Ok(Some(Pushdown::Equals { property, value }))
            }
            Expr::Binary { left, op: op @ (BinaryOp::And | BinaryOp::Or), right } => {
                let (Some(left), Some(right)) = (self.pushdown(left)?, self.pushdown(right)?) else {
                    return Ok(None);
                };
                let (left, right) = (Box::new(left), Box::new(right));
                Ok(Some(if *op == BinaryOp::And { Pushdown::And(left, right) } else { Pushdown::Or(left, right) }))
            }
            _ => Ok(None),
        }
    }
}

/// Literal operands are encoded up front so a bad literal fails before the
/// first round trip.
fn check_literal(property: Property, value: &Plan) -> Result<(), QueryError> {
    match value {
        Plan::String(text) => property.encode_str(text).map(drop)?,
        Plan::Number(number) => property.encode_number(*number).map(drop)?,
        _ => {}
    }
    Ok(())
}

fn is_call(expr: &Expr, function: &str) -> bool {
    matches!(expr, Expr::FunctionCall { name, args } if name.prefix.is_none() && name.local == function && args.is_empty())
}

/// A single-step, unprefixed `@Name` reference to a property that native
/// search conditions support.
fn pushdown_property(expr: &Expr) -> Option<Property> {
    let Expr::LocationPath(path) = expr else {
        return None;
    };
    let [step] = path.steps.as_slice() else {
        return None;
    };
    if path.absolute || step.axis != Axis::Attribute || !step.predicates.is_empty() {
        return None;
    }
    let NodeTest::Name(NameTest::QName(name)) = &step.test else {
        return None;
    };
    if name.prefix.is_some() {
        return None;
    }
    Property::from_name(&name.local).filter(|property| property.is_pushdown_eligible())
}

/// Evaluable without any element, context or position: literals and pure
/// functions over them.
fn is_element_free(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => true,
        Expr::Binary { left, right, .. } | Expr::Comparison { left, right, .. } => {
            is_element_free(left) && is_element_free(right)
        }
        Expr::Negate(inner) => is_element_free(inner),
        Expr::FunctionCall { name, args } => {
            Function::resolve(name).is_some_and(|function| function.is_context_free(args.len()))
                && args.iter().all(is_element_free)
        }
        Expr::Union { .. } | Expr::LocationPath(_) | Expr::Path { .. } | Expr::Filter { .. } => false,
    }
}

fn is_numeric(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(Literal::Number(_)) | Expr::Negate(_) => true,
        Expr::Binary { op, .. } => !matches!(op, BinaryOp::And | BinaryOp::Or),
        Expr::FunctionCall { name, .. } => Function::resolve(name).is_some_and(Function::returns_number),
        _ => false,
    }
}

/// Whether a predicate's result depends on the candidate's position: it is
/// numeric, or it calls `position()`/`last()` outside nested steps.
fn is_positional(predicate: &Expr) -> bool {
    fn mentions_position(expr: &Expr) -> bool {
        match expr {
            Expr::FunctionCall { args, .. } => {
                is_call(expr, "position") || is_call(expr, "last") || args.iter().any(mentions_position)
            }
            Expr::Binary { left, right, .. } | Expr::Comparison { left, right, .. } | Expr::Union { left, right } => {
                mentions_position(left) || mentions_position(right)
            }
            Expr::Negate(inner) => mentions_position(inner),
            Expr::Path { filter, .. } => mentions_position(filter),
            Expr::Filter { primary, .. } => mentions_position(primary),
            Expr::Literal(_) | Expr::LocationPath(_) => false,
        }
    }
    is_numeric(predicate) || mentions_position(predicate)
}

fn is_bare_descendant_or_self(step: &Step) -> bool {
    step.axis == Axis::DescendantOrSelf
        && step.test == NodeTest::Kind(KindTest::AnyKind)
        && step.predicates.is_empty()
}

/// Rewrite `descendant-or-self::node()/child::X` pairs into one descendant
/// search. When `X` has a positional predicate, positions must count per
/// parent, so the pair becomes `descendant::X/parent::node()/child::X[...]`.
fn collapse_double_slash(steps: &[Step], include_context: bool) -> Vec<Step> {
    let mut out = Vec::with_capacity(steps.len());
    let mut index = 0;
    while index < steps.len() {
        let step = &steps[index];
        if is_bare_descendant_or_self(step)
            && let Some(next) = steps.get(index + 1)
            && next.axis == Axis::Child
        {
            if next.predicates.iter().any(is_positional) {
                let axis = if include_context { Axis::DescendantOrSelf } else { Axis::Descendant };
                trace!(test = ?next.test, axis = axis.as_str(), "positional predicate after //; searching per parent");
                out.push(Step::new(axis, next.test.clone()));
                out.push(Step::new(Axis::Parent, NodeTest::Kind(KindTest::AnyKind)));
                out.push(next.clone());
            } else {
                let axis = if include_context { Axis::DescendantOrSelf } else { Axis::Descendant };
                trace!(test = ?next.test, axis = axis.as_str(), "collapsed // into one search");
                out.push(Step { axis, test: next.test.clone(), predicates: next.predicates.clone() });
            }
            index += 2;
            continue;
        }
        out.push(step.clone());
        index += 1;
    }
    out
}

fn mark_find_first(plan: &mut Plan) {
    match plan {
        Plan::Union(left, right) => {
            mark_find_first(left);
            mark_find_first(right);
        }
        Plan::LocationPath { steps, .. } | Plan::Path { steps, .. } => {
            if let Some(last) = steps.last_mut()
                && !last.is_per_context()
                && !matches!(last.axis, Axis::Attribute | Axis::Namespace)
            {
                trace!(axis = last.axis.as_str(), "final step needs only its first match");
                last.mode = FindMode::First;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uiaquery_xpath::{QName, parse};

    fn lower_str(selector: &str, want_all: bool) -> Plan {
        let expr = parse(selector).expect("parse");
        lower(&expr, LowerOptions { want_all, include_context_element_in_search: false }).expect("lower")
    }

    fn steps(plan: &Plan) -> &[StepPlan] {
        match plan {
            Plan::LocationPath { steps, .. } | Plan::Path { steps, .. } => steps,
            other => panic!("not a path: {other:?}"),
        }
    }

    fn name_test(name: &str) -> NodeTest {
        NodeTest::Name(NameTest::QName(QName::local(name)))
    }

    #[rstest]
    fn double_slash_collapses_into_a_descendant_search() {
        let plan = lower_str("//Button", true);
        let [step] = steps(&plan) else { panic!("one step expected: {plan:?}") };
        assert_eq!(step.axis, Axis::Descendant);
        assert_eq!(step.test, name_test("Button"));
        assert_eq!(plan, lower_str("descendant-or-self::node()/child::Button", true).with_absolute(true));
    }

    #[rstest]
    fn double_slash_includes_the_context_when_asked() {
        let expr = parse(".//Button").expect("parse");
        let plan = lower(&expr, LowerOptions { want_all: true, include_context_element_in_search: true }).expect("lower");
        let axes: Vec<Axis> = steps(&plan).iter().map(|s| s.axis).collect();
        assert_eq!(axes, [Axis::SelfAxis, Axis::DescendantOrSelf]);
    }

    #[rstest]
    fn positional_double_slash_includes_the_context_when_asked() {
        let expr = parse(".//Button[1]").expect("parse");
        let plan = lower(&expr, LowerOptions { want_all: true, include_context_element_in_search: true }).expect("lower");
        let axes: Vec<Axis> = steps(&plan).iter().map(|s| s.axis).collect();
        assert_eq!(axes, [Axis::SelfAxis, Axis::DescendantOrSelf, Axis::Parent, Axis::Child]);
        assert_eq!(steps(&plan)[3].positions.len(), 1);
    }

    #[rstest]
    #[case("//Button[position()=2]")]
    #[case("//Button[2]")]
    #[case("//Button[last()]")]
    #[case("//Button[position() > 1]")]
    fn positional_predicates_keep_per_parent_positions(#[case] selector: &str) {
        let plan = lower_str(selector, true);
        let axes: Vec<Axis> = steps(&plan).iter().map(|s| s.axis).collect();
        assert_eq!(axes, [Axis::Descendant, Axis::Parent, Axis::Child]);
        assert!(steps(&plan)[0].positions.is_empty() && steps(&plan)[0].residual.is_empty());
    }

    #[rstest]
    fn pushes_allow_listed_equality_into_the_condition() {
        let plan = lower_str("//Window[@Name='Calc']", true);
        let step = &steps(&plan)[0];
        assert_eq!(step.pushdown, vec![Pushdown::Equals { property: Property::Name, value: Plan::String("Calc".into()) }]);
        assert!(step.residual.is_empty() && step.positions.is_empty());
    }

    #[rstest]
    fn combines_pushdowns_with_and_or() {
        let plan = lower_str("//Button[@Name='OK' and (@AutomationId='ok' or 'cancel'=@AutomationId)]", true);
        let step = &steps(&plan)[0];
        assert!(matches!(&step.pushdown[..], [Pushdown::And(_, right)] if matches!(**right, Pushdown::Or(_, _))));
    }

    #[rstest]
    #[case("//Button[@Name!='OK']")]
    #[case("//Button[@ProcessId > 4]")]
    #[case("//Button[@BoundingRectangle='1,2,3,4']")]
    #[case("//Button[@Name='OK' and contains(@AutomationId, 'x')]")]
    #[case("//Button[@Name=@AutomationId]")]
    #[case("//Button[@Name=name()]")]
    #[case("//Button[@x='4']")]
    fn other_predicates_stay_residual(#[case] selector: &str) {
        let plan = lower_str(selector, true);
        let step = &steps(&plan)[0];
        assert!(step.pushdown.is_empty());
        assert_eq!(step.residual.len(), 1);
    }

    #[rstest]
    #[case("//Window/Button[1]", PositionSpec::Index(Plan::Number(1.0)))]
    #[case("//Window/Button[last()]", PositionSpec::Last)]
    #[case("//Window/Button[position()=last()]", PositionSpec::Last)]
    #[case("//Window/Button[3=position()]", PositionSpec::Index(Plan::Number(3.0)))]
    fn positions_are_collected_without_residuals(#[case] selector: &str, #[case] expected: PositionSpec) {
        let plan = lower_str(selector, true);
        let step = steps(&plan).last().expect("step");
        assert_eq!(step.positions, vec![expected]);
        assert!(step.residual.is_empty());
    }

    #[rstest]
    fn element_free_arithmetic_is_a_position() {
        let plan = lower_str("//Window/Button[1 + 1]", true);
        let step = steps(&plan).last().expect("step");
        assert!(matches!(&step.positions[..], [PositionSpec::Index(Plan::Binary { op: BinaryOp::Add, .. })]));
    }

    #[rstest]
    fn position_dependent_predicates_are_residual() {
        let plan = lower_str("//Window/Button[position() < 3][last()]", true);
        let step = steps(&plan).last().expect("step");
        assert_eq!(step.residual.len(), 1);
        assert_eq!(step.positions, vec![PositionSpec::Last]);
    }

    #[rstest]
    fn absolute_paths_test_the_root_itself_first() {
        let plan = lower_str("/Window", true);
        assert_eq!(steps(&plan)[0].axis, Axis::SelfAxis);
        let plan = lower_str("Window", true);
        assert_eq!(steps(&plan)[0].axis, Axis::Child);
    }

    #[rstest]
    fn single_results_mark_the_final_step() {
        let plan = lower_str("//Window[@Name='Calc']", false);
        assert_eq!(steps(&plan)[0].mode, FindMode::First);
        let plan = lower_str("//Window[@Name='Calc']", true);
        assert_eq!(steps(&plan)[0].mode, FindMode::All);
        let plan = lower_str("//Window/Button[2]", false);
        assert_eq!(steps(&plan).last().expect("step").mode, FindMode::All);
        let plan = lower_str("//Window/@Name", false);
        assert!(steps(&plan).iter().all(|s| s.mode == FindMode::All));
    }

    #[rstest]
    fn union_arms_are_marked_separately() {
        let Plan::Union(left, right) = lower_str("//Window | //Pane", false) else { panic!("union expected") };
        assert_eq!(steps(&left)[0].mode, FindMode::First);
        assert_eq!(steps(&right)[0].mode, FindMode::First);
    }

    #[rstest]
    fn filters_carry_their_predicates_on_a_self_step() {
        let Plan::Filter { step, .. } = lower_str("(//Button)[2]", true) else { panic!("filter expected") };
        assert_eq!(step.axis, Axis::SelfAxis);
        assert_eq!(step.positions, vec![PositionSpec::Index(Plan::Number(2.0))]);
    }

    #[rstest]
    #[case("foo()", "invalid selector: XPath function foo() not found.")]
    #[case("//Button[matches(@Name, 'x')]", "invalid selector: XPath function matches() not found.")]
    #[case("substring('a')", "Function substring() requires 2 or 3 arguments.")]
    #[case("//Button[@IsEnabled='maybe']", "'maybe' is not a boolean (property IsEnabled)")]
    #[case("//Button/@Name[1]", "invalid selector: predicates on attribute steps are not supported")]
    fn rejects_selectors_while_lowering(#[case] selector: &str, #[case] message: &str) {
        let expr = parse(selector).expect("parse");
        let err = lower(&expr, LowerOptions::default()).expect_err("lowering error");
        assert_eq!(err.to_string(), message);
    }

    impl Plan {
        fn with_absolute(mut self, value: bool) -> Self {
            if let Plan::LocationPath { absolute, .. } = &mut self {
                *absolute = value;
            }
            self
        }
    }
}
