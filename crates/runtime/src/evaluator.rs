//! Evaluation of a lowered [`Plan`] against a remote session.
//!
//! Steps turn into element reference searches that are realized with one
//! round trip each; predicates that could not be folded into a search
//! condition are applied locally to the realized candidates. Recursion goes
//! through boxed futures.

use futures::FutureExt as _;
use futures::future::BoxFuture;
use tracing::{trace, warn};
use uiaquery_script::{
    Condition, ElementRef, Property, Rect, RuntimeId, ScriptValue, TreeScope, decode_property_rows,
    decode_rects, format_number,
};
use uiaquery_xpath::ast::BinaryOp;
use uiaquery_xpath::{Axis, KindTest, NameTest, NodeTest};

use crate::error::QueryError;
use crate::functions;
use crate::plan::{Plan, PositionSpec, Pushdown, StepPlan};
use crate::session::RemoteSession;
use crate::value::{Value, boolean_value, compare, elements, number_value};

/// Context position and size inside a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PositionState {
    pub position: usize,
    pub size: usize,
}

pub(crate) struct Evaluator<'s> {
    session: &'s RemoteSession,
}

impl<'s> Evaluator<'s> {
    pub(crate) fn new(session: &'s RemoteSession) -> Self {
        Self { session }
    }

    pub(crate) fn session(&self) -> &'s RemoteSession {
        self.session
    }

    pub(crate) fn evaluate<'a>(
        &'a self,
        plan: &'a Plan,
        context: &'a ElementRef,
        state: Option<PositionState>,
    ) -> BoxFuture<'a, Result<Vec<Value>, QueryError>> {
        async move {
            match plan {
                Plan::String(text) => Ok(vec![Value::String(text.clone())]),
                Plan::Number(number) => Ok(vec![Value::Number(*number)]),
                Plan::Union(left, right) => {
                    let mut values = self.evaluate(left, context, state).await?;
                    values.extend(self.evaluate(right, context, state).await?);
                    Ok(values)
                }
                Plan::LocationPath { absolute, steps } => {
                    let start = if *absolute { ElementRef::Root } else { context.clone() };
                    self.apply_steps(steps, start.into_members()).await
                }
                Plan::Path { filter, steps } => {
                    let found = elements(self.evaluate(filter, context, state).await?);
                    self.apply_steps(steps, found).await
                }
                Plan::Filter { primary, step } => {
                    let found = elements(self.evaluate(primary, context, state).await?);
                    if found.is_empty() {
                        return Ok(Vec::new());
                    }
                    let condition = self.step_condition(step).await?;
                    let matched = self.execute_step(step, &condition, &ElementRef::group(found)).await?;
                    Ok(matched.into_iter().map(Value::Element).collect())
                }
                Plan::Binary { op: op @ (BinaryOp::And | BinaryOp::Or), left, right } => {
                    let left = boolean_value(&self.evaluate(left, context, state).await?);
                    let result = match (op, left) {
                        (BinaryOp::And, false) => false,
                        (BinaryOp::Or, true) => true,
                        _ => boolean_value(&self.evaluate(right, context, state).await?),
                    };
                    Ok(vec![Value::Boolean(result)])
                }
                Plan::Binary { op, left, right } => {
                    let left = number_value(&self.evaluate(left, context, state).await?);
                    let right = number_value(&self.evaluate(right, context, state).await?);
                    Ok(vec![Value::Number(arithmetic(*op, left, right))])
                }
                Plan::Comparison { op, left, right } => {
                    let left = self.evaluate(left, context, state).await?;
                    let right = self.evaluate(right, context, state).await?;
                    Ok(vec![Value::Boolean(compare(&left, *op, &right))])
                }
                Plan::Negate(inner) => Ok(vec![Value::Number(-number_value(&self.evaluate(inner, context, state).await?))]),
                Plan::Call { function, args } => functions::call(self, *function, args, context, state).await,
            }
        }
        .boxed()
    }

    /// Apply location steps to a context set. The result of each step is
    /// deduplicated before the next one runs.
    async fn apply_steps(&self, steps: &[StepPlan], context: Vec<ElementRef>) -> Result<Vec<Value>, QueryError> {
        let mut current = context;
        for (index, step) in steps.iter().enumerate() {
            if current.is_empty() {
                return Ok(Vec::new());
            }
            match step.axis {
                Axis::Attribute if index + 1 == steps.len() => return self.attribute_values(step, current).await,
                Axis::Attribute | Axis::Namespace => return Ok(Vec::new()),
                _ => {}
            }
            current = self.apply_step(step, current).await?;
        }
        Ok(current.into_iter().map(Value::Element).collect())
    }

    async fn apply_step(&self, step: &StepPlan, context: Vec<ElementRef>) -> Result<Vec<ElementRef>, QueryError> {
        let condition = self.step_condition(step).await?;
        if condition.is_false() {
            return Ok(Vec::new());
        }
        if !step.is_per_context() {
            return self.execute_step(step, &condition, &ElementRef::group(context)).await;
        }
        let mut found = Vec::new();
        for element in &context {
            found.extend(self.execute_step(step, &condition, element).await?);
        }
        Ok(ElementRef::group(found).into_members())
    }

    /// Search from `base` with the step's condition, then filter the
    /// candidates: residual predicates in order, then positions.
    async fn execute_step(
        &self,
        step: &StepPlan,
        condition: &Condition,
        base: &ElementRef,
    ) -> Result<Vec<ElementRef>, QueryError> {
        let Some(scope) = tree_scope(step.axis) else {
            return Ok(Vec::new());
        };
        let answered_locally = scope == TreeScope::Element
            && condition.is_true()
            && base.members().iter().all(|member| member.runtime_id().is_some());
        let ids: Vec<RuntimeId> = if answered_locally {
            base.members().iter().filter_map(ElementRef::runtime_id).cloned().collect()
        } else {
            self.session.query_ids(&base.find(scope, condition.clone(), step.mode)).await?
        };
        let mut candidates = ElementRef::group(ids.into_iter().map(ElementRef::Resolved)).into_members();

        for predicate in &step.residual {
            let size = candidates.len();
            let mut kept = Vec::with_capacity(size);
            for (index, candidate) in candidates.into_iter().enumerate() {
                let state = PositionState { position: index + 1, size };
                let values = self.evaluate(predicate, &candidate, Some(state)).await?;
                if predicate_holds(&values, state.position) {
                    kept.push(candidate);
                }
            }
            candidates = kept;
        }

        if step.positions.is_empty() {
            return Ok(candidates);
        }
        let mut selected: Vec<usize> = Vec::new();
        for position in &step.positions {
            let index = match position {
                PositionSpec::Last => candidates.len().checked_sub(1),
                PositionSpec::Index(plan) => {
                    let wanted = number_value(&self.evaluate(plan, &ElementRef::Root, None).await?);
                    index_of(wanted, candidates.len())
                }
            };
            if let Some(index) = index
                && !selected.contains(&index)
            {
                selected.push(index);
            }
        }
        trace!(candidates = candidates.len(), ?selected, "applied position predicates");
        Ok(selected.into_iter().map(|index| candidates[index].clone()).collect())
    }

    /// The node test combined with every pushed-down predicate.
    async fn step_condition(&self, step: &StepPlan) -> Result<Condition, QueryError> {
        let mut condition = node_test_condition(&step.test);
        for pushdown in &step.pushdown {
            if condition.is_false() {
                break;
            }
            condition = condition.and(self.pushdown_condition(pushdown).await?);
        }
        Ok(condition)
    }

    fn pushdown_condition<'a>(&'a self, pushdown: &'a Pushdown) -> BoxFuture<'a, Result<Condition, QueryError>> {
        async move {
            Ok(match pushdown {
                Pushdown::Equals { property, value } => {
                    let values = self.evaluate(value, &ElementRef::Root, None).await?;
                    Condition::property_equals(*property, encode(*property, &values)?)?
                }
                Pushdown::And(left, right) => {
                    self.pushdown_condition(left).await?.and(self.pushdown_condition(right).await?)
                }
                Pushdown::Or(left, right) => {
                    self.pushdown_condition(left).await?.or(self.pushdown_condition(right).await?)
                }
            })
        }
        .boxed()
    }

    /// Encode every pushdown value in `plan`, including those of nested
    /// paths, before anything is sent. Pushdown values are element-free, so
    /// this never makes a round trip.
    pub(crate) fn validate_pushdowns<'a>(&'a self, plan: &'a Plan) -> BoxFuture<'a, Result<(), QueryError>> {
        async move {
            match plan {
                Plan::String(_) | Plan::Number(_) => {}
                Plan::Binary { left, right, .. } | Plan::Comparison { left, right, .. } | Plan::Union(left, right) => {
                    self.validate_pushdowns(left).await?;
                    self.validate_pushdowns(right).await?;
                }
                Plan::Negate(inner) => self.validate_pushdowns(inner).await?,
                Plan::LocationPath { steps, .. } => self.validate_steps(steps).await?,
                Plan::Path { filter, steps } => {
                    self.validate_pushdowns(filter).await?;
                    self.validate_steps(steps).await?;
                }
                Plan::Filter { primary, step } => {
                    self.validate_pushdowns(primary).await?;
                    self.validate_steps(std::slice::from_ref(step.as_ref())).await?;
                }
                Plan::Call { args, .. } => {
                    for arg in args {
                        self.validate_pushdowns(arg).await?;
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }

    async fn validate_steps(&self, steps: &[StepPlan]) -> Result<(), QueryError> {
        for step in steps {
            for pushdown in &step.pushdown {
                self.pushdown_condition(pushdown).await?;
            }
            for residual in &step.residual {
                self.validate_pushdowns(residual).await?;
            }
            for position in &step.positions {
                if let PositionSpec::Index(index) = position {
                    self.validate_pushdowns(index).await?;
                }
            }
        }
        Ok(())
    }

    /// Terminal attribute step: string values of every context element, in
    /// one round trip.
    async fn attribute_values(&self, step: &StepPlan, context: Vec<ElementRef>) -> Result<Vec<Value>, QueryError> {
        let target = ElementRef::group(context);
        let strings: Vec<String> = match &step.test {
            NodeTest::Name(NameTest::Wildcard(_)) | NodeTest::Kind(KindTest::AnyKind) => {
                let output = self.session.execute(&target.properties_query(Property::ALL)).await?;
                decode_property_rows(&output)?.into_iter().flatten().flatten().collect()
            }
            NodeTest::Name(NameTest::QName(name)) => match geometry(&name.local) {
                Some(component) => {
                    let output = self.session.execute(&target.rect_query()).await?;
                    decode_rects(&output)?.iter().map(|rect| format_number(component(rect))).collect()
                }
                None => {
                    let Some(property) = Property::from_name(&name.local) else {
                        trace!(attribute = %name, "unknown attribute");
                        return Ok(Vec::new());
                    };
                    let output = self.session.execute(&target.properties_query(&[property])).await?;
                    decode_property_rows(&output)?.into_iter().flatten().flatten().collect()
                }
            },
            NodeTest::Kind(_) => return Ok(Vec::new()),
        };
        Ok(strings.into_iter().filter(|text| !text.is_empty()).map(Value::String).collect())
    }
}

fn geometry(name: &str) -> Option<fn(&Rect) -> f64> {
    let component: fn(&Rect) -> f64 = match name.to_ascii_lowercase().as_str() {
        "x" => |rect| rect.x,
        "y" => |rect| rect.y,
        "width" => |rect| rect.width,
        "height" => |rect| rect.height,
        _ => return None,
    };
    Some(component)
}

fn tree_scope(axis: Axis) -> Option<TreeScope> {
    Some(match axis {
        Axis::SelfAxis => TreeScope::Element,
        Axis::Child => TreeScope::Children,
        Axis::Descendant => TreeScope::Descendants,
        Axis::DescendantOrSelf => TreeScope::Subtree,
        Axis::Parent => TreeScope::Parent,
        Axis::Ancestor => TreeScope::Ancestors,
        Axis::AncestorOrSelf => TreeScope::AncestorsOrSelf,
        Axis::Following => TreeScope::Following,
        Axis::FollowingSibling => TreeScope::FollowingSibling,
        Axis::Preceding => TreeScope::Preceding,
        Axis::PrecedingSibling => TreeScope::PrecedingSibling,
        Axis::Attribute | Axis::Namespace => return None,
    })
}

fn node_test_condition(test: &NodeTest) -> Condition {
    match test {
        NodeTest::Name(NameTest::Wildcard(_)) | NodeTest::Kind(KindTest::AnyKind) => Condition::True,
        NodeTest::Name(NameTest::QName(name)) => Condition::element_name(&name.local).unwrap_or_else(|| {
            warn!(element = %name, "no control type with this name; step matches nothing");
            Condition::False
        }),
        NodeTest::Kind(_) => Condition::False,
    }
}

fn encode(property: Property, values: &[Value]) -> Result<ScriptValue, QueryError> {
    let encoded = match values.first() {
        Some(Value::Boolean(flag)) => property.encode_bool(*flag),
        Some(Value::Number(number)) => property.encode_number(*number),
        Some(Value::String(text)) => property.encode_str(text),
        Some(Value::Element(_)) | None => property.encode_str(""),
    };
    Ok(encoded?)
}

/// A numeric predicate value selects by position; anything else by its
/// boolean value.
#[allow(clippy::float_cmp, clippy::cast_precision_loss)]
fn predicate_holds(values: &[Value], position: usize) -> bool {
    match values {
        [Value::Number(number)] => *number == position as f64,
        _ => boolean_value(values),
    }
}

/// Zero-based index for a 1-based position, if it names one of `len` items.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn index_of(position: f64, len: usize) -> Option<usize> {
    if position.fract() != 0.0 || position < 1.0 || position > len as f64 {
        return None;
    }
    Some(position as usize - 1)
}

fn arithmetic(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        // truncating remainder, like XPath `mod`
        BinaryOp::Mod => left % right,
        BinaryOp::And | BinaryOp::Or => f64::NAN,
    }
}
