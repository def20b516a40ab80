use pest::Parser;
use pest::iterators::{Pair, Pairs};

use crate::ast::{
    Axis, BinaryOp, ComparisonOp, Expr, KindTest, Literal, LocationPath, NameTest, NodeTest,
    QName, Step, WildcardName,
};

#[derive(pest_derive::Parser)]
#[grammar = "xpath1.pest"]
pub struct XPathParser;

/// A selector that is not valid XPath 1.0.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid XPath selector '{input}': {message}")]
pub struct ParseError {
    pub input: String,
    pub message: String,
    /// Byte offset of the failure, when pest reported one.
    pub position: Option<usize>,
}

impl ParseError {
    fn from_pest(input: &str, err: &pest::error::Error<Rule>) -> Self {
        let position = match err.location {
            pest::error::InputLocation::Pos(pos) => Some(pos),
            pest::error::InputLocation::Span((start, _)) => Some(start),
        };
        Self { input: input.to_owned(), message: err.variant.message().into_owned(), position }
    }

    fn malformed(input: &str, pair: &Pair<'_, Rule>, what: &str) -> Self {
        Self {
            input: input.to_owned(),
            message: format!("{what} in '{}'", pair.as_str()),
            position: Some(pair.as_span().start()),
        }
    }
}

/// Parse selector text into an expression tree.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    XPathParser::parse_to_ast(input)
}

impl XPathParser {
    pub fn parse_to_ast(input: &str) -> Result<Expr, ParseError> {
        let mut pairs = Self::parse(Rule::selector, input)
            .map_err(|err| ParseError::from_pest(input, &err))?;
        let builder = Builder { input };
        let selector = builder.next(&mut pairs, "selector")?;
        let mut inner = selector.into_inner();
        let expr = builder.next(&mut inner, "expression")?;
        builder.expr(expr)
    }
}

struct Builder<'i> {
    input: &'i str,
}

impl<'i> Builder<'i> {
    fn next(&self, pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>, ParseError> {
        pairs.next().ok_or_else(|| ParseError {
            input: self.input.to_owned(),
            message: format!("missing {what}"),
            position: None,
        })
    }

    fn expr(&self, pair: Pair<'i, Rule>) -> Result<Expr, ParseError> {
        match pair.as_rule() {
            Rule::expr | Rule::path_expr => {
                let mut inner = pair.into_inner();
                let first = self.next(&mut inner, "expression")?;
                self.expr(first)
            }
            Rule::or_expr
            | Rule::and_expr
            | Rule::equality_expr
            | Rule::relational_expr
            | Rule::additive_expr
            | Rule::multiplicative_expr => self.operator_chain(pair),
            Rule::unary_expr => self.unary(pair),
            Rule::union_expr => {
                let mut inner = pair.into_inner();
                let first = self.next(&mut inner, "union operand")?;
                let mut acc = self.expr(first)?;
                while let Some(op) = inner.next() {
                    debug_assert_eq!(op.as_rule(), Rule::op_union);
                    let operand = self.next(&mut inner, "union operand")?;
                    acc = Expr::Union { left: Box::new(acc), right: Box::new(self.expr(operand)?) };
                }
                Ok(acc)
            }
            Rule::filter_path => self.filter_path(pair),
            Rule::filter_expr => self.filter_expr(pair),
            Rule::absolute_location_path => self.absolute_path(pair),
            Rule::relative_location_path => {
                Ok(Expr::LocationPath(LocationPath { absolute: false, steps: self.steps(pair)? }))
            }
            Rule::literal => Ok(Expr::Literal(Literal::String(Self::literal_text(pair)))),
            Rule::number => pair
                .as_str()
                .parse::<f64>()
                .map(|value| Expr::Literal(Literal::Number(value)))
                .map_err(|_| ParseError::malformed(self.input, &pair, "invalid number")),
            Rule::function_call => self.function_call(pair),
            _ => Err(ParseError::malformed(self.input, &pair, "unexpected token")),
        }
    }

    fn operator_chain(&self, pair: Pair<'i, Rule>) -> Result<Expr, ParseError> {
        let mut inner = pair.into_inner();
        let first = self.next(&mut inner, "operand")?;
        let mut acc = self.expr(first)?;
        while let Some(op) = inner.next() {
            let operand = self.next(&mut inner, "operand")?;
            let right = Box::new(self.expr(operand)?);
            let left = Box::new(acc);
            acc = match op.as_rule() {
                Rule::op_or => Expr::Binary { left, op: BinaryOp::Or, right },
                Rule::op_and => Expr::Binary { left, op: BinaryOp::And, right },
                Rule::op_plus => Expr::Binary { left, op: BinaryOp::Add, right },
                Rule::op_minus => Expr::Binary { left, op: BinaryOp::Sub, right },
                Rule::op_mul => Expr::Binary { left, op: BinaryOp::Mul, right },
                Rule::op_div => Expr::Binary { left, op: BinaryOp::Div, right },
                Rule::op_mod => Expr::Binary { left, op: BinaryOp::Mod, right },
                Rule::op_eq => Expr::Comparison { left, op: ComparisonOp::Eq, right },
                Rule::op_ne => Expr::Comparison { left, op: ComparisonOp::Ne, right },
                Rule::op_lt => Expr::Comparison { left, op: ComparisonOp::Lt, right },
                Rule::op_le => Expr::Comparison { left, op: ComparisonOp::Le, right },
                Rule::op_gt => Expr::Comparison { left, op: ComparisonOp::Gt, right },
                Rule::op_ge => Expr::Comparison { left, op: ComparisonOp::Ge, right },
                _ => return Err(ParseError::malformed(self.input, &op, "unknown operator")),
            };
        }
        Ok(acc)
    }

    fn unary(&self, pair: Pair<'i, Rule>) -> Result<Expr, ParseError> {
        let mut negations = 0usize;
        let mut operand = None;
        for part in pair.into_inner() {
            if part.as_rule() == Rule::op_minus {
                negations += 1;
            } else {
                operand = Some(self.expr(part)?);
            }
        }
        let mut expr = operand.ok_or_else(|| ParseError {
            input: self.input.to_owned(),
            message: "missing operand after '-'".to_owned(),
            position: None,
        })?;
        for _ in 0..negations {
            expr = Expr::Negate(Box::new(expr));
        }
        Ok(expr)
    }

    fn filter_path(&self, pair: Pair<'i, Rule>) -> Result<Expr, ParseError> {
        let mut inner = pair.into_inner();
        let filter_pair = self.next(&mut inner, "filter expression")?;
        let filter = self.filter_expr(filter_pair)?;
        let Some(separator) = inner.next() else {
            return Ok(filter);
        };
        let mut steps = Vec::new();
        if separator.as_rule() == Rule::op_double_slash {
            steps.push(Step::descendant_or_self_node());
        }
        let relative = self.next(&mut inner, "relative location path")?;
        steps.extend(self.steps(relative)?);
        Ok(Expr::Path { filter: Box::new(filter), steps })
    }

    fn filter_expr(&self, pair: Pair<'i, Rule>) -> Result<Expr, ParseError> {
        let mut inner = pair.into_inner();
        let primary_pair = self.next(&mut inner, "primary expression")?;
        let primary = self.expr(primary_pair)?;
        let predicates = inner.map(|p| self.predicate(p)).collect::<Result<Vec<_>, _>>()?;
        if predicates.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter { primary: Box::new(primary), predicates })
        }
    }

    fn absolute_path(&self, pair: Pair<'i, Rule>) -> Result<Expr, ParseError> {
        let mut inner = pair.into_inner();
        let lead = self.next(&mut inner, "path separator")?;
        let mut steps = Vec::new();
        if lead.as_rule() == Rule::op_double_slash {
            steps.push(Step::descendant_or_self_node());
        }
        if let Some(relative) = inner.next() {
            steps.extend(self.steps(relative)?);
        }
        Ok(Expr::LocationPath(LocationPath { absolute: true, steps }))
    }

    fn steps(&self, pair: Pair<'i, Rule>) -> Result<Vec<Step>, ParseError> {
        let mut steps = Vec::new();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::op_slash => {}
                Rule::op_double_slash => steps.push(Step::descendant_or_self_node()),
                Rule::step => steps.push(self.step(part)?),
                _ => return Err(ParseError::malformed(self.input, &part, "unexpected path token")),
            }
        }
        Ok(steps)
    }

    fn step(&self, pair: Pair<'i, Rule>) -> Result<Step, ParseError> {
        let mut axis = Axis::Child;
        let mut test = None;
        let mut predicates = Vec::new();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::parent_step => {
                    return Ok(Step::new(Axis::Parent, NodeTest::Kind(KindTest::AnyKind)));
                }
                Rule::self_step => {
                    return Ok(Step::new(Axis::SelfAxis, NodeTest::Kind(KindTest::AnyKind)));
                }
                Rule::axis_name => {
                    axis = Axis::from_name(part.as_str())
                        .ok_or_else(|| ParseError::malformed(self.input, &part, "unknown axis"))?;
                }
                Rule::abbreviated_axis => axis = Axis::Attribute,
                Rule::node_type_test => test = Some(self.node_type_test(part)?),
                Rule::processing_instruction_test => {
                    let target = part.into_inner().next().map(Self::literal_text);
                    test = Some(NodeTest::Kind(KindTest::ProcessingInstruction(target)));
                }
                Rule::name_test => test = Some(self.name_test(part)?),
                Rule::predicate => predicates.push(self.predicate(part)?),
                _ => return Err(ParseError::malformed(self.input, &part, "unexpected step token")),
            }
        }
        let test = test.ok_or_else(|| ParseError {
            input: self.input.to_owned(),
            message: "step without node test".to_owned(),
            position: None,
        })?;
        Ok(Step { axis, test, predicates })
    }

    fn node_type_test(&self, pair: Pair<'i, Rule>) -> Result<NodeTest, ParseError> {
        let mut inner = pair.into_inner();
        let node_type = self.next(&mut inner, "node type")?;
        let kind = match node_type.as_str() {
            "node" => KindTest::AnyKind,
            "text" => KindTest::Text,
            "comment" => KindTest::Comment,
            _ => return Err(ParseError::malformed(self.input, &node_type, "unknown node type")),
        };
        Ok(NodeTest::Kind(kind))
    }

    fn name_test(&self, pair: Pair<'i, Rule>) -> Result<NodeTest, ParseError> {
        let mut inner = pair.into_inner();
        let test = self.next(&mut inner, "name test")?;
        let name = match test.as_rule() {
            Rule::any_name => NameTest::Wildcard(WildcardName::Any),
            Rule::prefix_wildcard => {
                let prefix = test.into_inner().next().map(|p| p.as_str().to_owned()).unwrap_or_default();
                NameTest::Wildcard(WildcardName::Prefix(prefix))
            }
            Rule::qname => NameTest::QName(Self::qname(test)),
            _ => return Err(ParseError::malformed(self.input, &test, "unexpected name test")),
        };
        Ok(NodeTest::Name(name))
    }

    fn predicate(&self, pair: Pair<'i, Rule>) -> Result<Expr, ParseError> {
        let mut inner = pair.into_inner();
        let expr = self.next(&mut inner, "predicate expression")?;
        self.expr(expr)
    }

    fn function_call(&self, pair: Pair<'i, Rule>) -> Result<Expr, ParseError> {
        let mut inner = pair.into_inner();
        let name = Self::qname(self.next(&mut inner, "function name")?);
        let args = inner.map(|arg| self.expr(arg)).collect::<Result<Vec<_>, _>>()?;
        Ok(Expr::FunctionCall { name, args })
    }

    fn qname(pair: Pair<'i, Rule>) -> QName {
        let parts: Vec<&str> = pair.into_inner().map(|p| p.as_str()).collect();
        match parts.as_slice() {
            [prefix, local] => QName { prefix: Some((*prefix).to_owned()), local: (*local).to_owned() },
            [local] => QName::local(*local),
            _ => QName::local(""),
        }
    }

    fn literal_text(pair: Pair<'i, Rule>) -> String {
        pair.into_inner().next().map(|content| content.as_str().to_owned()).unwrap_or_default()
    }
}
