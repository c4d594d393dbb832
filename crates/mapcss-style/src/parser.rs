//! MapCSS parser
//!
//! Turns stylesheet source into compiled rules. Parsing is all-or-nothing
//! per source: any syntax error, unknown function or bad arity rejects the
//! whole stylesheet with a position-carrying [`ParseError`].
//!
//! Expression operators desugar to the builtin registry (`a + b` becomes
//! `plus(a, b)`), so the evaluator only ever sees literals, calls and the
//! short-circuiting special forms.

use regex::Regex;

use crate::error::ParseError;
use crate::expr::Expr;
use crate::functions;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::range::Range;
use crate::selector::{
    Base, Combinator, CompareOp, Condition, LinkSelector, NeighborPolicy, Selector,
};
use crate::value::{Keyword, Value};

/// One statement inside a declaration block.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// `property: expression;`
    Assign { property: String, expr: Expr },
    /// `set .class;` tags the primitive for later rules in the same pass.
    SetClass(String),
}

/// One compiled rule. Comma-separated selector lists are expanded into one
/// rule per selector at parse time.
#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: Selector,
    pub instructions: Vec<Instruction>,
}

/// A parsed stylesheet: rules in source order plus the raw `globals`
/// declarations, which the style source evaluates once at compile time.
#[derive(Debug, Default)]
pub struct StyleSheet {
    pub rules: Vec<Rule>,
    pub globals: Vec<(String, Expr)>,
}

/// Neighbor-binding policy per combinator kind.
///
/// When several neighbors satisfy a link's parent selector, this decides
/// which one the match binds as context (see
/// [`NeighborPolicy`]). The default binds the first in dataset order for
/// every combinator; renderers that want ambiguity to degrade to a neutral
/// default select `RequireUnanimous` instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombinatorPolicies {
    pub child: NeighborPolicy,
    pub descendant: NeighborPolicy,
    pub sibling: NeighborPolicy,
}

impl CombinatorPolicies {
    fn for_combinator(&self, combinator: Combinator) -> NeighborPolicy {
        match combinator {
            Combinator::Child => self.child,
            Combinator::Descendant => self.descendant,
            Combinator::Sibling => self.sibling,
        }
    }
}

/// Parses a stylesheet with the default neighbor policies.
pub fn parse(source: &str) -> Result<StyleSheet, ParseError> {
    parse_with_policies(source, CombinatorPolicies::default())
}

/// Parses a stylesheet with explicit neighbor-binding policies.
pub fn parse_with_policies(
    source: &str,
    policies: CombinatorPolicies,
) -> Result<StyleSheet, ParseError> {
    Parser { lexer: Lexer::new(source), policies }.parse_stylesheet()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    policies: CombinatorPolicies,
}

impl<'a> Parser<'a> {
    fn parse_stylesheet(mut self) -> Result<StyleSheet, ParseError> {
        let mut sheet = StyleSheet::default();
        loop {
            match &self.lexer.peek()?.kind {
                TokenKind::Eof => return Ok(sheet),
                TokenKind::Ident(name) if name == "globals" => {
                    self.lexer.next()?;
                    self.parse_globals(&mut sheet)?;
                }
                _ => self.parse_rule(&mut sheet)?,
            }
        }
    }

    fn parse_globals(&mut self, sheet: &mut StyleSheet) -> Result<(), ParseError> {
        self.expect(TokenKind::LBrace)?;
        loop {
            if self.eat(TokenKind::RBrace)? {
                return Ok(());
            }
            let (name, name_tok) = self.expect_ident()?;
            if name == "set" {
                return Err(ParseError::syntax(
                    name_tok.line,
                    name_tok.column,
                    "'set' is not allowed in the globals block",
                ));
            }
            self.expect(TokenKind::Colon)?;
            let expr = self.parse_declaration_value()?;
            self.end_declaration()?;
            sheet.globals.push((name, expr));
        }
    }

    fn parse_rule(&mut self, sheet: &mut StyleSheet) -> Result<(), ParseError> {
        let mut selectors = vec![self.parse_selector()?];
        while self.eat(TokenKind::Comma)? {
            selectors.push(self.parse_selector()?);
        }
        self.expect(TokenKind::LBrace)?;
        let mut instructions = Vec::new();
        loop {
            if self.eat(TokenKind::RBrace)? {
                break;
            }
            instructions.push(self.parse_instruction()?);
        }
        for selector in selectors {
            sheet.rules.push(Rule { selector, instructions: instructions.clone() });
        }
        Ok(())
    }

    /// A chain of simple selectors; the last one is the subject, earlier
    /// ones become linked parent selectors.
    fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        let mut current = self.parse_simple_selector()?;
        loop {
            let combinator = match &self.lexer.peek()?.kind {
                TokenKind::Gt => {
                    self.lexer.next()?;
                    Combinator::Child
                }
                TokenKind::Plus => {
                    self.lexer.next()?;
                    Combinator::Sibling
                }
                // a bare following selector is the descendant combinator
                TokenKind::Ident(name) if Base::from_str(name).is_some() => Combinator::Descendant,
                TokenKind::Star => Combinator::Descendant,
                _ => return Ok(current),
            };
            let mut subject = self.parse_simple_selector()?;
            subject.link = Some(LinkSelector {
                combinator,
                parent: Box::new(current),
                policy: self.policies.for_combinator(combinator),
            });
            current = subject;
        }
    }

    fn parse_simple_selector(&mut self) -> Result<Selector, ParseError> {
        let tok = self.lexer.next()?;
        let base = match &tok.kind {
            TokenKind::Star => Base::Any,
            TokenKind::Ident(name) => Base::from_str(name).ok_or_else(|| {
                ParseError::syntax(tok.line, tok.column, format!("unknown selector base '{name}'"))
            })?,
            other => {
                return Err(ParseError::syntax(
                    tok.line,
                    tok.column,
                    format!("expected a selector base, found {other}"),
                ))
            }
        };
        let mut selector = Selector::new(base);
        loop {
            match &self.lexer.peek()?.kind {
                // canonically right after the base, but stylesheets also
                // write it after the conditions
                TokenKind::ZoomPrefix => {
                    self.lexer.next()?;
                    selector.zoom = Some(self.parse_zoom()?);
                }
                TokenKind::LBracket => {
                    self.lexer.next()?;
                    let cond = self.parse_condition()?;
                    self.expect(TokenKind::RBracket)?;
                    selector.conds.push(cond);
                }
                TokenKind::Dot => {
                    self.lexer.next()?;
                    let (name, _) = self.expect_ident()?;
                    selector.conds.push(Condition::Class { name, negated: false });
                }
                TokenKind::Bang => {
                    self.lexer.next()?;
                    self.expect(TokenKind::Dot)?;
                    let (name, _) = self.expect_ident()?;
                    selector.conds.push(Condition::Class { name, negated: true });
                }
                TokenKind::DoubleColon => {
                    self.lexer.next()?;
                    selector.subpart = match self.lexer.next()? {
                        Token { kind: TokenKind::Ident(name), .. } => name,
                        Token { kind: TokenKind::Star, .. } => "*".to_string(),
                        tok => {
                            return Err(ParseError::syntax(
                                tok.line,
                                tok.column,
                                format!("expected a layer name, found {}", tok.kind),
                            ))
                        }
                    };
                }
                _ => return Ok(selector),
            }
        }
    }

    /// Zoom restriction after `|z`: `12`, `12-14`, `12-`, `-14`.
    fn parse_zoom(&mut self) -> Result<Range, ParseError> {
        let mut min = None;
        if let TokenKind::Number(n) = self.lexer.peek()?.kind {
            self.lexer.next()?;
            min = Some(n as u32);
        }
        let max = if self.eat(TokenKind::Minus)? {
            match self.lexer.peek()?.kind {
                TokenKind::Number(n) => {
                    self.lexer.next()?;
                    Some(n as u32)
                }
                _ => None,
            }
        } else {
            min
        };
        if min.is_none() && max.is_none() {
            let tok = self.lexer.peek()?;
            return Err(ParseError::syntax(tok.line, tok.column, "empty zoom restriction"));
        }
        Ok(Range::zoom(min, max))
    }

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let negated = self.eat(TokenKind::Bang)?;
        let (key, key_tok) = self.condition_key()?;
        match self.lexer.peek()?.kind.clone() {
            TokenKind::RBracket => Ok(Condition::TagPresent { key, negated }),
            TokenKind::Question => {
                self.lexer.next()?;
                Ok(Condition::TagTruthy { key, negated })
            }
            op @ (TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge) => {
                if negated {
                    return Err(ParseError::syntax(
                        key_tok.line,
                        key_tok.column,
                        "'!' cannot be combined with a comparison",
                    ));
                }
                self.lexer.next()?;
                let value = self.condition_value()?;
                let op = match op {
                    TokenKind::Eq => CompareOp::Eq,
                    TokenKind::NotEq => CompareOp::NotEq,
                    TokenKind::Lt => CompareOp::Less,
                    TokenKind::Le => CompareOp::LessEq,
                    TokenKind::Gt => CompareOp::Greater,
                    _ => CompareOp::GreaterEq,
                };
                Ok(Condition::TagValue { key, op, value })
            }
            TokenKind::RegexMatch | TokenKind::NotRegexMatch => {
                let negated_match = self.lexer.next()?.kind == TokenKind::NotRegexMatch;
                let tok = self.lexer.next_regex()?;
                let TokenKind::Regex(pattern) = tok.kind else {
                    return Err(ParseError::syntax(tok.line, tok.column, "expected regex"));
                };
                let compiled = Regex::new(&pattern).map_err(|e| ParseError::InvalidRegex {
                    line: tok.line,
                    column: tok.column,
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                Ok(Condition::TagRegex { key, pattern: compiled, negated: negated_match })
            }
            other => Err(ParseError::syntax(
                key_tok.line,
                key_tok.column,
                format!("unexpected {other} in condition"),
            )),
        }
    }

    fn condition_key(&mut self) -> Result<(String, Token), ParseError> {
        let tok = self.lexer.next()?;
        match &tok.kind {
            TokenKind::Ident(s) | TokenKind::Str(s) => Ok((s.clone(), tok.clone())),
            other => Err(ParseError::syntax(
                tok.line,
                tok.column,
                format!("expected a tag key, found {other}"),
            )),
        }
    }

    fn condition_value(&mut self) -> Result<String, ParseError> {
        let tok = self.lexer.next()?;
        match tok.kind {
            TokenKind::Ident(s) | TokenKind::Str(s) => Ok(s),
            TokenKind::Number(n) => Ok(Value::Number(n).as_display_string()),
            other => Err(ParseError::syntax(
                tok.line,
                tok.column,
                format!("expected a tag value, found {other}"),
            )),
        }
    }

    fn parse_instruction(&mut self) -> Result<Instruction, ParseError> {
        let (name, _) = self.expect_ident()?;
        if name == "set" {
            self.eat(TokenKind::Dot)?;
            let (class, _) = self.expect_ident()?;
            self.end_declaration()?;
            return Ok(Instruction::SetClass(class));
        }
        self.expect(TokenKind::Colon)?;
        let mut expr = self.parse_declaration_value()?;
        // `icon-rotation: way;` asks for the heading of the parent way
        if name == "icon-rotation" {
            if let Expr::Literal(Value::Keyword(Keyword::Way)) = expr {
                expr = self.call_builtin("heading", Vec::new(), 0, 0)?;
            }
        }
        self.end_declaration()?;
        Ok(Instruction::Assign { property: name, expr })
    }

    /// A declaration value; comma-separated expressions form a list.
    fn parse_declaration_value(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_expr()?;
        if self.lexer.peek()?.kind != TokenKind::Comma {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma)? {
            items.push(self.parse_expr()?);
        }
        self.call_builtin("list", items, 0, 0)
    }

    fn end_declaration(&mut self) -> Result<(), ParseError> {
        if !self.eat(TokenKind::Semicolon)? && self.lexer.peek()?.kind != TokenKind::RBrace {
            let tok = self.lexer.peek()?;
            return Err(ParseError::syntax(
                tok.line,
                tok.column,
                format!("expected ';', found {}", tok.kind),
            ));
        }
        Ok(())
    }

    // expressions, lowest to highest precedence

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_or()?;
        if !self.eat(TokenKind::Question)? {
            return Ok(condition);
        }
        let if_true = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let if_false = self.parse_expr()?;
        Ok(Expr::Cond {
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut operands = vec![self.parse_and()?];
        while self.eat(TokenKind::OrOr)? {
            operands.push(self.parse_and()?);
        }
        Ok(if operands.len() == 1 { operands.remove(0) } else { Expr::Or(operands) })
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut operands = vec![self.parse_equality()?];
        while self.eat(TokenKind::AndAnd)? {
            operands.push(self.parse_equality()?);
        }
        Ok(if operands.len() == 1 { operands.remove(0) } else { Expr::And(operands) })
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let name = match self.lexer.peek()?.kind {
                TokenKind::Eq => "equal",
                TokenKind::NotEq => "not_equal",
                _ => return Ok(left),
            };
            self.lexer.next()?;
            let right = self.parse_comparison()?;
            left = self.call_builtin(name, vec![left, right], 0, 0)?;
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let name = match self.lexer.peek()?.kind {
                TokenKind::Lt => "less",
                TokenKind::Le => "less_equal",
                TokenKind::Gt => "greater",
                TokenKind::Ge => "greater_equal",
                _ => return Ok(left),
            };
            self.lexer.next()?;
            let right = self.parse_additive()?;
            left = self.call_builtin(name, vec![left, right], 0, 0)?;
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let name = match self.lexer.peek()?.kind {
                TokenKind::Plus => "plus",
                TokenKind::Minus => "minus",
                _ => return Ok(left),
            };
            self.lexer.next()?;
            let right = self.parse_multiplicative()?;
            left = self.call_builtin(name, vec![left, right], 0, 0)?;
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let name = match self.lexer.peek()?.kind {
                TokenKind::Star => "times",
                TokenKind::Slash => "divided_by",
                TokenKind::Percent => "mod",
                _ => return Ok(left),
            };
            self.lexer.next()?;
            let right = self.parse_unary()?;
            left = self.call_builtin(name, vec![left, right], 0, 0)?;
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(TokenKind::Minus)? {
            let operand = self.parse_unary()?;
            return self.call_builtin("minus", vec![operand], 0, 0);
        }
        if self.eat(TokenKind::Bang)? {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.lexer.next()?;
        match tok.kind {
            TokenKind::Number(n) => Ok(Expr::literal(n)),
            TokenKind::Str(s) => Ok(Expr::literal(s)),
            TokenKind::HexColor(c) => Ok(Expr::literal(c)),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.lexer.peek()?.kind == TokenKind::LParen {
                    self.lexer.next()?;
                    let mut args = Vec::new();
                    if !self.eat(TokenKind::RParen)? {
                        loop {
                            args.push(self.parse_expr()?);
                            if self.eat(TokenKind::RParen)? {
                                break;
                            }
                            self.expect(TokenKind::Comma)?;
                        }
                    }
                    return self.compile_call(&name, args, tok.line, tok.column);
                }
                Ok(match name.as_str() {
                    "true" => Expr::literal(true),
                    "false" => Expr::literal(false),
                    other => match Keyword::from_str(other) {
                        Some(k) => Expr::Literal(Value::Keyword(k)),
                        None => Expr::literal(name),
                    },
                })
            }
            other => Err(ParseError::syntax(
                tok.line,
                tok.column,
                format!("expected an expression, found {other}"),
            )),
        }
    }

    /// Resolves a function call: `cond`/`and`/`or`/`not` are special forms,
    /// everything else must exist in the registry with a matching arity.
    fn compile_call(
        &self,
        name: &str,
        args: Vec<Expr>,
        line: u32,
        column: u32,
    ) -> Result<Expr, ParseError> {
        let special_arity = |expected: &str, ok: bool| {
            if ok {
                Ok(())
            } else {
                Err(ParseError::WrongArity {
                    line,
                    column,
                    name: name.to_string(),
                    expected: expected.to_string(),
                    got: args.len(),
                })
            }
        };
        match name {
            "cond" => {
                special_arity("3", args.len() == 3)?;
                let mut it = args.into_iter();
                match (it.next(), it.next(), it.next()) {
                    (Some(c), Some(t), Some(f)) => Ok(Expr::Cond {
                        condition: Box::new(c),
                        if_true: Box::new(t),
                        if_false: Box::new(f),
                    }),
                    _ => Err(ParseError::syntax(line, column, "missing operand")),
                }
            }
            "and" => {
                special_arity("at least 1", !args.is_empty())?;
                Ok(Expr::And(args))
            }
            "or" => {
                special_arity("at least 1", !args.is_empty())?;
                Ok(Expr::Or(args))
            }
            "not" => {
                special_arity("1", args.len() == 1)?;
                let mut it = args.into_iter();
                Ok(Expr::Not(Box::new(it.next().ok_or_else(|| {
                    ParseError::syntax(line, column, "missing operand")
                })?)))
            }
            _ => self.call_builtin(name, args, line, column),
        }
    }

    fn call_builtin(
        &self,
        name: &str,
        args: Vec<Expr>,
        line: u32,
        column: u32,
    ) -> Result<Expr, ParseError> {
        let builtin = functions::lookup(name).ok_or_else(|| ParseError::UnknownFunction {
            line,
            column,
            name: name.to_string(),
        })?;
        if !builtin.accepts(args.len()) {
            return Err(ParseError::WrongArity {
                line,
                column,
                name: name.to_string(),
                expected: builtin.arity(),
                got: args.len(),
            });
        }
        Ok(Expr::Call { builtin, args })
    }

    // token helpers

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let tok = self.lexer.next()?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(ParseError::syntax(
                tok.line,
                tok.column,
                format!("expected {kind}, found {}", tok.kind),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Token), ParseError> {
        let tok = self.lexer.next()?;
        match &tok.kind {
            TokenKind::Ident(name) => Ok((name.clone(), tok.clone())),
            other => Err(ParseError::syntax(
                tok.line,
                tok.column,
                format!("expected an identifier, found {other}"),
            )),
        }
    }

    /// Consumes the next token if it matches.
    fn eat(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.lexer.peek()?.kind == kind {
            self.lexer.next()?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::expr::Cacheability;

    fn eval_value(source: &str) -> Option<Value> {
        let sheet = parse(&format!("node {{ x: {source}; }}")).unwrap();
        let Instruction::Assign { expr, .. } = &sheet.rules[0].instructions[0] else {
            panic!("expected an assignment");
        };
        expr.eval(&Environment::global())
    }

    #[test]
    fn test_simple_rule() {
        let sheet = parse("node[highway=crossing] { icon-image: \"a.svg\"; }").unwrap();
        assert_eq!(sheet.rules.len(), 1);
        let rule = &sheet.rules[0];
        assert_eq!(rule.selector.base, Base::Node);
        assert_eq!(rule.selector.conds.len(), 1);
        assert_eq!(rule.instructions.len(), 1);
    }

    #[test]
    fn test_comma_selector_list_expands() {
        let sheet = parse("node, way { opacity: 0.5; }").unwrap();
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].selector.base, Base::Node);
        assert_eq!(sheet.rules[1].selector.base, Base::Way);
    }

    #[test]
    fn test_zoom_forms() {
        let sheet = parse(
            "way|z12 {} way|z12-14 {} way|z12- {} way|z-14 {}",
        )
        .unwrap();
        let zooms: Vec<Range> = sheet.rules.iter().map(|r| r.selector.zoom.unwrap()).collect();
        assert_eq!(zooms[0], Range::zoom(Some(12), Some(12)));
        assert_eq!(zooms[1], Range::zoom(Some(12), Some(14)));
        assert_eq!(zooms[2], Range::zoom(Some(12), None));
        assert_eq!(zooms[3], Range::zoom(None, Some(14)));
    }

    #[test]
    fn test_zoom_after_conditions() {
        // both orders are accepted in the wild
        let sheet = parse("node[highway=stop]|z14- {} node|z14-[highway=stop] {}").unwrap();
        for rule in &sheet.rules {
            assert_eq!(rule.selector.zoom, Some(Range::zoom(Some(14), None)));
            assert_eq!(rule.selector.conds.len(), 1);
        }
    }

    #[test]
    fn test_combinator_chain() {
        let sheet = parse("relation[type=route] > way { color: red; }").unwrap();
        let sel = &sheet.rules[0].selector;
        assert_eq!(sel.base, Base::Way);
        let link = sel.link.as_ref().unwrap();
        assert_eq!(link.combinator, Combinator::Child);
        assert_eq!(link.parent.base, Base::Relation);
    }

    #[test]
    fn test_descendant_combinator_is_implicit() {
        let sheet = parse("relation node { color: red; }").unwrap();
        let link = sheet.rules[0].selector.link.as_ref().unwrap();
        assert_eq!(link.combinator, Combinator::Descendant);
    }

    #[test]
    fn test_subpart_and_class_conditions() {
        let sheet = parse("way.major::casing {} way!.minor {}").unwrap();
        assert_eq!(sheet.rules[0].selector.subpart, "casing");
        assert!(matches!(
            sheet.rules[0].selector.conds[0],
            Condition::Class { negated: false, .. }
        ));
        assert!(matches!(
            sheet.rules[1].selector.conds[0],
            Condition::Class { negated: true, .. }
        ));
    }

    #[test]
    fn test_set_class_instruction() {
        let sheet = parse("node[highway] { set .sign; }").unwrap();
        assert!(matches!(
            sheet.rules[0].instructions[0],
            Instruction::SetClass(ref name) if name == "sign"
        ));
    }

    #[test]
    fn test_regex_condition() {
        let sheet = parse("way[name=~/^A[0-9]+/] {}").unwrap();
        assert!(matches!(
            sheet.rules[0].selector.conds[0],
            Condition::TagRegex { negated: false, .. }
        ));
        let err = parse("way[name=~/(/] {}").unwrap_err();
        assert!(matches!(err, ParseError::InvalidRegex { .. }));
    }

    #[test]
    fn test_operator_desugaring() {
        assert_eq!(eval_value("1 + 2 * 3"), Some(Value::Number(7.0)));
        assert_eq!(eval_value("(1 + 2) * 3"), Some(Value::Number(9.0)));
        assert_eq!(eval_value("10 / 4"), Some(Value::Number(2.5)));
        assert_eq!(eval_value("7 % 4"), Some(Value::Number(3.0)));
        assert_eq!(eval_value("-3 + 5"), Some(Value::Number(2.0)));
        assert_eq!(eval_value("2 < 3"), Some(Value::Bool(true)));
        assert_eq!(eval_value("2 == 2"), Some(Value::Bool(true)));
        assert_eq!(eval_value("true && false"), Some(Value::Bool(false)));
        assert_eq!(eval_value("true || false"), Some(Value::Bool(true)));
        assert_eq!(eval_value("1 < 2 ? \"a\" : \"b\""), Some(Value::String("a".into())));
    }

    #[test]
    fn test_value_list() {
        assert_eq!(
            eval_value("3, 6"),
            Some(Value::List(vec![Value::Number(3.0), Value::Number(6.0)]))
        );
    }

    #[test]
    fn test_keywords_and_strings() {
        assert_eq!(eval_value("round"), Some(Value::Keyword(Keyword::Round)));
        assert_eq!(eval_value("residential"), Some(Value::String("residential".into())));
    }

    #[test]
    fn test_unknown_function_is_a_parse_error() {
        let err = parse("node { width: no_such_fn(1); }").unwrap_err();
        assert!(matches!(err, ParseError::UnknownFunction { ref name, .. } if name == "no_such_fn"));
    }

    #[test]
    fn test_wrong_arity_is_a_parse_error() {
        let err = parse("node { width: atan2(1); }").unwrap_err();
        assert!(matches!(err, ParseError::WrongArity { got: 1, .. }));
    }

    #[test]
    fn test_icon_rotation_way_desugars_to_heading() {
        let sheet = parse("node { icon-rotation: way; }").unwrap();
        let Instruction::Assign { expr, .. } = &sheet.rules[0].instructions[0] else {
            panic!("expected an assignment");
        };
        assert!(matches!(expr, Expr::Call { builtin, .. } if builtin.name == "heading"));
        assert_eq!(expr.cacheability(), Cacheability::Stable);
    }

    #[test]
    fn test_globals_block() {
        let sheet = parse("globals { major-width: 3 + 1; }").unwrap();
        assert_eq!(sheet.globals.len(), 1);
        assert_eq!(sheet.globals[0].0, "major-width");
    }

    #[test]
    fn test_syntax_error_carries_position() {
        let err = parse("node { width }").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
    }
}
