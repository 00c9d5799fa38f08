//! Recursive-descent parser for the query surface syntax
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expression      = orExpr
//! orExpr          = andExpr   ( OR  andExpr  )*          -- left-assoc
//! andExpr         = notExpr   ( AND notExpr  )*          -- left-assoc
//! notExpr         = NOT notExpr | atomic
//! atomic          = group | call | literal | pathBased   -- pathBased only on Identifier
//! group           = '(' expression ')'
//! call            = funcName '(' expression ( ',' expression )* ')'
//! pathBased       = fieldPath ( cmpOp literal | ':' shortRHS )?
//! fieldPath       = Identifier ( '.' ( Identifier | String ) )*
//! shortRHS        = literal | valueList | compShorthand
//! valueList       = '(' item ( sep item )* ')'           -- sep: ',' or a uniform AND/OR
//! compShorthand   = cmpOp literal                        -- cmpOp in { > >= < <= }
//! literal         = String | Number | true | false | null
//! ```
//!
//! The one ambiguity worth naming: at `atomic`, the `pathBased` branch is
//! taken only when the current token is an identifier, so a quoted string in
//! argument position is always a literal and never the head of a path.
//! Quoted segments are legal only after the first dot. After a path, a
//! single token of lookahead picks comparison, colon shorthand, or bare
//! truthy path; neither comparison nor shorthand chains.

use tracing::trace;

use crate::errors::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::models::{
    ComparisonOp, Expr, FieldPath, Literal, LogicalOp, OrderingOp, ShorthandRhs, ValueListItem,
};

/// Parse `input` into a surface tree, also returning the token stream.
pub fn parse(input: &str) -> Result<(Expr, Vec<Token>), ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(&tokens);
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    trace!(
        "[PARSE] ok: {} tokens -> {} root",
        tokens.len(),
        expr.node_kind()
    );
    Ok((expr, tokens))
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

/// Separator style inside one value list. The first separator commits the
/// list; mixing styles afterwards is an error.
#[derive(Clone, Copy, PartialEq)]
enum ListSeparator {
    Comma,
    Keyword(LogicalOp),
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Error at the current token, or just past the last token when the
    /// input ended early.
    fn error_here<S: Into<String>>(&self, message: S) -> ParseError {
        match self.current() {
            Some(token) => {
                ParseError::syntax(message, token.line, token.column, token.lexeme())
            }
            None => {
                let (line, column) = match self.tokens.last() {
                    Some(last) => {
                        (last.line, last.column + last.lexeme().chars().count() as u32)
                    }
                    None => (1, 1),
                };
                ParseError::syntax(message, line, column, "end of input")
            }
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.current().is_some() {
            Err(self.error_here("Expected end of input"))
        } else {
            Ok(())
        }
    }

    // ── Boolean operator levels ────────────────────────────────────────

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.current().map(|t| &t.kind), Some(TokenKind::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while matches!(self.current().map(|t| &t.kind), Some(TokenKind::And)) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.current().map(|t| &t.kind), Some(TokenKind::Not)) {
            self.advance();
            let inner = self.parse_not()?;
            Ok(Expr::Not {
                expr: Box::new(inner),
            })
        } else {
            self.parse_atomic()
        }
    }

    // ── Atomic forms ───────────────────────────────────────────────────

    fn parse_atomic(&mut self) -> Result<Expr, ParseError> {
        match self.current().map(|t| &t.kind) {
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                if !matches!(self.current().map(|t| &t.kind), Some(TokenKind::RParen)) {
                    return Err(self.error_here("Expected ')' after expression"));
                }
                self.advance();
                Ok(Expr::Group {
                    expr: Box::new(inner),
                })
            }
            Some(TokenKind::Function(_)) => self.parse_call(),
            Some(
                TokenKind::Str(_)
                | TokenKind::Number(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null,
            ) => {
                let value = self.parse_literal()?;
                Ok(Expr::Literal { value })
            }
            Some(TokenKind::Identifier(_)) => self.parse_path_based(),
            _ => Err(self.error_here("Expected an expression")),
        }
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let call_token = self.advance().expect("function token current");
        let TokenKind::Function(name) = call_token.kind else {
            unreachable!("parse_call entered on a non-function token");
        };

        if !matches!(self.current().map(|t| &t.kind), Some(TokenKind::LParen)) {
            return Err(self.error_here("Expected '(' after function name"));
        }
        self.advance();

        let mut args = vec![self.parse_expression()?];
        while matches!(self.current().map(|t| &t.kind), Some(TokenKind::Comma)) {
            self.advance();
            args.push(self.parse_expression()?);
        }
        if !matches!(self.current().map(|t| &t.kind), Some(TokenKind::RParen)) {
            return Err(self.error_here("Expected ')' after call arguments"));
        }
        self.advance();

        let arity_ok = if name.quantifier().is_some() {
            args.len() == 2
        } else {
            args.len() == 1 || args.len() == 2
        };
        if !arity_ok {
            let expected = if name.quantifier().is_some() {
                "exactly two arguments"
            } else {
                "one or two arguments"
            };
            return Err(ParseError::syntax(
                format!("{name}() takes {expected}"),
                call_token.line,
                call_token.column,
                call_token.lexeme(),
            ));
        }

        Ok(Expr::Call { name, args })
    }

    /// Parse a field path and whatever follows it: a comparison, a colon
    /// shorthand, or nothing (bare truthy path). One token of lookahead
    /// decides; neither form chains.
    fn parse_path_based(&mut self) -> Result<Expr, ParseError> {
        let path = self.parse_field_path()?;

        match self.current().map(|t| &t.kind) {
            Some(TokenKind::Comparator(op)) => {
                let op = *op;
                self.advance();
                let value = self.parse_literal()?;
                Ok(Expr::Comparison { path, op, value })
            }
            Some(TokenKind::Colon) => {
                self.advance();
                let rhs = self.parse_short_rhs()?;
                Ok(Expr::Shorthand { path, rhs })
            }
            _ => Ok(Expr::Path { path }),
        }
    }

    fn parse_field_path(&mut self) -> Result<FieldPath, ParseError> {
        let head = self.advance().expect("identifier token current");
        let TokenKind::Identifier(ref first) = head.kind else {
            unreachable!("parse_field_path entered on a non-identifier token");
        };

        let mut segments = vec![first.clone()];
        while matches!(self.current().map(|t| &t.kind), Some(TokenKind::Dot)) {
            self.advance();
            match self.current().map(|t| &t.kind) {
                Some(TokenKind::Identifier(name)) => {
                    segments.push(name.clone());
                    self.advance();
                }
                // Quoted identifiers are legal after the first dot only.
                Some(TokenKind::Str(name)) => {
                    segments.push(name.clone());
                    self.advance();
                }
                _ => return Err(self.error_here("Expected identifier or string after '.'")),
            }
        }
        Ok(FieldPath::new(segments))
    }

    fn parse_short_rhs(&mut self) -> Result<ShorthandRhs, ParseError> {
        match self.current().map(|t| &t.kind) {
            Some(TokenKind::LParen) => self.parse_value_list(),
            Some(TokenKind::Comparator(op)) => {
                let op = self.ordering_op(*op)?;
                self.advance();
                let value = self.parse_literal()?;
                Ok(ShorthandRhs::Comparison { op, value })
            }
            Some(
                TokenKind::Str(_)
                | TokenKind::Number(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null,
            ) => {
                let value = self.parse_literal()?;
                Ok(ShorthandRhs::Literal { value })
            }
            _ => Err(self.error_here("Expected a literal, comparison or value list after ':'")),
        }
    }

    fn parse_value_list(&mut self) -> Result<ShorthandRhs, ParseError> {
        self.advance(); // '('

        if matches!(self.current().map(|t| &t.kind), Some(TokenKind::RParen)) {
            return Err(self.error_here("Value list must not be empty"));
        }

        let mut items = vec![self.parse_value_list_item()?];
        let mut separator: Option<ListSeparator> = None;

        loop {
            let next = match self.current().map(|t| &t.kind) {
                Some(TokenKind::RParen) => {
                    self.advance();
                    break;
                }
                Some(TokenKind::Comma) => ListSeparator::Comma,
                Some(TokenKind::And) => ListSeparator::Keyword(LogicalOp::And),
                Some(TokenKind::Or) => ListSeparator::Keyword(LogicalOp::Or),
                _ => return Err(self.error_here("Expected ',' or ')' in value list")),
            };
            match separator {
                None => separator = Some(next),
                Some(first) if first != next => {
                    return Err(self.error_here("Mixed separators in value list"));
                }
                Some(_) => {}
            }
            self.advance();
            items.push(self.parse_value_list_item()?);
        }

        let combinator = match separator {
            Some(ListSeparator::Keyword(op)) => Some(op),
            _ => None,
        };
        Ok(ShorthandRhs::ValueList { items, combinator })
    }

    fn parse_value_list_item(&mut self) -> Result<ValueListItem, ParseError> {
        match self.current().map(|t| &t.kind) {
            Some(TokenKind::Comparator(op)) => {
                let op = self.ordering_op(*op)?;
                self.advance();
                let value = self.parse_literal()?;
                Ok(ValueListItem::Comparison { op, value })
            }
            Some(
                TokenKind::Str(_)
                | TokenKind::Number(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null,
            ) => {
                let value = self.parse_literal()?;
                Ok(ValueListItem::Literal { value })
            }
            _ => Err(self.error_here("Expected a literal or comparison in value list")),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let literal = match self.current().map(|t| &t.kind) {
            Some(TokenKind::Str(s)) => Literal::Str(s.clone()),
            Some(TokenKind::Number(n)) => Literal::Num(*n),
            Some(TokenKind::True) => Literal::Bool(true),
            Some(TokenKind::False) => Literal::Bool(false),
            Some(TokenKind::Null) => Literal::Null,
            _ => return Err(self.error_here("Expected a literal value")),
        };
        self.advance();
        Ok(literal)
    }

    /// Restrict a comparator to the ordering subset allowed after ':' and
    /// inside value lists.
    fn ordering_op(&self, op: ComparisonOp) -> Result<OrderingOp, ParseError> {
        match op {
            ComparisonOp::Gt => Ok(OrderingOp::Gt),
            ComparisonOp::Gte => Ok(OrderingOp::Gte),
            ComparisonOp::Lt => Ok(OrderingOp::Lt),
            ComparisonOp::Lte => Ok(OrderingOp::Lte),
            ComparisonOp::Eq | ComparisonOp::Neq => {
                Err(self.error_here("Only ordering comparisons (> >= < <=) are allowed here"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::models::CallName;

    fn parse_ok(input: &str) -> Expr {
        let (expr, _tokens) = parse(input).unwrap_or_else(|e| panic!("parse '{input}': {e}"));
        expr
    }

    #[test]
    fn test_simple_comparison() {
        let expr = parse_ok("year > 1990");
        match expr {
            Expr::Comparison { path, op, value } => {
                assert_eq!(path.segments(), ["year"]);
                assert_eq!(op, ComparisonOp::Gt);
                assert_eq!(value, Literal::Num(1990.0));
            }
            other => panic!("Expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence_not_over_and_over_or() {
        // NOT binds tightest, then AND, then OR.
        let expr = parse_ok("NOT a AND b OR c");
        let Expr::Logical {
            op: LogicalOp::Or,
            left,
            right,
        } = expr
        else {
            panic!("Expected OR at the root");
        };
        assert!(matches!(*right, Expr::Path { .. }));
        let Expr::Logical {
            op: LogicalOp::And,
            left: and_left,
            ..
        } = *left
        else {
            panic!("Expected AND under OR");
        };
        assert!(matches!(*and_left, Expr::Not { .. }));
    }

    #[test]
    fn test_binary_operators_are_left_associative() {
        let expr = parse_ok("a OR b OR c");
        let Expr::Logical { op: LogicalOp::Or, left, .. } = expr else {
            panic!("Expected OR at the root");
        };
        assert!(matches!(
            *left,
            Expr::Logical { op: LogicalOp::Or, .. }
        ));
    }

    #[test]
    fn test_group_is_preserved() {
        let expr = parse_ok("(a OR b) AND c");
        let Expr::Logical { op: LogicalOp::And, left, .. } = expr else {
            panic!("Expected AND at the root");
        };
        assert!(matches!(*left, Expr::Group { .. }));
    }

    #[test]
    fn test_bare_path_and_nested_segments() {
        let expr = parse_ok("meta.\"release year\".raw");
        match expr {
            Expr::Path { path } => {
                assert_eq!(path.segments(), ["meta", "release year", "raw"]);
            }
            other => panic!("Expected bare path, got {other:?}"),
        }
    }

    #[test]
    fn test_shorthand_forms() {
        match parse_ok("name: \"gin\"") {
            Expr::Shorthand {
                rhs: ShorthandRhs::Literal { value },
                ..
            } => assert_eq!(value, Literal::Str("gin".to_string())),
            other => panic!("Expected literal shorthand, got {other:?}"),
        }

        match parse_ok("price: >10") {
            Expr::Shorthand {
                rhs: ShorthandRhs::Comparison { op, value },
                ..
            } => {
                assert_eq!(op, OrderingOp::Gt);
                assert_eq!(value, Literal::Num(10.0));
            }
            other => panic!("Expected comparison shorthand, got {other:?}"),
        }
    }

    #[test]
    fn test_value_list_with_commas() {
        match parse_ok("tags: (\"gin\", \"rum\")") {
            Expr::Shorthand {
                rhs: ShorthandRhs::ValueList { items, combinator },
                ..
            } => {
                assert_eq!(items.len(), 2);
                assert_eq!(combinator, None);
            }
            other => panic!("Expected value list, got {other:?}"),
        }
    }

    #[test]
    fn test_value_list_with_explicit_combinator() {
        match parse_ok("alcohol_content: (>5 AND <=13)") {
            Expr::Shorthand {
                rhs: ShorthandRhs::ValueList { items, combinator },
                ..
            } => {
                assert_eq!(items.len(), 2);
                assert_eq!(combinator, Some(LogicalOp::And));
                assert!(matches!(
                    items[0],
                    ValueListItem::Comparison { op: OrderingOp::Gt, .. }
                ));
            }
            other => panic!("Expected value list, got {other:?}"),
        }
    }

    #[test]
    fn test_value_list_rejects_mixed_separators() {
        let err = parse("tags: (\"a\" AND \"b\", \"c\")").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseGeneric);
        assert!(err.to_string().contains("Mixed separators"));

        let err = parse("tags: (\"a\" AND \"b\" OR \"c\")").unwrap_err();
        assert!(err.to_string().contains("Mixed separators"));
    }

    #[test]
    fn test_value_list_rejects_empty() {
        let err = parse("tags: ()").unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_call_with_string_argument_is_a_literal() {
        // A quoted string never starts a path, so the single-argument text
        // call sees a literal.
        match parse_ok("contains(\"gin\")") {
            Expr::Call { name, args } => {
                assert_eq!(name, CallName::Contains);
                assert_eq!(args.len(), 1);
                assert!(matches!(args[0], Expr::Literal { .. }));
            }
            other => panic!("Expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_quantifier_call_shape() {
        match parse_ok("any(ingredients, name: \"juniper\")") {
            Expr::Call { name, args } => {
                assert_eq!(name, CallName::Any);
                assert_eq!(args.len(), 2);
                assert!(matches!(args[0], Expr::Path { .. }));
                assert!(matches!(args[1], Expr::Shorthand { .. }));
            }
            other => panic!("Expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_quantifier_arity_is_enforced() {
        let err = parse("any(ingredients)").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseGeneric);
        assert!(err.to_string().contains("exactly two arguments"));

        let err = parse("contains(a, \"x\", \"y\")").unwrap_err();
        assert!(err.to_string().contains("one or two arguments"));
    }

    #[test]
    fn test_comparison_does_not_chain() {
        let err = parse("a > 1 > 2").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseGeneric);
        assert!(err.to_string().starts_with("Expected end of input"));
    }

    #[test]
    fn test_comparison_requires_literal_rhs() {
        let err = parse("a > b").unwrap_err();
        assert!(err.to_string().starts_with("Expected a literal value"));
    }

    #[test]
    fn test_eq_not_allowed_in_shorthand() {
        let err = parse("a: =5").unwrap_err();
        assert!(err.to_string().contains("Only ordering comparisons"));
    }

    #[test]
    fn test_error_reports_position_and_lexeme() {
        let err = parse("a AND AND b").unwrap_err();
        assert_eq!((err.line(), err.column()), (1, 7));
        assert_eq!(err.lexeme(), "AND");
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = parse("   ").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseGeneric);
        assert_eq!((err.line(), err.column()), (1, 1));
        assert_eq!(err.lexeme(), "end of input");
    }

    #[test]
    fn test_unbalanced_parenthesis() {
        let err = parse("(a AND b").unwrap_err();
        assert!(err.to_string().starts_with("Expected ')'"));
    }
}
