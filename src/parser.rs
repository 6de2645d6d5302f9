use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, trace};

use crate::ast::{self, Comparator, Node};
use crate::context::SearchOptions;
use crate::errors::{JmesPathError, Result};
use crate::interpreter::TreeInterpreter;
use crate::lexer::{self, Token, TokenKind};

/// Tokens whose binding power is below this end a projection's right side.
const PROJECTION_STOP: u8 = 10;

/// Deepest AST the parser will build. Parsing and evaluation both recurse
/// once per level.
const MAX_NESTING: usize = 128;

pub const DEFAULT_CACHE_SIZE: usize = 128;

/// A compiled expression: the source text and its AST.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResult {
    pub expression: String,
    pub ast: Node,
}

impl ParsedResult {
    /// Evaluate against `value`. Errors carry this expression's text.
    pub fn search(&self, value: &Value, options: &SearchOptions) -> Result<Value> {
        let interpreter = TreeInterpreter::new(options);
        interpreter
            .visit(&self.ast, value)
            .map_err(|e| e.with_expression(&self.expression))
    }

    /// Graphviz rendering of the AST, for debugging.
    pub fn render_dot_file(&self) -> String {
        ast::render_dot(&self.ast)
    }
}

/// Pratt parser with a bounded expression cache.
///
/// When the cache outgrows its capacity every entry survives with
/// probability one half. A hit always returns what a fresh parse would.
pub struct Parser {
    cache: Mutex<HashMap<String, Arc<ParsedResult>>>,
    max_cache_size: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_SIZE)
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_cache_size: usize) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            max_cache_size,
        }
    }

    pub fn parse(&self, expression: &str) -> Result<Arc<ParsedResult>> {
        if let Some(hit) = self.cache.lock().get(expression) {
            trace!(expression, "parse cache hit");
            return Ok(Arc::clone(hit));
        }

        let parsed = Arc::new(Self::do_parse(expression)?);
        debug!(expression, "compiled expression");

        let mut cache = self.cache.lock();
        cache.insert(expression.to_string(), Arc::clone(&parsed));
        if cache.len() > self.max_cache_size {
            let before = cache.len();
            let mut rng = rand::thread_rng();
            cache.retain(|_, _| rng.gen_bool(0.5));
            debug!(before, after = cache.len(), "evicted parsed expressions");
        }
        Ok(parsed)
    }

    pub fn purge_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    fn do_parse(expression: &str) -> Result<ParsedResult> {
        let tokens = lexer::tokenize(expression)?
            .collect::<Result<Vec<Token>>>()
            .map_err(|e| e.with_expression(expression))?;
        let mut stream = TokenStream {
            tokens,
            index: 0,
            depth: 0,
        };
        let ast = stream
            .parse_root()
            .map_err(|e| e.with_expression(expression))?;
        Ok(ParsedResult {
            expression: expression.to_string(),
            ast,
        })
    }
}

/// Parse state for a single expression: the materialised token list and a
/// cursor into it. The list always ends with `Eof`. `depth` bounds how far
/// the AST under construction can nest.
struct TokenStream {
    tokens: Vec<Token>,
    index: usize,
    depth: usize,
}

impl TokenStream {
    fn parse_root(&mut self) -> Result<Node> {
        let node = self.expression(0)?;
        if self.current_kind() != TokenKind::Eof {
            return Err(error_for_token(self.lookahead_token(0), None));
        }
        Ok(node)
    }

    fn expression(&mut self, binding_power: u8) -> Result<Node> {
        let depth = self.depth;
        let result = self.nested_expression(binding_power);
        self.depth = depth;
        result
    }

    fn nested_expression(&mut self, binding_power: u8) -> Result<Node> {
        self.descend()?;
        let left_token = self.lookahead_token(0).clone();
        self.advance();
        let mut left = self.nud(left_token)?;
        let mut current = self.current_kind();
        while binding_power < current.binding_power() {
            if !has_led(current) {
                return Err(error_for_token(self.lookahead_token(0), None));
            }
            // each led wraps `left` one level deeper
            self.descend()?;
            self.advance();
            left = self.led(current, left)?;
            current = self.current_kind();
        }
        Ok(left)
    }

    fn nud(&mut self, token: Token) -> Result<Node> {
        match token.kind {
            TokenKind::Literal => Ok(ast::literal(token.value)),
            TokenKind::UnquotedIdentifier => Ok(ast::field(token.display_value())),
            TokenKind::QuotedIdentifier => {
                if self.current_kind() == TokenKind::Lparen {
                    let next = self.lookahead_token(0);
                    return Err(JmesPathError::Parse {
                        position: token.start,
                        token_value: next.display_value(),
                        token_kind: next.kind,
                        reason: Some("quoted identifiers cannot be used as a function name".into()),
                        expression: None,
                    });
                }
                Ok(ast::field(token.display_value()))
            }
            TokenKind::Star => {
                let right = if self.current_kind() == TokenKind::Rbracket {
                    ast::identity()
                } else {
                    self.parse_projection_rhs(TokenKind::Star.binding_power())?
                };
                Ok(ast::value_projection(ast::identity(), right))
            }
            TokenKind::Filter => self.led_filter(ast::identity()),
            TokenKind::Lbrace => self.parse_multi_select_hash(),
            TokenKind::Lparen => {
                let expression = self.expression(0)?;
                self.match_token(TokenKind::Rparen)?;
                Ok(expression)
            }
            TokenKind::Flatten => {
                let left = ast::flatten(ast::identity());
                let right = self.parse_projection_rhs(TokenKind::Flatten.binding_power())?;
                Ok(ast::projection(left, right))
            }
            TokenKind::Not => {
                let expression = self.expression(TokenKind::Not.binding_power())?;
                Ok(ast::not_expression(expression))
            }
            TokenKind::Lbracket => match self.current_kind() {
                TokenKind::Number | TokenKind::Colon => {
                    let right = self.parse_index_expression()?;
                    self.project_if_slice(ast::identity(), right)
                }
                TokenKind::Star if self.lookahead_token(1).kind == TokenKind::Rbracket => {
                    self.advance();
                    self.advance();
                    let right = self.parse_projection_rhs(TokenKind::Star.binding_power())?;
                    Ok(ast::projection(ast::identity(), right))
                }
                _ => self.parse_multi_select_list(),
            },
            TokenKind::Current => Ok(ast::current_node()),
            TokenKind::Expref => {
                let expression = self.expression(TokenKind::Expref.binding_power())?;
                Ok(ast::expref(expression))
            }
            _ => Err(error_for_token(&token, None)),
        }
    }

    fn led(&mut self, kind: TokenKind, left: Node) -> Result<Node> {
        match kind {
            TokenKind::Dot => {
                if self.current_kind() == TokenKind::Star {
                    self.advance();
                    let right = self.parse_projection_rhs(TokenKind::Dot.binding_power())?;
                    Ok(ast::value_projection(left, right))
                } else {
                    let right = self.parse_dot_rhs(TokenKind::Dot.binding_power())?;
                    Ok(ast::subexpression(left, right))
                }
            }
            TokenKind::Pipe => {
                let right = self.expression(TokenKind::Pipe.binding_power())?;
                Ok(ast::pipe(left, right))
            }
            TokenKind::Or => {
                let right = self.expression(TokenKind::Or.binding_power())?;
                Ok(ast::or_expression(left, right))
            }
            TokenKind::And => {
                let right = self.expression(TokenKind::And.binding_power())?;
                Ok(ast::and_expression(left, right))
            }
            TokenKind::Lparen => self.led_function_call(left),
            TokenKind::Filter => self.led_filter(left),
            TokenKind::Eq => self.parse_comparator(left, Comparator::Eq, kind),
            TokenKind::Ne => self.parse_comparator(left, Comparator::Ne, kind),
            TokenKind::Gt => self.parse_comparator(left, Comparator::Gt, kind),
            TokenKind::Gte => self.parse_comparator(left, Comparator::Gte, kind),
            TokenKind::Lt => self.parse_comparator(left, Comparator::Lt, kind),
            TokenKind::Lte => self.parse_comparator(left, Comparator::Lte, kind),
            TokenKind::Flatten => {
                let left = ast::flatten(left);
                let right = self.parse_projection_rhs(TokenKind::Flatten.binding_power())?;
                Ok(ast::projection(left, right))
            }
            TokenKind::Lbracket => match self.current_kind() {
                TokenKind::Number | TokenKind::Colon => {
                    let right = self.parse_index_expression()?;
                    match (left, right) {
                        (left @ Node::IndexExpression(_), right @ Node::Index(_)) => {
                            Ok(ast::index_expression(left, right))
                        }
                        (left, right) => self.project_if_slice(left, right),
                    }
                }
                _ => {
                    self.match_token(TokenKind::Star)?;
                    self.match_token(TokenKind::Rbracket)?;
                    let right = self.parse_projection_rhs(TokenKind::Star.binding_power())?;
                    Ok(ast::projection(left, right))
                }
            },
            _ => Err(error_for_token(&self.tokens[self.index - 1], None)),
        }
    }

    fn led_function_call(&mut self, left: Node) -> Result<Node> {
        let Node::Field(name) = left else {
            // index - 1 is the '(' token, index - 2 the last token of `left`.
            let prev = &self.tokens[self.index.saturating_sub(2)];
            return Err(error_for_token(
                prev,
                Some(format!("Invalid function name '{}'", prev.display_value())),
            ));
        };
        let mut args = Vec::new();
        while self.current_kind() != TokenKind::Rparen {
            args.push(self.expression(0)?);
            match self.current_kind() {
                TokenKind::Comma => self.advance(),
                TokenKind::Rparen => {}
                _ => return Err(error_for_token(self.lookahead_token(0), None)),
            }
        }
        self.match_token(TokenKind::Rparen)?;
        Ok(ast::function_expression(name, args))
    }

    fn led_filter(&mut self, left: Node) -> Result<Node> {
        let condition = self.expression(0)?;
        self.match_token(TokenKind::Rbracket)?;
        let right = if self.current_kind() == TokenKind::Flatten {
            ast::identity()
        } else {
            self.parse_projection_rhs(TokenKind::Filter.binding_power())?
        };
        Ok(ast::filter_projection(left, right, condition))
    }

    fn parse_comparator(&mut self, left: Node, op: Comparator, kind: TokenKind) -> Result<Node> {
        let right = self.expression(kind.binding_power())?;
        Ok(ast::comparator(op, left, right))
    }

    /// Cursor sits just after `[`, on a number or colon.
    fn parse_index_expression(&mut self) -> Result<Node> {
        if self.lookahead_token(0).kind == TokenKind::Colon
            || self.lookahead_token(1).kind == TokenKind::Colon
        {
            return self.parse_slice_expression();
        }
        let value = self.number_value(0)?;
        self.advance();
        self.match_token(TokenKind::Rbracket)?;
        Ok(ast::index(value))
    }

    /// `[start:stop:step]`, every part optional, at most two colons.
    fn parse_slice_expression(&mut self) -> Result<Node> {
        let mut parts: [Option<i64>; 3] = [None; 3];
        let mut part = 0;
        while self.current_kind() != TokenKind::Rbracket {
            match self.current_kind() {
                TokenKind::Colon => {
                    part += 1;
                    if part == 3 {
                        return Err(error_for_token(self.lookahead_token(0), None));
                    }
                    self.advance();
                }
                TokenKind::Number if parts[part].is_none() => {
                    parts[part] = Some(self.number_value(0)?);
                    self.advance();
                }
                _ => return Err(error_for_token(self.lookahead_token(0), None)),
            }
        }
        self.match_token(TokenKind::Rbracket)?;
        Ok(ast::slice(parts[0], parts[1], parts[2]))
    }

    fn project_if_slice(&mut self, left: Node, right: Node) -> Result<Node> {
        let is_slice = matches!(right, Node::Slice { .. });
        let index_expr = ast::index_expression(left, right);
        if is_slice {
            let rhs = self.parse_projection_rhs(TokenKind::Star.binding_power())?;
            Ok(ast::projection(index_expr, rhs))
        } else {
            Ok(index_expr)
        }
    }

    fn parse_multi_select_list(&mut self) -> Result<Node> {
        let mut expressions = Vec::new();
        loop {
            expressions.push(self.expression(0)?);
            if self.current_kind() == TokenKind::Rbracket {
                break;
            }
            self.match_token(TokenKind::Comma)?;
        }
        self.match_token(TokenKind::Rbracket)?;
        Ok(ast::multi_select_list(expressions))
    }

    fn parse_multi_select_hash(&mut self) -> Result<Node> {
        let mut pairs = Vec::new();
        loop {
            let key_token = self.lookahead_token(0).clone();
            self.match_multiple_tokens(&[
                TokenKind::QuotedIdentifier,
                TokenKind::UnquotedIdentifier,
            ])?;
            self.match_token(TokenKind::Colon)?;
            let value = self.expression(0)?;
            pairs.push(ast::key_val_pair(key_token.display_value(), value));
            match self.current_kind() {
                TokenKind::Comma => self.advance(),
                TokenKind::Rbrace => {
                    self.advance();
                    break;
                }
                _ => return Err(error_for_token(self.lookahead_token(0), None)),
            }
        }
        Ok(ast::multi_select_dict(pairs))
    }

    fn parse_projection_rhs(&mut self, binding_power: u8) -> Result<Node> {
        let current = self.current_kind();
        if current.binding_power() < PROJECTION_STOP {
            return Ok(ast::identity());
        }
        match current {
            TokenKind::Lbracket | TokenKind::Filter => self.expression(binding_power),
            TokenKind::Dot => {
                self.match_token(TokenKind::Dot)?;
                self.parse_dot_rhs(binding_power)
            }
            _ => Err(error_for_token(self.lookahead_token(0), None)),
        }
    }

    /// After a `.`: identifier, `*`, multi-select list or hash, or a
    /// function call (an identifier followed by `(`).
    fn parse_dot_rhs(&mut self, binding_power: u8) -> Result<Node> {
        match self.current_kind() {
            TokenKind::QuotedIdentifier | TokenKind::UnquotedIdentifier | TokenKind::Star => {
                self.expression(binding_power)
            }
            TokenKind::Lbracket => {
                self.advance();
                self.parse_multi_select_list()
            }
            TokenKind::Lbrace => {
                self.advance();
                self.parse_multi_select_hash()
            }
            _ => Err(error_for_token(self.lookahead_token(0), None)),
        }
    }

    fn match_token(&mut self, kind: TokenKind) -> Result<()> {
        if self.current_kind() == kind {
            self.advance();
            Ok(())
        } else {
            Err(error_for_token(self.lookahead_token(0), None))
        }
    }

    fn match_multiple_tokens(&mut self, kinds: &[TokenKind]) -> Result<()> {
        if kinds.contains(&self.current_kind()) {
            self.advance();
            Ok(())
        } else {
            Err(error_for_token(self.lookahead_token(0), None))
        }
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(error_for_token(
                self.lookahead_token(0),
                Some("expression nested too deeply".to_string()),
            ));
        }
        Ok(())
    }

    fn number_value(&self, offset: usize) -> Result<i64> {
        let token = self.lookahead_token(offset);
        token
            .value
            .as_i64()
            .ok_or_else(|| error_for_token(token, None))
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    fn current_kind(&self) -> TokenKind {
        self.lookahead_token(0).kind
    }

    fn lookahead_token(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.index + offset).min(last)]
    }
}

fn has_led(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Dot | Pipe | Or | And | Lparen | Filter | Eq | Ne | Gt | Gte | Lt | Lte | Flatten | Lbracket
    )
}

/// Parse error for `token`; hitting `eof` means the expression was cut short.
fn error_for_token(token: &Token, reason: Option<String>) -> JmesPathError {
    if token.kind == TokenKind::Eof {
        JmesPathError::IncompleteExpression {
            position: token.start,
            expression: None,
        }
    } else {
        JmesPathError::Parse {
            position: token.start,
            token_value: token.display_value(),
            token_kind: token.kind,
            reason,
            expression: None,
        }
    }
}
