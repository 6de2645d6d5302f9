use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

/// Comparator symbol stored on a `comparator` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparator {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "eq",
            Comparator::Ne => "ne",
            Comparator::Lt => "lt",
            Comparator::Lte => "lte",
            Comparator::Gt => "gt",
            Comparator::Gte => "gte",
        }
    }
}

/// One `key: expression` entry of a multi-select hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValPair {
    pub key: String,
    pub value: Node,
}

/// Expression tree produced by the parser. Nodes are never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Node {
    Identity,
    Current,
    Field(String),
    Literal(Value),
    /// Children are threaded left to right.
    Subexpression(Vec<Node>),
    IndexExpression(Vec<Node>),
    Index(i64),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    Pipe(Box<Node>, Box<Node>),
    Comparator {
        op: Comparator,
        left: Box<Node>,
        right: Box<Node>,
    },
    OrExpression(Box<Node>, Box<Node>),
    AndExpression(Box<Node>, Box<Node>),
    NotExpression(Box<Node>),
    Flatten(Box<Node>),
    Projection {
        left: Box<Node>,
        right: Box<Node>,
    },
    ValueProjection {
        left: Box<Node>,
        right: Box<Node>,
    },
    FilterProjection {
        left: Box<Node>,
        right: Box<Node>,
        condition: Box<Node>,
    },
    MultiSelectList(Vec<Node>),
    MultiSelectDict(Vec<KeyValPair>),
    FunctionExpression {
        name: String,
        args: Vec<Node>,
    },
    Expref(Box<Node>),
}

impl Node {
    /// The snake_case node type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Identity => "identity",
            Node::Current => "current",
            Node::Field(_) => "field",
            Node::Literal(_) => "literal",
            Node::Subexpression(_) => "subexpression",
            Node::IndexExpression(_) => "index_expression",
            Node::Index(_) => "index",
            Node::Slice { .. } => "slice",
            Node::Pipe(..) => "pipe",
            Node::Comparator { .. } => "comparator",
            Node::OrExpression(..) => "or_expression",
            Node::AndExpression(..) => "and_expression",
            Node::NotExpression(_) => "not_expression",
            Node::Flatten(_) => "flatten",
            Node::Projection { .. } => "projection",
            Node::ValueProjection { .. } => "value_projection",
            Node::FilterProjection { .. } => "filter_projection",
            Node::MultiSelectList(_) => "multi_select_list",
            Node::MultiSelectDict(_) => "multi_select_dict",
            Node::FunctionExpression { .. } => "function_expression",
            Node::Expref(_) => "expref",
        }
    }

    /// Child nodes in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Identity
            | Node::Current
            | Node::Field(_)
            | Node::Literal(_)
            | Node::Index(_)
            | Node::Slice { .. } => Vec::new(),
            Node::Subexpression(children)
            | Node::IndexExpression(children)
            | Node::MultiSelectList(children)
            | Node::FunctionExpression { args: children, .. } => children.iter().collect(),
            Node::Pipe(l, r) | Node::OrExpression(l, r) | Node::AndExpression(l, r) => {
                vec![l.as_ref(), r.as_ref()]
            }
            Node::Comparator { left, right, .. }
            | Node::Projection { left, right }
            | Node::ValueProjection { left, right } => vec![left.as_ref(), right.as_ref()],
            Node::FilterProjection {
                left,
                right,
                condition,
            } => vec![left.as_ref(), right.as_ref(), condition.as_ref()],
            Node::NotExpression(child) | Node::Flatten(child) | Node::Expref(child) => {
                vec![child.as_ref()]
            }
            Node::MultiSelectDict(pairs) => pairs.iter().map(|p| &p.value).collect(),
        }
    }

    fn label(&self) -> String {
        match self {
            Node::Field(name) => format!("field({name})"),
            Node::Literal(value) => format!("literal({value})"),
            Node::Index(i) => format!("index({i})"),
            Node::Slice { start, stop, step } => {
                let part = |p: &Option<i64>| p.map(|n| n.to_string()).unwrap_or_default();
                format!("slice({}:{}:{})", part(start), part(stop), part(step))
            }
            Node::Comparator { op, .. } => format!("comparator({})", op.as_str()),
            Node::FunctionExpression { name, .. } => format!("function_expression({name})"),
            Node::MultiSelectDict(pairs) => format!(
                "multi_select_dict({})",
                pairs.iter().map(|p| p.key.as_str()).collect::<Vec<_>>().join(", ")
            ),
            other => other.kind().to_string(),
        }
    }
}

pub fn identity() -> Node {
    Node::Identity
}

pub fn current_node() -> Node {
    Node::Current
}

pub fn field(name: impl Into<String>) -> Node {
    Node::Field(name.into())
}

pub fn literal(value: Value) -> Node {
    Node::Literal(value)
}

/// `left.right`, appending to `left` when it is already a subexpression
/// chain instead of nesting.
pub fn subexpression(left: Node, right: Node) -> Node {
    match left {
        Node::Subexpression(mut children) => {
            children.push(right);
            Node::Subexpression(children)
        }
        other => Node::Subexpression(vec![other, right]),
    }
}

/// `left[right]`, appending to `left` when it is already an index chain.
pub fn index_expression(left: Node, right: Node) -> Node {
    match left {
        Node::IndexExpression(mut children) => {
            children.push(right);
            Node::IndexExpression(children)
        }
        other => Node::IndexExpression(vec![other, right]),
    }
}

pub fn index(value: i64) -> Node {
    Node::Index(value)
}

pub fn slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Node {
    Node::Slice { start, stop, step }
}

pub fn pipe(left: Node, right: Node) -> Node {
    Node::Pipe(Box::new(left), Box::new(right))
}

pub fn comparator(op: Comparator, left: Node, right: Node) -> Node {
    Node::Comparator {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn or_expression(left: Node, right: Node) -> Node {
    Node::OrExpression(Box::new(left), Box::new(right))
}

pub fn and_expression(left: Node, right: Node) -> Node {
    Node::AndExpression(Box::new(left), Box::new(right))
}

pub fn not_expression(expression: Node) -> Node {
    Node::NotExpression(Box::new(expression))
}

pub fn flatten(node: Node) -> Node {
    Node::Flatten(Box::new(node))
}

pub fn projection(left: Node, right: Node) -> Node {
    Node::Projection {
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn value_projection(left: Node, right: Node) -> Node {
    Node::ValueProjection {
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn filter_projection(left: Node, right: Node, condition: Node) -> Node {
    Node::FilterProjection {
        left: Box::new(left),
        right: Box::new(right),
        condition: Box::new(condition),
    }
}

pub fn multi_select_list(nodes: Vec<Node>) -> Node {
    Node::MultiSelectList(nodes)
}

pub fn key_val_pair(key: impl Into<String>, value: Node) -> KeyValPair {
    KeyValPair {
        key: key.into(),
        value,
    }
}

pub fn multi_select_dict(pairs: Vec<KeyValPair>) -> Node {
    Node::MultiSelectDict(pairs)
}

pub fn function_expression(name: impl Into<String>, args: Vec<Node>) -> Node {
    Node::FunctionExpression {
        name: name.into(),
        args,
    }
}

pub fn expref(expression: Node) -> Node {
    Node::Expref(Box::new(expression))
}

/// Render a node tree as a Graphviz digraph.
pub fn render_dot(root: &Node) -> String {
    let mut out = String::from("digraph AST {\n");
    let mut next_id = 0usize;
    render_dot_node(root, &mut next_id, &mut out);
    out.push_str("}\n");
    out
}

fn render_dot_node(node: &Node, next_id: &mut usize, out: &mut String) -> usize {
    let id = *next_id;
    *next_id += 1;
    let label = node.label().replace('\\', "\\\\").replace('"', "\\\"");
    // Writing to a String cannot fail.
    let _ = writeln!(out, "  node{id} [label=\"{label}\"];");
    for child in node.children() {
        let child_id = render_dot_node(child, next_id, out);
        let _ = writeln!(out, "  node{id} -> node{child_id};");
    }
    id
}
