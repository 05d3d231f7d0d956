use crate::{CompareOp, Parameter, Value};

/// Parsed body of an executor's `execute` method.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Literal(Value),
    /// `$target["a"]["b"]`
    Target(Vec<String>),
    /// `$parameters["name"]` or `$parameters[0]`
    Parameter(Parameter),
    /// `$this->name`
    This(String),
    /// `$operators["name"](args)`
    Call {
        name: String,
        args: Vec<Node>,
    },
    Compare {
        left: Box<Node>,
        op: CompareOp,
        right: Box<Node>,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Xor(Box<Node>, Box<Node>),
    Not(Box<Node>),
}

impl Node {
    /// Every `$this->` field the program reads.
    pub(crate) fn constants(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_constants(&mut out);
        out
    }

    fn collect_constants<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::This(name) => out.push(name),
            Node::Call { args, .. } => {
                for arg in args {
                    arg.collect_constants(out);
                }
            }
            Node::Compare { left, right, .. }
            | Node::And(left, right)
            | Node::Or(left, right)
            | Node::Xor(left, right) => {
                left.collect_constants(out);
                right.collect_constants(out);
            }
            Node::Not(inner) => inner.collect_constants(out),
            Node::Literal(_) | Node::Target(_) | Node::Parameter(_) => {}
        }
    }
}
