#![allow(dead_code)]

use proptest::prelude::*;
use rulekit::{CompareOp, Record, Value};

// --- Fixed field schema ---
// user.age    : i64 (0..=120)
// user.status : string, one of {"active", "inactive", "suspended"}
// user.banned : bool
// user.region : string, one of {"us-east", "us-west", "eu", "ap"}

const STATUSES: &[&str] = &["active", "inactive", "suspended"];
const REGIONS: &[&str] = &["us-east", "us-west", "eu", "ap"];

/// Generate a record that aligns with the fixed field schema. Any field may
/// be missing.
pub fn arb_record() -> impl Strategy<Value = Record> {
    (
        prop::option::of(0_i64..=120),
        prop::option::of(prop::sample::select(STATUSES)),
        prop::option::of(any::<bool>()),
        prop::option::of(prop::sample::select(REGIONS)),
    )
        .prop_map(|(age, status, banned, region)| {
            let mut record = Record::new();
            if let Some(age) = age {
                record.insert("user.age", Value::Int(age));
            }
            if let Some(status) = status {
                record.insert("user.status", Value::from(status));
            }
            if let Some(banned) = banned {
                record.insert("user.banned", Value::Bool(banned));
            }
            if let Some(region) = region {
                record.insert("user.region", Value::from(region));
            }
            record
        })
}

/// Any value that has a literal form: no NaN or infinities, shallow lists.
pub fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::Int),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        any::<String>().prop_map(Value::String),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::List)
    })
}

/// A generated rule: its DSL text plus a direct evaluator over the same
/// comparisons, computed with `Value::compare`.
#[derive(Debug, Clone)]
pub struct GenRule {
    pub text: String,
    pub oracle: Oracle,
}

#[derive(Debug, Clone)]
pub enum Oracle {
    Leaf {
        path: &'static str,
        op: CompareOp,
        value: Value,
    },
    And(Box<Oracle>, Box<Oracle>),
    Or(Box<Oracle>, Box<Oracle>),
    Not(Box<Oracle>),
}

impl Oracle {
    pub fn eval(&self, record: &Record) -> bool {
        match self {
            Oracle::Leaf { path, op, value } => record
                .get(path)
                .cloned()
                .unwrap_or(Value::Null)
                .compare(op.clone(), value)
                .unwrap_or(false),
            Oracle::And(a, b) => a.eval(record) && b.eval(record),
            Oracle::Or(a, b) => a.eval(record) || b.eval(record),
            Oracle::Not(inner) => !inner.eval(record),
        }
    }
}

fn leaf(path: &'static str, op: CompareOp, value: Value, literal: String) -> GenRule {
    GenRule {
        text: format!("{path} {op} {literal}"),
        oracle: Oracle::Leaf { path, op, value },
    }
}

fn arb_order_op() -> impl Strategy<Value = CompareOp> {
    prop::sample::select(vec![
        CompareOp::Eq,
        CompareOp::Neq,
        CompareOp::Gt,
        CompareOp::Gte,
        CompareOp::Lt,
        CompareOp::Lte,
    ])
}

fn arb_leaf_rule() -> impl Strategy<Value = GenRule> {
    prop_oneof![
        (arb_order_op(), 0_i64..=120)
            .prop_map(|(op, n)| leaf("user.age", op, Value::Int(n), n.to_string())),
        (prop::sample::select(STATUSES), any::<bool>()).prop_map(|(s, eq)| {
            let op = if eq { CompareOp::Eq } else { CompareOp::Neq };
            leaf("user.status", op, Value::from(s), format!("'{s}'"))
        }),
        any::<bool>()
            .prop_map(|b| leaf("user.banned", CompareOp::Eq, Value::Bool(b), b.to_string())),
        prop::sample::subsequence(REGIONS, 0..=REGIONS.len()).prop_map(|regions| {
            let literal = regions
                .iter()
                .map(|r| format!("'{r}'"))
                .collect::<Vec<_>>()
                .join(", ");
            leaf(
                "user.region",
                CompareOp::In,
                Value::from(regions),
                format!("[{literal}]"),
            )
        }),
    ]
}

/// Generate a rule tree of bounded depth over the fixed schema.
pub fn arb_rule() -> impl Strategy<Value = GenRule> {
    arb_leaf_rule().prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| GenRule {
                text: format!("({}) and ({})", a.text, b.text),
                oracle: Oracle::And(Box::new(a.oracle), Box::new(b.oracle)),
            }),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| GenRule {
                text: format!("({}) or ({})", a.text, b.text),
                oracle: Oracle::Or(Box::new(a.oracle), Box::new(b.oracle)),
            }),
            inner.prop_map(|a| GenRule {
                text: format!("not ({})", a.text),
                oracle: Oracle::Not(Box::new(a.oracle)),
            }),
        ]
    })
}
