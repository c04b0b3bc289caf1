//! Binary and unary operators over [`Value`]s.
//!
//! Every binary operator dispatches through a `TYPE_COUNT x TYPE_COUNT` table
//! indexed by the resolved [`TypeTag`] of each operand. The tables are the
//! single source of truth for how error, absent and void propagate:
//!
//! * error dominates every scalar;
//! * absent is the identity for accumulation (`absent + 1` is `1`);
//! * void with a number is void;
//! * strings and booleans in arithmetic are errors;
//! * arithmetic with an array or map is absent.
//!
//! Int arithmetic that overflows is redone in floating point.

use std::cmp::Ordering;

use crate::value::{TYPE_COUNT, Value};

pub type BinaryFn = fn(&Value, &Value) -> Value;
type DispositionTable = [[BinaryFn; TYPE_COUNT]; TYPE_COUNT];

fn err(_: &Value, _: &Value) -> Value {
    Value::error()
}

fn absn(_: &Value, _: &Value) -> Value {
    Value::absent()
}

fn void(_: &Value, _: &Value) -> Value {
    Value::void()
}

fn lhs(a: &Value, _: &Value) -> Value {
    a.clone()
}

fn rhs(_: &Value, b: &Value) -> Value {
    b.clone()
}

macro_rules! arithmetic_table {
    ($ii:expr, $if_:expr, $fi:expr, $ff:expr) => {
        [
            //           ERROR  ABSENT VOID   STRING INT    FLOAT  BOOL   ARRAY  MAP
            /* ERROR  */ [err,  err,   err,   err,   err,   err,   err,   absn,  absn],
            /* ABSENT */ [err,  absn,  absn,  err,   rhs,   rhs,   err,   absn,  absn],
            /* VOID   */ [err,  absn,  void,  err,   void,  void,  err,   absn,  absn],
            /* STRING */ [err,  err,   err,   err,   err,   err,   err,   absn,  absn],
            /* INT    */ [err,  lhs,   void,  err,   $ii,   $if_,  err,   absn,  absn],
            /* FLOAT  */ [err,  lhs,   void,  err,   $fi,   $ff,   err,   absn,  absn],
            /* BOOL   */ [err,  err,   err,   err,   err,   err,   err,   absn,  absn],
            /* ARRAY  */ [absn, absn,  absn,  absn,  absn,  absn,  absn,  absn,  absn],
            /* MAP    */ [absn, absn,  absn,  absn,  absn,  absn,  absn,  absn,  absn],
        ]
    };
}

/// Builds the int/float cells of an operator whose float form is a plain
/// `f64` expression.
macro_rules! float_cells {
    ($name_if:ident, $name_fi:ident, $name_ff:ident, |$x:ident, $y:ident| $body:expr) => {
        fn $name_if(a: &Value, b: &Value) -> Value {
            let ($x, $y) = (a.int_value() as f64, b.float_value());
            Value::from_float($body)
        }
        fn $name_fi(a: &Value, b: &Value) -> Value {
            let ($x, $y) = (a.float_value(), b.int_value() as f64);
            Value::from_float($body)
        }
        fn $name_ff(a: &Value, b: &Value) -> Value {
            let ($x, $y) = (a.float_value(), b.float_value());
            Value::from_float($body)
        }
    };
}

// ---------------------------------------------------------------------------
// + - *
// ---------------------------------------------------------------------------

fn plus_ii(a: &Value, b: &Value) -> Value {
    let (x, y) = (a.int_value(), b.int_value());
    match x.checked_add(y) {
        Some(sum) => Value::from_int(sum),
        None => Value::from_float(x as f64 + y as f64),
    }
}
float_cells!(plus_if, plus_fi, plus_ff, |x, y| x + y);

fn minus_ii(a: &Value, b: &Value) -> Value {
    let (x, y) = (a.int_value(), b.int_value());
    match x.checked_sub(y) {
        Some(diff) => Value::from_int(diff),
        None => Value::from_float(x as f64 - y as f64),
    }
}
float_cells!(minus_if, minus_fi, minus_ff, |x, y| x - y);

fn times_ii(a: &Value, b: &Value) -> Value {
    let (x, y) = (a.int_value(), b.int_value());
    match x.checked_mul(y) {
        Some(product) => Value::from_int(product),
        None => Value::from_float(x as f64 * y as f64),
    }
}
float_cells!(times_if, times_fi, times_ff, |x, y| x * y);

// ---------------------------------------------------------------------------
// / // %
// ---------------------------------------------------------------------------

/// Exact quotients stay ints; everything else, including division by zero,
/// is float.
fn divide_ii(a: &Value, b: &Value) -> Value {
    let (x, y) = (a.int_value(), b.int_value());
    if y != 0 && x.checked_rem(y) == Some(0) {
        if let Some(q) = x.checked_div(y) {
            return Value::from_int(q);
        }
    }
    Value::from_float(x as f64 / y as f64)
}
float_cells!(divide_if, divide_fi, divide_ff, |x, y| x / y);

fn int_divide_ii(a: &Value, b: &Value) -> Value {
    let (x, y) = (a.int_value(), b.int_value());
    if y == 0 {
        return Value::from_float(x as f64 / y as f64);
    }
    match (x.checked_div(y), x.checked_rem(y)) {
        (Some(q), Some(r)) => {
            // Round toward negative infinity.
            if r != 0 && ((r < 0) != (y < 0)) {
                Value::from_int(q - 1)
            } else {
                Value::from_int(q)
            }
        }
        _ => Value::from_float((x as f64 / y as f64).floor()),
    }
}
float_cells!(int_divide_if, int_divide_fi, int_divide_ff, |x, y| (x / y).floor());

/// Result takes the sign of the divisor.
fn modulus_ii(a: &Value, b: &Value) -> Value {
    let (x, y) = (a.int_value(), b.int_value());
    if y == 0 {
        return Value::from_float(x as f64 / y as f64);
    }
    let r = x.checked_rem(y).unwrap_or(0);
    if r != 0 && ((r < 0) != (y < 0)) {
        Value::from_int(r + y)
    } else {
        Value::from_int(r)
    }
}
float_cells!(modulus_if, modulus_fi, modulus_ff, |x, y| x - y * (x / y).floor());

// ---------------------------------------------------------------------------
// **
// ---------------------------------------------------------------------------

fn power_ii(a: &Value, b: &Value) -> Value {
    let (x, y) = (a.int_value(), b.int_value());
    if let Ok(exp) = u32::try_from(y) {
        if let Some(p) = x.checked_pow(exp) {
            return Value::from_int(p);
        }
    }
    Value::from_float((x as f64).powf(y as f64))
}
float_cells!(power_if, power_fi, power_ff, |x, y| x.powf(y));

static PLUS: DispositionTable = arithmetic_table!(plus_ii, plus_if, plus_fi, plus_ff);
static MINUS: DispositionTable = arithmetic_table!(minus_ii, minus_if, minus_fi, minus_ff);
static TIMES: DispositionTable = arithmetic_table!(times_ii, times_if, times_fi, times_ff);
static DIVIDE: DispositionTable = arithmetic_table!(divide_ii, divide_if, divide_fi, divide_ff);
static INT_DIVIDE: DispositionTable =
    arithmetic_table!(int_divide_ii, int_divide_if, int_divide_fi, int_divide_ff);
static MODULUS: DispositionTable =
    arithmetic_table!(modulus_ii, modulus_if, modulus_fi, modulus_ff);
static POWER: DispositionTable = arithmetic_table!(power_ii, power_if, power_fi, power_ff);

// ---------------------------------------------------------------------------
// . (concatenation)
// ---------------------------------------------------------------------------

fn dot_ss(a: &Value, b: &Value) -> Value {
    Value::from_string(format!("{a}{b}"))
}

static DOT: DispositionTable = [
    //           ERROR  ABSENT VOID    STRING  INT     FLOAT   BOOL    ARRAY  MAP
    /* ERROR  */ [err,  err,   err,    err,    err,    err,    err,    err,   err],
    /* ABSENT */ [err,  absn,  rhs,    rhs,    rhs,    rhs,    rhs,    err,   err],
    /* VOID   */ [err,  lhs,   void,   rhs,    rhs,    rhs,    rhs,    err,   err],
    /* STRING */ [err,  lhs,   lhs,    dot_ss, dot_ss, dot_ss, dot_ss, err,   err],
    /* INT    */ [err,  lhs,   lhs,    dot_ss, dot_ss, dot_ss, dot_ss, err,   err],
    /* FLOAT  */ [err,  lhs,   lhs,    dot_ss, dot_ss, dot_ss, dot_ss, err,   err],
    /* BOOL   */ [err,  lhs,   lhs,    dot_ss, dot_ss, dot_ss, dot_ss, err,   err],
    /* ARRAY  */ [err,  err,   err,    err,    err,    err,    err,    err,   err],
    /* MAP    */ [err,  err,   err,    err,    err,    err,    err,    err,   err],
];

fn dispatch(table: &DispositionTable, a: &Value, b: &Value) -> Value {
    table[a.type_tag().index()][b.type_tag().index()](a, b)
}

pub fn plus(a: &Value, b: &Value) -> Value {
    dispatch(&PLUS, a, b)
}

pub fn minus(a: &Value, b: &Value) -> Value {
    dispatch(&MINUS, a, b)
}

pub fn times(a: &Value, b: &Value) -> Value {
    dispatch(&TIMES, a, b)
}

pub fn divide(a: &Value, b: &Value) -> Value {
    dispatch(&DIVIDE, a, b)
}

pub fn int_divide(a: &Value, b: &Value) -> Value {
    dispatch(&INT_DIVIDE, a, b)
}

pub fn modulus(a: &Value, b: &Value) -> Value {
    dispatch(&MODULUS, a, b)
}

pub fn power(a: &Value, b: &Value) -> Value {
    dispatch(&POWER, a, b)
}

pub fn dot(a: &Value, b: &Value) -> Value {
    dispatch(&DOT, a, b)
}

// ---------------------------------------------------------------------------
// Unary
// ---------------------------------------------------------------------------

pub fn negate(a: &Value) -> Value {
    use crate::value::Kind;
    match a.resolve() {
        Kind::Int(i) => match i.checked_neg() {
            Some(n) => Value::from_int(n),
            None => Value::from_float(-(*i as f64)),
        },
        Kind::Float(f) => Value::from_float(-f),
        Kind::Void | Kind::Absent | Kind::Error => a.clone(),
        Kind::String | Kind::Bool(_) => Value::error(),
        Kind::Array(_) | Kind::Map(_) => Value::absent(),
    }
}

pub fn logical_not(a: &Value) -> Value {
    match a.as_bool() {
        Some(b) => Value::from_bool(!b),
        None if a.is_absent() => Value::absent(),
        None => Value::error(),
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Outcome of comparing two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    Ordered(Ordering),
    Absent,
    Error,
}

type CollateFn = fn(&Value, &Value) -> Collation;

fn c_err(_: &Value, _: &Value) -> Collation {
    Collation::Error
}

fn c_absn(_: &Value, _: &Value) -> Collation {
    Collation::Absent
}

fn c_lex(a: &Value, b: &Value) -> Collation {
    Collation::Ordered(a.to_string().cmp(&b.to_string()))
}

fn c_ii(a: &Value, b: &Value) -> Collation {
    Collation::Ordered(a.int_value().cmp(&b.int_value()))
}

fn c_if(a: &Value, b: &Value) -> Collation {
    Collation::Ordered((a.int_value() as f64).total_cmp(&b.float_value()))
}

fn c_fi(a: &Value, b: &Value) -> Collation {
    Collation::Ordered(a.float_value().total_cmp(&(b.int_value() as f64)))
}

fn c_ff(a: &Value, b: &Value) -> Collation {
    Collation::Ordered(a.float_value().total_cmp(&b.float_value()))
}

fn c_bb(a: &Value, b: &Value) -> Collation {
    match (a.as_bool(), b.as_bool()) {
        (Some(x), Some(y)) => Collation::Ordered(x.cmp(&y)),
        _ => Collation::Error,
    }
}

static COLLATE: [[CollateFn; TYPE_COUNT]; TYPE_COUNT] = [
    //           ERROR  ABSENT  VOID   STRING INT    FLOAT  BOOL   ARRAY  MAP
    /* ERROR  */ [c_err, c_err,  c_err, c_err, c_err, c_err, c_err, c_err, c_err],
    /* ABSENT */ [c_err, c_absn, c_absn, c_absn, c_absn, c_absn, c_absn, c_absn, c_absn],
    /* VOID   */ [c_err, c_absn, c_lex, c_lex, c_lex, c_lex, c_lex, c_err, c_err],
    /* STRING */ [c_err, c_absn, c_lex, c_lex, c_lex, c_lex, c_lex, c_err, c_err],
    /* INT    */ [c_err, c_absn, c_lex, c_lex, c_ii,  c_if,  c_lex, c_err, c_err],
    /* FLOAT  */ [c_err, c_absn, c_lex, c_lex, c_fi,  c_ff,  c_lex, c_err, c_err],
    /* BOOL   */ [c_err, c_absn, c_lex, c_lex, c_lex, c_lex, c_bb,  c_err, c_err],
    /* ARRAY  */ [c_err, c_absn, c_err, c_err, c_err, c_err, c_err, c_err, c_err],
    /* MAP    */ [c_err, c_absn, c_err, c_err, c_err, c_err, c_err, c_err, c_err],
];

pub fn collate(a: &Value, b: &Value) -> Collation {
    COLLATE[a.type_tag().index()][b.type_tag().index()](a, b)
}

fn compare_with(a: &Value, b: &Value, test: fn(Ordering) -> bool) -> Value {
    match collate(a, b) {
        Collation::Ordered(ordering) => Value::from_bool(test(ordering)),
        Collation::Absent => Value::absent(),
        Collation::Error => Value::error(),
    }
}

pub fn equals(a: &Value, b: &Value) -> Value {
    compare_with(a, b, Ordering::is_eq)
}

pub fn not_equals(a: &Value, b: &Value) -> Value {
    compare_with(a, b, Ordering::is_ne)
}

pub fn less_than(a: &Value, b: &Value) -> Value {
    compare_with(a, b, Ordering::is_lt)
}

pub fn less_equal(a: &Value, b: &Value) -> Value {
    compare_with(a, b, Ordering::is_le)
}

pub fn greater_than(a: &Value, b: &Value) -> Value {
    compare_with(a, b, Ordering::is_gt)
}

pub fn greater_equal(a: &Value, b: &Value) -> Value {
    compare_with(a, b, Ordering::is_ge)
}
