//! Tree-walking interpreter for parsed programs.

use std::f64::consts::{E, PI};

use crate::arithmetic;
use crate::context::Context;
use crate::record::Record;
use crate::script::ast::{BinaryOp, ContextVar, Expr, LValue, Program, Statement, UnaryOp};
use crate::script::functions::{self, Runtime, array_position};
use crate::value::{Kind, Value};

/// Separator for keys of flattened nested maps.
pub const FLATTEN_SEPARATOR: &str = ".";

/// Something a program produced besides the current record.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Text(String),
    Record(Record),
}

/// Per-invocation state: the current record (absent in `begin`/`end`), its
/// context, and what the statements decided.
struct Frame<'r> {
    record: Option<&'r mut Record>,
    ctx: &'r Context,
    filter: Option<bool>,
    bare: Option<bool>,
    outputs: Vec<Output>,
}

/// Outcome of running the main block on one record.
#[derive(Debug, Default)]
pub struct MainOutcome {
    /// Set by a `filter` statement.
    pub filter: Option<bool>,
    /// The last bare-boolean statement.
    pub bare: Option<bool>,
    pub outputs: Vec<Output>,
}

/// A program plus its out-of-stream variables and runtime state.
pub struct Interpreter {
    program: Program,
    oosvars: Record,
    runtime: Runtime,
}

impl Interpreter {
    pub fn new(program: Program, seed: Option<u64>) -> Self {
        Interpreter {
            program,
            oosvars: Record::new(),
            runtime: Runtime::new(seed),
        }
    }

    /// Preset an out-of-stream variable, as `-s name=value` does.
    pub fn set_oosvar(&mut self, name: &str, value: Value) {
        self.oosvars.put(name, value);
    }

    pub fn oosvars(&self) -> &Record {
        &self.oosvars
    }

    pub fn has_begin(&self) -> bool {
        !self.program.begin.is_empty()
    }

    pub fn run_begin(&mut self, ctx: &Context) -> Vec<Output> {
        let blocks = std::mem::take(&mut self.program.begin);
        let outputs = self.run_blocks(&blocks, ctx);
        self.program.begin = blocks;
        outputs
    }

    pub fn run_end(&mut self, ctx: &Context) -> Vec<Output> {
        let blocks = std::mem::take(&mut self.program.end);
        let outputs = self.run_blocks(&blocks, ctx);
        self.program.end = blocks;
        outputs
    }

    fn run_blocks(&mut self, blocks: &[Vec<Statement>], ctx: &Context) -> Vec<Output> {
        let mut frame = Frame {
            record: None,
            ctx,
            filter: None,
            bare: None,
            outputs: Vec::new(),
        };
        for block in blocks {
            self.execute(block, &mut frame);
        }
        frame.outputs
    }

    /// Run the main statements against `record`, which they may modify.
    pub fn run_main(&mut self, record: &mut Record, ctx: &Context) -> MainOutcome {
        let statements = std::mem::take(&mut self.program.main);
        let mut frame = Frame {
            record: Some(record),
            ctx,
            filter: None,
            bare: None,
            outputs: Vec::new(),
        };
        self.execute(&statements, &mut frame);
        self.program.main = statements;
        MainOutcome {
            filter: frame.filter,
            bare: frame.bare,
            outputs: frame.outputs,
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn execute(&mut self, statements: &[Statement], frame: &mut Frame<'_>) {
        for statement in statements {
            self.statement(statement, frame);
        }
    }

    fn statement(&mut self, statement: &Statement, frame: &mut Frame<'_>) {
        match statement {
            Statement::Assign(target, expr) => {
                let value = self.eval(expr, frame);
                if !value.is_absent() {
                    self.assign(target, value, frame);
                }
            }
            Statement::Unset(targets) => {
                for target in targets {
                    self.unset(target, frame);
                }
            }
            Statement::Filter(expr) => {
                let value = self.eval(expr, frame);
                frame.filter = Some(value.as_bool().unwrap_or(false));
            }
            Statement::Bare(expr) => {
                let value = self.eval(expr, frame);
                if let Some(b) = value.as_bool() {
                    frame.bare = Some(b);
                }
            }
            Statement::Print(args) => {
                let parts: Vec<String> = args
                    .iter()
                    .map(|arg| self.eval(arg, frame).to_string())
                    .collect();
                frame.outputs.push(Output::Text(parts.join(" ")));
            }
            Statement::If(arms, otherwise) => {
                for (condition, body) in arms {
                    if self.eval(condition, frame).as_bool() == Some(true) {
                        self.execute(body, frame);
                        return;
                    }
                }
                if let Some(body) = otherwise {
                    self.execute(body, frame);
                }
            }
            Statement::Pattern(condition, body) => {
                if self.eval(condition, frame).as_bool() == Some(true) {
                    self.execute(body, frame);
                }
            }
            Statement::Emit(target, names) => {
                let names: Vec<String> = names
                    .iter()
                    .map(|n| self.eval(n, frame).to_string())
                    .collect();
                self.emit(target, &names, frame);
            }
            Statement::Dump(target) => {
                let value = match target {
                    Some(expr) => self.eval(expr, frame),
                    None => Value::from_map(self.oosvars.clone()),
                };
                let text = match value.resolve() {
                    Kind::Map(_) | Kind::Array(_) => {
                        let mut out = String::new();
                        value.write_json(&mut out);
                        out
                    }
                    _ => value.to_string(),
                };
                frame.outputs.push(Output::Text(text));
            }
        }
    }

    fn assign(&mut self, target: &LValue, value: Value, frame: &mut Frame<'_>) {
        match target {
            LValue::Field(name) => {
                if let Some(record) = frame.record.as_deref_mut() {
                    record.put(name.as_str(), value);
                }
            }
            LValue::FullRecord => {
                if let (Some(record), Some(map)) = (frame.record.as_deref_mut(), value.as_map()) {
                    *record = map.clone();
                }
            }
            LValue::AllOosvars => {
                if let Some(map) = value.as_map() {
                    self.oosvars = map.clone();
                }
            }
            LValue::Oosvar(name, indices) => {
                let keys: Vec<String> = indices
                    .iter()
                    .map(|i| self.eval(i, frame).to_string())
                    .collect();
                let Some((last, path)) = keys.split_last() else {
                    self.oosvars.put(name.as_str(), value);
                    return;
                };
                let mut map = descend(&mut self.oosvars, name);
                for key in path {
                    map = map.and_then(|m| descend(m, key));
                }
                if let Some(map) = map {
                    map.put(last.as_str(), value);
                }
            }
        }
    }

    fn unset(&mut self, target: &LValue, frame: &mut Frame<'_>) {
        match target {
            LValue::Field(name) => {
                if let Some(record) = frame.record.as_deref_mut() {
                    record.remove(name);
                }
            }
            LValue::FullRecord => {
                if let Some(record) = frame.record.as_deref_mut() {
                    *record = Record::new();
                }
            }
            LValue::AllOosvars => self.oosvars = Record::new(),
            LValue::Oosvar(name, indices) => {
                let keys: Vec<String> = indices
                    .iter()
                    .map(|i| self.eval(i, frame).to_string())
                    .collect();
                let Some((last, path)) = keys.split_last() else {
                    self.oosvars.remove(name);
                    return;
                };
                let mut map = self.oosvars.get_mut(name).and_then(Value::as_map_mut);
                for key in path {
                    map = map.and_then(|m| m.get_mut(key)).and_then(Value::as_map_mut);
                }
                if let Some(map) = map {
                    map.remove(last);
                }
            }
        }
    }

    /// `emit @name` emits the variable as one record; `emit @name, "a", "b"`
    /// splits a nested map by its first levels, naming them `a` and `b`.
    fn emit(&mut self, target: &LValue, names: &[String], frame: &mut Frame<'_>) {
        match target {
            LValue::AllOosvars => {
                let all = self.oosvars.clone();
                for (name, value) in &all {
                    emit_split(name, value, names, Record::new(), &mut frame.outputs);
                }
            }
            LValue::Oosvar(name, indices) => {
                let mut value = self.oosvars.get(name).cloned().unwrap_or_else(Value::absent);
                for index in indices {
                    let key = self.eval(index, frame);
                    value = index_value(&value, &key);
                }
                if !value.is_absent() {
                    emit_split(name, &value, names, Record::new(), &mut frame.outputs);
                }
            }
            LValue::Field(_) | LValue::FullRecord => {}
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr, frame: &Frame<'_>) -> Value {
        match expr {
            Expr::Literal(v) => v.clone(),
            Expr::Field(name) => frame
                .record
                .as_deref()
                .and_then(|r| r.get(name))
                .cloned()
                .unwrap_or_else(Value::absent),
            Expr::FullRecord => match frame.record.as_deref() {
                Some(record) => Value::from_map(record.clone()),
                None => Value::absent(),
            },
            Expr::Oosvar(name) => self.oosvars.get(name).cloned().unwrap_or_else(Value::absent),
            Expr::AllOosvars => Value::from_map(self.oosvars.clone()),
            Expr::Context(var) => match var {
                ContextVar::Nr => Value::from_int(frame.ctx.nr as i64),
                ContextVar::Fnr => Value::from_int(frame.ctx.fnr as i64),
                ContextVar::Filename => Value::from_string(frame.ctx.filename.as_ref()),
                ContextVar::Filenum => Value::from_int(frame.ctx.filenum as i64),
                ContextVar::Pi => Value::from_float(PI),
                ContextVar::E => Value::from_float(E),
            },
            Expr::Index(base, index) => {
                let base = self.eval(base, frame);
                let index = self.eval(index, frame);
                index_value(&base, &index)
            }
            Expr::Unary(op, operand) => {
                let v = self.eval(operand, frame);
                match op {
                    UnaryOp::Negate => arithmetic::negate(&v),
                    UnaryOp::Not => arithmetic::logical_not(&v),
                    UnaryOp::Plus if v.is_numeric() || v.is_empty() => v,
                    UnaryOp::Plus => Value::error(),
                }
            }
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, frame),
            Expr::Ternary(condition, yes, no) => match self.eval(condition, frame).as_bool() {
                Some(true) => self.eval(yes, frame),
                Some(false) => self.eval(no, frame),
                None => Value::error(),
            },
            Expr::Call(name, args) => {
                let args: Vec<Value> = args.iter().map(|a| self.eval(a, frame)).collect();
                functions::call(name, &args, &mut self.runtime)
            }
            Expr::MapLiteral(pairs) => {
                let mut map = Record::new();
                for (k, v) in pairs {
                    let key = self.eval(k, frame).to_string();
                    let value = self.eval(v, frame);
                    map.put(key, value);
                }
                Value::from_map(map)
            }
            Expr::ArrayLiteral(items) => {
                Value::from_array(items.iter().map(|i| self.eval(i, frame)).collect())
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, frame: &Frame<'_>) -> Value {
        match op {
            BinaryOp::And | BinaryOp::Or => {
                let short_circuit_on = op == BinaryOp::Or;
                let a = self.eval(lhs, frame);
                match a.as_bool() {
                    Some(b) if b == short_circuit_on => a,
                    Some(_) => logical_rhs(a, self.eval(rhs, frame)),
                    None if a.is_absent() => logical_rhs(a, self.eval(rhs, frame)),
                    None => Value::error(),
                }
            }
            BinaryOp::Xor => {
                let a = self.eval(lhs, frame);
                let b = self.eval(rhs, frame);
                match (a.as_bool(), b.as_bool()) {
                    (Some(x), Some(y)) => Value::from_bool(x != y),
                    _ => logical_rhs(a, b),
                }
            }
            BinaryOp::AbsentCoalesce => {
                let a = self.eval(lhs, frame);
                if a.is_absent() { self.eval(rhs, frame) } else { a }
            }
            BinaryOp::Matches | BinaryOp::NotMatches => {
                let a = self.eval(lhs, frame);
                let b = self.eval(rhs, frame);
                if a.is_absent() || a.is_error() {
                    return a;
                }
                let (Some(text), Some(pattern)) = (scalar_string(&a), scalar_string(&b)) else {
                    return Value::error();
                };
                match self.runtime.regex(&pattern) {
                    Some(re) => Value::from_bool(re.is_match(&text) == (op == BinaryOp::Matches)),
                    None => Value::error(),
                }
            }
            _ => {
                let a = self.eval(lhs, frame);
                let b = self.eval(rhs, frame);
                let f = match op {
                    BinaryOp::Plus => arithmetic::plus,
                    BinaryOp::Minus => arithmetic::minus,
                    BinaryOp::Times => arithmetic::times,
                    BinaryOp::Divide => arithmetic::divide,
                    BinaryOp::IntDivide => arithmetic::int_divide,
                    BinaryOp::Modulus => arithmetic::modulus,
                    BinaryOp::Power => arithmetic::power,
                    BinaryOp::Dot => arithmetic::dot,
                    BinaryOp::Equal => arithmetic::equals,
                    BinaryOp::NotEqual => arithmetic::not_equals,
                    BinaryOp::Less => arithmetic::less_than,
                    BinaryOp::LessEqual => arithmetic::less_equal,
                    BinaryOp::Greater => arithmetic::greater_than,
                    BinaryOp::GreaterEqual => arithmetic::greater_equal,
                    _ => return Value::error(),
                };
                f(&a, &b)
            }
        }
    }
}

/// Right operand of a logical operator once the left did not decide it.
/// Absent on either side defers to the other.
fn logical_rhs(a: Value, b: Value) -> Value {
    let (a_ok, b_ok) = (a.as_bool().is_some(), b.as_bool().is_some());
    if b_ok && (a_ok || a.is_absent()) {
        b
    } else if b.is_absent() && (a_ok || a.is_absent()) {
        a
    } else {
        Value::error()
    }
}

fn scalar_string(v: &Value) -> Option<String> {
    match v.resolve() {
        Kind::Absent | Kind::Error | Kind::Array(_) | Kind::Map(_) => None,
        _ => Some(v.to_string()),
    }
}

/// `base[index]`: map lookup by key text, or 1-up array position.
fn index_value(base: &Value, index: &Value) -> Value {
    match base.resolve() {
        Kind::Map(map) => map.get(&index.to_string()).cloned().unwrap_or_else(Value::absent),
        Kind::Array(items) => match index.as_int() {
            Some(i) => array_position(items.len(), i)
                .map(|p| items[p].clone())
                .unwrap_or_else(Value::absent),
            None => Value::error(),
        },
        Kind::Absent => Value::absent(),
        _ => Value::error(),
    }
}

/// The map stored under `key`, replacing any non-map value there.
fn descend<'m>(map: &'m mut Record, key: &str) -> Option<&'m mut Record> {
    let is_map = map.get(key).is_some_and(|v| v.as_map().is_some());
    if !is_map {
        map.put(key, Value::from_map(Record::new()));
    }
    map.get_mut(key).and_then(Value::as_map_mut)
}

/// Nested maps become `outer.inner` keys.
pub fn flatten_into(prefix: &str, value: &Value, out: &mut Record) {
    match value.as_map() {
        Some(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten_into(&format!("{prefix}{FLATTEN_SEPARATOR}{k}"), v, out);
            }
        }
        _ => out.put(prefix, value.clone()),
    }
}

fn emit_split(name: &str, value: &Value, names: &[String], prefix: Record, outputs: &mut Vec<Output>) {
    let Some(map) = value.as_map() else {
        let mut record = prefix;
        record.put(name, value.clone());
        outputs.push(Output::Record(record));
        return;
    };
    if let Some((first, rest)) = names.split_first() {
        for (key, inner) in map {
            let mut next = prefix.clone();
            next.put(first.as_str(), Value::from_string(key));
            emit_split(name, inner, rest, next, outputs);
        }
        return;
    }
    let mut record = prefix;
    for (k, v) in map {
        flatten_into(k, v, &mut record);
    }
    outputs.push(Output::Record(record));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::parse_program;

    fn interpreter(src: &str) -> Interpreter {
        Interpreter::new(parse_program(src).unwrap(), Some(1))
    }

    fn rec(text: &str) -> Record {
        text.split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k, Value::from_data(v)))
            .collect()
    }

    fn ctx(nr: u64) -> Context {
        let mut ctx = Context::new();
        ctx.start_file("data.dkvp");
        for _ in 0..nr {
            ctx.advance();
        }
        ctx
    }

    fn put(src: &str, input: &str) -> String {
        let mut record = rec(input);
        interpreter(src).run_main(&mut record, &ctx(1));
        record.to_string()
    }

    fn texts(outputs: &[Output]) -> Vec<String> {
        outputs
            .iter()
            .map(|o| match o {
                Output::Text(t) => t.clone(),
                Output::Record(r) => format!("record {r}"),
            })
            .collect()
    }

    #[test]
    fn test_assignment_and_arithmetic() {
        assert_eq!(put("$z = $x * 2 + $y", "x=3,y=0.5"), "x=3,y=0.5,z=6.5");
        assert_eq!(put("$x = $x . \"!\"", "x=hi"), "x=hi!");
        assert_eq!(put("$x += 1", "x=0x10"), "x=17");
        assert_eq!(put("$q = 7 // 2; $r = -7 % 5; $p = 2 ** 10", "a=1"), "a=1,q=3,r=3,p=1024");
        assert_eq!(put("$d = 6 / 4; $e = 6 / 3", "a=1"), "a=1,d=1.5,e=2");
    }

    #[test]
    fn test_untouched_fields_keep_their_text() {
        assert_eq!(put("$y = 1", "x=007,z=1.500"), "x=007,z=1.500,y=1");
    }

    #[test]
    fn test_absent_is_not_assigned() {
        assert_eq!(put("$y = $nosuch", "x=1"), "x=1");
        assert_eq!(put("$y = $nosuch + 1", "x=1"), "x=1,y=1");
    }

    #[test]
    fn test_unset_and_full_record() {
        assert_eq!(put("unset $x", "x=1,y=2"), "y=2");
        assert_eq!(put("$* = {\"a\": 1}", "x=1"), "a=1");
        assert_eq!(put("unset $*", "x=1"), "");
        assert_eq!(put("$n = length($*)", "x=1,y=2"), "x=1,y=2,n=2");
    }

    #[test]
    fn test_context_variables() {
        let mut record = rec("a=1");
        interpreter("$nr = NR; $f = FILENAME; $k = FILENUM").run_main(&mut record, &ctx(3));
        assert_eq!(record.to_string(), "a=1,nr=3,f=data.dkvp,k=1");
    }

    #[test]
    fn test_conditionals() {
        let src = "if ($x > 10) { $s = \"big\" } elif ($x > 5) { $s = \"mid\" } else { $s = \"small\" }";
        assert_eq!(put(src, "x=20"), "x=20,s=big");
        assert_eq!(put(src, "x=7"), "x=7,s=mid");
        assert_eq!(put(src, "x=1"), "x=1,s=small");
        assert_eq!(put("$x > 1 { $y = 2 }", "x=3"), "x=3,y=2");
        assert_eq!(put("$x > 1 { $y = 2 }", "x=0"), "x=0");
        assert_eq!(put("$t = $x > 1 ? \"y\" : \"n\"", "x=0"), "x=0,t=n");
    }

    #[test]
    fn test_filter_and_bare_booleans() {
        let mut record = rec("x=3");
        let outcome = interpreter("filter $x > 5").run_main(&mut record, &ctx(1));
        assert_eq!(outcome.filter, Some(false));
        let outcome = interpreter("$x > 1; $x > 5").run_main(&mut record, &ctx(1));
        assert_eq!(outcome.bare, Some(false));
        assert_eq!(outcome.filter, None);
        let outcome = interpreter("filter $nosuch").run_main(&mut record, &ctx(1));
        assert_eq!(outcome.filter, Some(false));
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(put("$a = true && false; $b = false || true; $c = true ^^ true", "x=1"),
            "x=1,a=false,b=true,c=false");
        assert_eq!(put("$a = $nosuch && true; $b = !($x == 1)", "x=1"), "x=1,a=true,b=false");
        assert_eq!(put("$a = 1 && true", "x=1"), "x=1,a=(error)");
        // The right side is not evaluated after a short circuit.
        assert_eq!(put("$a = false && 1", "x=1"), "x=1,a=false");
    }

    #[test]
    fn test_regex_match() {
        assert_eq!(put("$m = $s =~ \"^a.c$\"; $n = $s !=~ \"b\"", "s=abc"), "s=abc,m=true,n=false");
        assert_eq!(put("$m = $s =~ \"\\\"^A\\\"i\"", "s=abc"), "s=abc,m=true");
    }

    #[test]
    fn test_absent_coalescing() {
        assert_eq!(put("$y = $nosuch ?? \"dflt\"; $z = $x ?? 3", "x=1"), "x=1,y=dflt,z=1");
    }

    #[test]
    fn test_oosvar_accumulation_and_emit() {
        let mut interp = interpreter("@sum[$a] += $x; @count += 1; end { emit @sum, \"a\"; emit @count }");
        for (i, line) in ["a=pan,x=1", "a=eks,x=2", "a=pan,x=3"].iter().enumerate() {
            let mut record = rec(line);
            interp.run_main(&mut record, &ctx(i as u64 + 1));
        }
        let outputs = interp.run_end(&ctx(3));
        assert_eq!(texts(&outputs), vec!["record a=pan,sum=4", "record a=eks,sum=2", "record count=3"]);
    }

    #[test]
    fn test_emit_nested_without_names_flattens() {
        let mut interp = interpreter("@s[$a][$b] = $x; end { emit @s }");
        let mut record = rec("a=pan,b=wye,x=5");
        interp.run_main(&mut record, &ctx(1));
        let outputs = interp.run_end(&ctx(1));
        assert_eq!(texts(&outputs), vec!["record pan.wye=5"]);
    }

    #[test]
    fn test_emit_two_levels() {
        let mut interp = interpreter("@s[$a][$b] = $x; end { emit @s, \"a\", \"b\" }");
        for line in ["a=pan,b=wye,x=5", "a=eks,b=zee,x=6"] {
            let mut record = rec(line);
            interp.run_main(&mut record, &ctx(1));
        }
        let outputs = interp.run_end(&ctx(2));
        assert_eq!(texts(&outputs), vec!["record a=pan,b=wye,s=5", "record a=eks,b=zee,s=6"]);
    }

    #[test]
    fn test_print_and_dump() {
        let mut interp = interpreter("begin { @n = 0 } @n += 1; print \"n is\", @n; end { dump }");
        let begin = interp.run_begin(&ctx(0));
        assert!(begin.is_empty());
        let mut record = rec("x=1");
        let outcome = interp.run_main(&mut record, &ctx(1));
        assert_eq!(texts(&outcome.outputs), vec!["n is 1"]);
        let end = interp.run_end(&ctx(1));
        assert_eq!(texts(&end), vec![r#"{"n": 1}"#]);
    }

    #[test]
    fn test_indexing() {
        assert_eq!(put("$y = splitax($s, \";\")[2]", "s=a;b;c"), "s=a;b;c,y=b");
        assert_eq!(put("$y = splitax($s, \";\")[-1]", "s=a;b;c"), "s=a;b;c,y=c");
        assert_eq!(put("$y = splitax($s, \";\")[9]", "s=a;b;c"), "s=a;b;c");
        assert_eq!(put("$y = {\"k\": 5}[\"k\"]", "s=1"), "s=1,y=5");
        assert_eq!(put("$y = $*[\"s\"] . \"x\"", "s=1"), "s=1,y=1x");
    }

    #[test]
    fn test_unset_oosvar_path() {
        let mut interp = interpreter("@a[1][2] = 3; @a[1][4] = 5; unset @a[1][2]; end { dump }");
        let mut record = rec("x=1");
        interp.run_main(&mut record, &ctx(1));
        let end = interp.run_end(&ctx(1));
        assert_eq!(texts(&end), vec![r#"{"a": {"1": {"4": 5}}}"#]);
    }

    #[test]
    fn test_runtime_type_errors_become_error_values() {
        assert_eq!(put("$y = $s + 1", "s=abc"), "s=abc,y=(error)");
        assert_eq!(put("$y = -$s", "s=abc"), "s=abc,y=(error)");
    }

    #[test]
    fn test_math_constants() {
        assert_eq!(put("$ok = M_PI > 3.14 && M_E < 2.72", "x=1"), "x=1,ok=true");
    }
}
