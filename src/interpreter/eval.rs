use super::Interpreter;
use super::environment::EnvRef;
use super::helpers::{PreferredType, strict_equality, to_boolean, typeof_val};
use super::property::PropertyDescriptor;
use crate::ast::*;
use crate::types::{JsString, JsValue, number_ops, string_property_key};

/// Result of evaluating an expression as a reference (ES5 §8.7).
#[derive(Clone, Debug)]
pub(crate) enum Reference {
    Unresolvable(String),
    Binding(EnvRef, String),
    Property(JsValue, String),
    Value(JsValue),
}

/// Short source-like label of a callee for error messages.
fn callee_label(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(name) => name.clone(),
        Expression::This => "this".to_string(),
        Expression::Member(obj, MemberProperty::Dot(prop)) => format!("{}.{prop}", callee_label(obj)),
        Expression::Member(obj, MemberProperty::Computed(_)) => format!("{}[...]", callee_label(obj)),
        Expression::Function(_) => "function".to_string(),
        _ => "expression".to_string(),
    }
}

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expression, env: &EnvRef) -> Result<JsValue, JsValue> {
        match expr {
            Expression::Literal(lit) => Ok(Self::eval_literal(lit)),
            Expression::Identifier(name) => {
                let reference = self.identifier_reference(env, name);
                self.get_reference_value(&reference)
            }
            Expression::This => Ok(self.this_binding()),
            Expression::Array(elements) => self.eval_array_literal(elements, env),
            Expression::Object(props) => self.eval_object_literal(props, env),
            Expression::Function(node) => Ok(JsValue::Object(self.instantiate_function_expression(node, env))),
            Expression::Unary(op, operand) => {
                let val = self.eval_expr(operand, env)?;
                self.eval_unary(*op, &val)
            }
            Expression::Binary(op, left, right) => {
                let lval = self.eval_expr(left, env)?;
                let rval = self.eval_expr(right, env)?;
                self.apply_binary(*op, &lval, &rval)
            }
            Expression::Logical(op, left, right) => {
                let lval = self.eval_expr(left, env)?;
                match (op, to_boolean(&lval)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(lval),
                    _ => self.eval_expr(right, env),
                }
            }
            Expression::Update(op, prefix, target) => {
                let reference = self.eval_reference(target, env)?;
                let old_val = self.get_reference_value(&reference)?;
                let old = self.to_number(&old_val)?;
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.put_value(&reference, JsValue::Number(new))?;
                Ok(JsValue::Number(if *prefix { new } else { old }))
            }
            Expression::Assign(op, target, value) => self.eval_assign(*op, target, value, env),
            Expression::Conditional(test, consequent, alternate) => {
                let t = self.eval_expr(test, env)?;
                if to_boolean(&t) {
                    self.eval_expr(consequent, env)
                } else {
                    self.eval_expr(alternate, env)
                }
            }
            Expression::Call(callee, args) => self.eval_call(callee, args, env),
            Expression::New(callee, args) => {
                let ctor = self.eval_expr(callee, env)?;
                let arg_vals = self.eval_arguments(args, env)?;
                if !ctor.is_callable() {
                    let label = callee_label(callee);
                    return Err(self.create_type_error(&format!("{label} is not a constructor")));
                }
                self.construct(&ctor, &arg_vals)
            }
            Expression::Member(..) => {
                let reference = self.eval_reference(expr, env)?;
                self.get_reference_value(&reference)
            }
            Expression::Typeof(operand) => {
                let reference = self.eval_reference(operand, env)?;
                if matches!(reference, Reference::Unresolvable(_)) {
                    return Ok(JsValue::string("undefined"));
                }
                let val = self.get_reference_value(&reference)?;
                Ok(JsValue::string(typeof_val(&val)))
            }
            Expression::Void(operand) => {
                self.eval_expr(operand, env)?;
                Ok(JsValue::Undefined)
            }
            Expression::Delete(operand) => self.eval_delete(operand, env),
            Expression::Sequence(exprs) => {
                let mut last = JsValue::Undefined;
                for e in exprs {
                    last = self.eval_expr(e, env)?;
                }
                Ok(last)
            }
        }
    }

    fn eval_literal(lit: &Literal) -> JsValue {
        match lit {
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::Number(*n),
            Literal::String(s) => JsValue::String(JsString::from_str(s)),
        }
    }

    fn identifier_reference(&self, env: &EnvRef, name: &str) -> Reference {
        match self.resolve_binding(env, name) {
            Some(found) => Reference::Binding(found, name.to_string()),
            None => Reference::Unresolvable(name.to_string()),
        }
    }

    pub(crate) fn eval_reference(&mut self, expr: &Expression, env: &EnvRef) -> Result<Reference, JsValue> {
        match expr {
            Expression::Identifier(name) => Ok(self.identifier_reference(env, name)),
            Expression::Member(obj, prop) => {
                let base = self.eval_expr(obj, env)?;
                let key_val = match prop {
                    MemberProperty::Dot(name) => JsValue::string(name),
                    MemberProperty::Computed(e) => self.eval_expr(e, env)?,
                };
                if base.is_nullish() {
                    let shown = match &key_val {
                        JsValue::Object(_) => "[object]".to_string(),
                        other => self.to_display_string(other),
                    };
                    return Err(self.create_type_error(&format!("Cannot read property '{shown}' of {base}")));
                }
                let key = self.to_property_key(&key_val)?;
                Ok(Reference::Property(base, key))
            }
            other => Ok(Reference::Value(self.eval_expr(other, env)?)),
        }
    }

    /// GetValue (ES5 §8.7.1).
    pub(crate) fn get_reference_value(&mut self, reference: &Reference) -> Result<JsValue, JsValue> {
        match reference {
            Reference::Value(v) => Ok(v.clone()),
            Reference::Unresolvable(name) => Err(self.create_reference_error(&format!("{name} is not defined"))),
            Reference::Binding(env, name) => {
                let strict = self.is_strict();
                self.get_binding_value(env, name, strict)
            }
            Reference::Property(JsValue::Object(obj), key) => self.get(obj, key),
            Reference::Property(base, key) => {
                let wrapper = self.to_object(base)?;
                self.get_with_receiver(&wrapper, key, base)
            }
        }
    }

    /// PutValue (ES5 §8.7.2).
    pub(crate) fn put_value(&mut self, reference: &Reference, value: JsValue) -> Result<(), JsValue> {
        let strict = self.is_strict();
        match reference {
            Reference::Value(_) => Err(self.create_reference_error("Invalid left-hand side in assignment")),
            Reference::Unresolvable(name) => {
                if strict {
                    return Err(self.create_reference_error(&format!("{name} is not defined")));
                }
                let global = self.realm.global_object.clone();
                self.put(&global, name, value, false)
            }
            Reference::Binding(env, name) => self.set_mutable_binding(env, name, value, strict),
            Reference::Property(JsValue::Object(obj), key) => self.put(obj, key, value, strict),
            Reference::Property(base, key) => {
                let wrapper = self.to_object(base)?;
                self.put_with_receiver(&wrapper, key, value, base, strict)
            }
        }
    }

    fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &Expression,
        value: &Expression,
        env: &EnvRef,
    ) -> Result<JsValue, JsValue> {
        let reference = self.eval_reference(target, env)?;
        let result = match op.binary_op() {
            None => self.eval_expr(value, env)?,
            Some(bin) => {
                let lval = self.get_reference_value(&reference)?;
                let rval = self.eval_expr(value, env)?;
                self.apply_binary(bin, &lval, &rval)?
            }
        };
        self.put_value(&reference, result.clone())?;
        Ok(result)
    }

    fn eval_arguments(&mut self, args: &[Expression], env: &EnvRef) -> Result<Vec<JsValue>, JsValue> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.eval_expr(a, env)?);
        }
        Ok(values)
    }

    // §11.2.3 Function Calls
    fn eval_call(&mut self, callee: &Expression, args: &[Expression], env: &EnvRef) -> Result<JsValue, JsValue> {
        let reference = self.eval_reference(callee, env)?;
        let func = self.get_reference_value(&reference)?;
        let this = match &reference {
            Reference::Property(base, _) => base.clone(),
            Reference::Binding(found, _) => found.implicit_this_value(),
            _ => JsValue::Undefined,
        };
        let arg_vals = self.eval_arguments(args, env)?;
        if !func.is_callable() {
            let label = callee_label(callee);
            return Err(self.create_type_error(&format!("{label} is not a function")));
        }
        if callee.is_eval_reference()
            && matches!(&reference, Reference::Binding(..))
            && matches!(&func, JsValue::Object(o) if o.ptr_eq(&self.realm.eval))
        {
            return self.perform_eval(arg_vals.first(), Some(env)).into_result();
        }
        self.call(&func, &this, &arg_vals)
    }

    fn eval_delete(&mut self, operand: &Expression, env: &EnvRef) -> Result<JsValue, JsValue> {
        let reference = self.eval_reference(operand, env)?;
        let deleted = match reference {
            Reference::Value(_) | Reference::Unresolvable(_) => true,
            Reference::Binding(found, name) => self.delete_binding(&found, &name)?,
            Reference::Property(base, key) => {
                let obj = self.to_object(&base)?;
                let strict = self.is_strict();
                self.delete_property(&obj, &key, strict)?
            }
        };
        Ok(JsValue::Boolean(deleted))
    }

    fn eval_array_literal(&mut self, elements: &[Option<Expression>], env: &EnvRef) -> Result<JsValue, JsValue> {
        let arr = self.create_array(Vec::new());
        let JsValue::Object(obj) = &arr else {
            return Ok(arr);
        };
        for (i, element) in elements.iter().enumerate() {
            if let Some(e) = element {
                let v = self.eval_expr(e, env)?;
                obj.borrow_mut()
                    .define_own_property(&i.to_string(), PropertyDescriptor::data_default(v));
            }
        }
        let length = PropertyDescriptor::partial(
            Some(JsValue::Number(elements.len() as f64)),
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap_or_else(|_| PropertyDescriptor::generic());
        obj.borrow_mut().define_own_property("length", length);
        Ok(arr)
    }

    // §11.1.5 Object Initialiser
    fn eval_object_literal(&mut self, props: &[Property], env: &EnvRef) -> Result<JsValue, JsValue> {
        let obj = self.create_object();
        for prop in props {
            let key = match &prop.key {
                PropertyKey::Identifier(s) | PropertyKey::String(s) => string_property_key(s),
                PropertyKey::Number(n) => number_ops::to_string(*n),
            };
            let value = self.eval_expr(&prop.value, env)?;
            let desc = match prop.kind {
                PropertyKind::Init => PropertyDescriptor::data_default(value),
                PropertyKind::Get => {
                    PropertyDescriptor::partial(None, None, Some(value), None, Some(true), Some(true))
                        .unwrap_or_else(|_| PropertyDescriptor::generic())
                }
                PropertyKind::Set => {
                    PropertyDescriptor::partial(None, None, None, Some(value), Some(true), Some(true))
                        .unwrap_or_else(|_| PropertyDescriptor::generic())
                }
            };
            self.define_own_property(&obj, &key, desc, false)?;
        }
        Ok(JsValue::Object(obj))
    }

    fn eval_unary(&mut self, op: UnaryOp, val: &JsValue) -> Result<JsValue, JsValue> {
        Ok(match op {
            UnaryOp::Minus => JsValue::Number(number_ops::unary_minus(self.to_number(val)?)),
            UnaryOp::Plus => JsValue::Number(self.to_number(val)?),
            UnaryOp::Not => JsValue::Boolean(!to_boolean(val)),
            UnaryOp::BitNot => JsValue::Number(number_ops::bitwise_not(self.to_number(val)?)),
        })
    }

    /// Applies a binary operator to two evaluated operands.
    pub(crate) fn apply_binary(&mut self, op: BinaryOp, lval: &JsValue, rval: &JsValue) -> Result<JsValue, JsValue> {
        let numeric = |interp: &mut Self, f: fn(f64, f64) -> f64| -> Result<JsValue, JsValue> {
            let a = interp.to_number(lval)?;
            let b = interp.to_number(rval)?;
            Ok(JsValue::Number(f(a, b)))
        };
        match op {
            // §11.6.1
            BinaryOp::Add => {
                let lp = self.to_primitive(lval, PreferredType::Default)?;
                let rp = self.to_primitive(rval, PreferredType::Default)?;
                if lp.is_string() || rp.is_string() {
                    let ls = self.to_js_string(&lp)?;
                    let rs = self.to_js_string(&rp)?;
                    return Ok(JsValue::String(ls.concat(&rs)));
                }
                let a = self.to_number(&lp)?;
                let b = self.to_number(&rp)?;
                Ok(JsValue::Number(a + b))
            }
            BinaryOp::Sub => numeric(self, |a, b| a - b),
            BinaryOp::Mul => numeric(self, |a, b| a * b),
            BinaryOp::Div => numeric(self, |a, b| a / b),
            BinaryOp::Mod => numeric(self, |a, b| a % b),
            BinaryOp::LShift => numeric(self, number_ops::left_shift),
            BinaryOp::RShift => numeric(self, number_ops::signed_right_shift),
            BinaryOp::URShift => numeric(self, number_ops::unsigned_right_shift),
            BinaryOp::BitAnd => numeric(self, number_ops::bitwise_and),
            BinaryOp::BitOr => numeric(self, number_ops::bitwise_or),
            BinaryOp::BitXor => numeric(self, number_ops::bitwise_xor),
            BinaryOp::Eq => Ok(JsValue::Boolean(self.abstract_equality(lval, rval)?)),
            BinaryOp::NotEq => Ok(JsValue::Boolean(!self.abstract_equality(lval, rval)?)),
            BinaryOp::StrictEq => Ok(JsValue::Boolean(strict_equality(lval, rval))),
            BinaryOp::StrictNotEq => Ok(JsValue::Boolean(!strict_equality(lval, rval))),
            // §11.8.1 - §11.8.4
            BinaryOp::Lt => Ok(JsValue::Boolean(self.abstract_relational(lval, rval, true)? == Some(true))),
            BinaryOp::Gt => Ok(JsValue::Boolean(self.abstract_relational(rval, lval, false)? == Some(true))),
            BinaryOp::LtEq => Ok(JsValue::Boolean(self.abstract_relational(rval, lval, false)? == Some(false))),
            BinaryOp::GtEq => Ok(JsValue::Boolean(self.abstract_relational(lval, rval, true)? == Some(false))),
            BinaryOp::In => {
                let JsValue::Object(obj) = rval else {
                    let key = self.to_display_string(lval);
                    let shown = self.to_display_string(rval);
                    return Err(self.create_type_error(&format!(
                        "Cannot use 'in' operator to search for '{key}' in {shown}"
                    )));
                };
                let key = self.to_property_key(lval)?;
                Ok(JsValue::Boolean(obj.has_property(&key)))
            }
            BinaryOp::Instanceof => {
                let JsValue::Object(func) = rval else {
                    return Err(self.create_type_error("Right-hand side of 'instanceof' is not an object"));
                };
                if !func.borrow().is_callable() {
                    return Err(self.create_type_error("Right-hand side of 'instanceof' is not callable"));
                }
                Ok(JsValue::Boolean(self.has_instance(func, lval)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> JsValue {
        let mut interp = Interpreter::new();
        match interp.execute(src) {
            Ok(v) => v,
            Err(e) => panic!("script failed: {e}"),
        }
    }

    fn throws(src: &str, ctor: &str) -> bool {
        let script = format!("try {{ {src}; false }} catch (e) {{ e instanceof {ctor} }}");
        run(&script) == JsValue::Boolean(true)
    }

    #[test]
    fn addition_prefers_strings() {
        assert_eq!(run("1 + '2'"), JsValue::string("12"));
        assert_eq!(run("'a' + null"), JsValue::string("anull"));
        assert_eq!(run("1 + true"), JsValue::Number(2.0));
        assert_eq!(run("[1, 2] + ''"), JsValue::string("1,2"));
        assert_eq!(run("({}) + 1"), JsValue::string("[object Object]1"));
    }

    #[test]
    fn arithmetic_and_bitwise() {
        assert_eq!(run("7 % -3"), JsValue::Number(1.0));
        assert_eq!(run("-7 % 3"), JsValue::Number(-1.0));
        assert_eq!(run("1 / 0"), JsValue::Number(f64::INFINITY));
        assert_eq!(run("-1 >>> 0"), JsValue::Number(4294967295.0));
        assert_eq!(run("1 << 33"), JsValue::Number(2.0));
        assert_eq!(run("~5"), JsValue::Number(-6.0));
        assert_eq!(run("'3' * '4'"), JsValue::Number(12.0));
    }

    #[test]
    fn comparison_with_nan_is_false() {
        assert_eq!(run("NaN < 1 || NaN >= 1 || NaN == NaN"), JsValue::Boolean(false));
        assert_eq!(run("'10' < '9'"), JsValue::Boolean(true));
        assert_eq!(run("'10' < 9"), JsValue::Boolean(false));
        assert_eq!(run("null >= 0 && null <= 0 && null != 0"), JsValue::Boolean(true));
    }

    #[test]
    fn relational_evaluates_operands_in_order() {
        assert_eq!(
            run("var log = ''; var a = { valueOf: function () { log += 'a'; return 1; } }; \
                 var b = { valueOf: function () { log += 'b'; return 2; } }; a > b; log"),
            JsValue::string("ab")
        );
    }

    #[test]
    fn equality() {
        assert_eq!(run("null == undefined"), JsValue::Boolean(true));
        assert_eq!(run("null === undefined"), JsValue::Boolean(false));
        assert_eq!(run("'' == 0"), JsValue::Boolean(true));
        assert_eq!(run("var o = {}; o == o && o != {}"), JsValue::Boolean(true));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(run("var n = 0; false && n++; true || n++; n"), JsValue::Number(0.0));
        assert_eq!(run("0 || 'x'"), JsValue::string("x"));
        assert_eq!(run("1 && null"), JsValue::Null);
    }

    #[test]
    fn typeof_operator() {
        assert_eq!(run("typeof undeclared"), JsValue::string("undefined"));
        assert_eq!(run("typeof null"), JsValue::string("object"));
        assert_eq!(run("typeof function () {}"), JsValue::string("function"));
        assert_eq!(run("typeof Symbol()"), JsValue::string("symbol"));
    }

    #[test]
    fn unresolvable_references() {
        assert!(throws("undeclared", "ReferenceError"));
        assert_eq!(run("implicitGlobal = 3; this.implicitGlobal"), JsValue::Number(3.0));
        assert!(throws("(function () { 'use strict'; implicit2 = 1; })()", "ReferenceError"));
    }

    #[test]
    fn member_access_on_nullish_throws() {
        assert!(throws("var u; u.x", "TypeError"));
        assert!(throws("null[0]", "TypeError"));
    }

    #[test]
    fn primitive_base_property_access() {
        assert_eq!(run("'abc'.length"), JsValue::Number(3.0));
        assert_eq!(run("'abc'[1]"), JsValue::string("b"));
        assert_eq!(run("var s = 'x'; s.foo = 1; s.foo"), JsValue::Undefined);
        assert!(throws("(function () { 'use strict'; 'x'.foo = 1; })()", "TypeError"));
    }

    #[test]
    fn getter_sees_primitive_receiver_in_strict_code() {
        assert_eq!(
            run("Object.defineProperty(Number.prototype, 'me', { get: function () { 'use strict'; return typeof this; }, configurable: true }); \
                 (5).me"),
            JsValue::string("number")
        );
    }

    #[test]
    fn compound_assignment_and_update() {
        assert_eq!(run("var a = 5; a += 2; a *= 3; a"), JsValue::Number(21.0));
        assert_eq!(run("var s = 'a'; s += 1; s"), JsValue::string("a1"));
        assert_eq!(run("var i = 1; var j = i++; j * 10 + i"), JsValue::Number(12.0));
        assert_eq!(run("var o = { n: '1' }; ++o.n; o.n"), JsValue::Number(2.0));
    }

    #[test]
    fn assignment_evaluates_target_first() {
        assert_eq!(
            run("var log = ''; var o = {}; (function () { log += 't'; return o; })().p = (log += 'v', 1); log"),
            JsValue::string("tv")
        );
    }

    #[test]
    fn object_literal_accessors() {
        assert_eq!(
            run("var o = { _v: 1, get v() { return this._v; }, set v(x) { this._v = x * 2; } }; o.v = 5; o.v"),
            JsValue::Number(10.0)
        );
        assert_eq!(
            run("var d = Object.getOwnPropertyDescriptor({ get a() { return 1; } }, 'a'); \
                 typeof d.get + d.enumerable + d.configurable + typeof d.set"),
            JsValue::string("functiontruetrueundefined")
        );
        assert_eq!(run("({ 1: 'one', 'two': 2 })[1]"), JsValue::string("one"));
    }

    #[test]
    fn array_literal_holes() {
        assert_eq!(run("[1, , 3].length"), JsValue::Number(3.0));
        assert_eq!(run("1 in [1, , 3]"), JsValue::Boolean(false));
        assert_eq!(run("[, ].length"), JsValue::Number(1.0));
    }

    #[test]
    fn delete_operator() {
        assert_eq!(run("var o = { a: 1 }; delete o.a; 'a' in o"), JsValue::Boolean(false));
        assert_eq!(run("delete nothing_here"), JsValue::Boolean(true));
        assert_eq!(run("var v = 1; delete v"), JsValue::Boolean(false));
        assert_eq!(run("delete 1"), JsValue::Boolean(true));
        assert!(throws(
            "(function () { 'use strict'; delete Object.prototype; })()",
            "TypeError"
        ));
    }

    #[test]
    fn in_and_instanceof() {
        assert_eq!(run("'length' in []"), JsValue::Boolean(true));
        assert!(throws("'a' in 'abc'", "TypeError"));
        assert_eq!(run("[] instanceof Array && !({} instanceof Array)"), JsValue::Boolean(true));
        assert!(throws("({}) instanceof {}", "TypeError"));
        assert!(throws(
            "function F() {} F.prototype = 1; ({}) instanceof F",
            "TypeError"
        ));
    }

    #[test]
    fn call_this_values() {
        assert_eq!(
            run("var o = { f: function () { return this === o; } }; o.f()"),
            JsValue::Boolean(true)
        );
        assert_eq!(
            run("var o = { f: function () { return this; } }; var g = o.f; g() === this"),
            JsValue::Boolean(true)
        );
        assert_eq!(
            run("var o = { f: function () { return this === o; } }; with (o) { f() }"),
            JsValue::Boolean(true)
        );
    }

    #[test]
    fn calling_non_function_reports_callee() {
        assert_eq!(
            run("var o = {}; try { o.missing(); } catch (e) { e.message }"),
            JsValue::string("o.missing is not a function")
        );
        assert!(throws("new 5", "TypeError"));
    }
}
