use super::arg;
use crate::interpreter::Interpreter;
use crate::interpreter::helpers::{is_js_whitespace, relative_index};
use crate::interpreter::object::ObjectKind;
use crate::types::{JsString, JsValue, number_ops};

/// Longest string a method may build, in code units.
const MAX_STRING_LENGTH: f64 = ((1u64 << 30) - 1) as f64;

/// CheckObjectCoercible then ToString of `this` (the prologue of every
/// `String.prototype` method, §15.5.4).
fn this_str(interp: &mut Interpreter, this: &JsValue, method: &str) -> Result<JsString, JsValue> {
    interp.check_object_coercible(this, &format!("String.prototype.{method}"))?;
    interp.to_js_string(this)
}

fn this_string_value(interp: &mut Interpreter, this: &JsValue, method: &str) -> Result<JsValue, JsValue> {
    match this {
        JsValue::String(s) => return Ok(JsValue::String(s.clone())),
        JsValue::Object(o) => {
            if let ObjectKind::String(s) = &o.borrow().kind {
                return Ok(JsValue::String(s.clone()));
            }
        }
        _ => {}
    }
    Err(interp.create_type_error(&format!("String.prototype.{method} requires that 'this' be a String")))
}

fn units(units: &[u16]) -> JsValue {
    JsValue::String(JsString {
        code_units: units.to_vec(),
    })
}

fn string_call(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    match args.first() {
        None => Ok(JsValue::string("")),
        Some(v @ JsValue::Symbol(_)) => Ok(JsValue::string(&interp.to_display_string(v))),
        Some(v) => interp.to_js_string(v).map(JsValue::String),
    }
}

fn string_construct(interp: &mut Interpreter, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = match args.first() {
        None => JsString::default(),
        Some(v) => interp.to_js_string(v)?,
    };
    interp.to_object(&JsValue::String(s)).map(JsValue::Object)
}

fn from_char_code(interp: &mut Interpreter, _this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let mut code_units = Vec::with_capacity(args.len());
    for a in args {
        code_units.push(number_ops::to_uint16(interp.to_number(a)?));
    }
    Ok(JsValue::String(JsString { code_units }))
}

fn to_string(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_string_value(interp, this, "toString")
}

fn value_of(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    this_string_value(interp, this, "valueOf")
}

/// Position argument as an index, or `None` when out of range.
fn position(interp: &mut Interpreter, pos: &JsValue, len: usize) -> Result<Option<usize>, JsValue> {
    let p = interp.to_integer(pos)?;
    Ok((p >= 0.0 && p < len as f64).then_some(p as usize))
}

fn char_at(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "charAt")?;
    Ok(match position(interp, &arg(args, 0), s.len())? {
        Some(i) => units(&s.code_units[i..=i]),
        None => JsValue::string(""),
    })
}

fn char_code_at(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "charCodeAt")?;
    Ok(match position(interp, &arg(args, 0), s.len())? {
        Some(i) => JsValue::Number(f64::from(s.code_units[i])),
        None => JsValue::Number(f64::NAN),
    })
}

fn concat(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let mut s = this_str(interp, this, "concat")?;
    for a in args {
        let part = interp.to_js_string(a)?;
        s.code_units.extend_from_slice(&part.code_units);
    }
    Ok(JsValue::String(s))
}

/// Clamped integer position; `default` applies to undefined.
fn clamped(interp: &mut Interpreter, v: &JsValue, default: f64, len: usize) -> Result<usize, JsValue> {
    let n = match v {
        JsValue::Undefined => default,
        v => interp.to_integer(v)?,
    };
    Ok(n.clamp(0.0, len as f64) as usize)
}

fn index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "indexOf")?;
    let search = interp.to_js_string(&arg(args, 0))?;
    let start = clamped(interp, &arg(args, 1), 0.0, s.len())?;
    Ok(JsValue::Number(s.index_of(&search, start).map_or(-1.0, |i| i as f64)))
}

// §15.5.4.8
fn last_index_of(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "lastIndexOf")?;
    let search = interp.to_js_string(&arg(args, 0))?;
    let pos = interp.to_number(&arg(args, 1))?;
    let start = if pos.is_nan() {
        s.len()
    } else {
        number_ops::to_integer(pos).clamp(0.0, s.len() as f64) as usize
    };
    Ok(JsValue::Number(s.last_index_of(&search, start).map_or(-1.0, |i| i as f64)))
}

fn slice(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "slice")?;
    let len = s.len() as f64;
    let start = relative_index(interp.to_integer(&arg(args, 0))?, len);
    let end = match arg(args, 1) {
        JsValue::Undefined => len,
        e => relative_index(interp.to_integer(&e)?, len),
    };
    Ok(JsValue::String(s.slice_utf16(start as usize, end as usize)))
}

fn substring(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "substring")?;
    let a = clamped(interp, &arg(args, 0), 0.0, s.len())?;
    let b = clamped(interp, &arg(args, 1), s.len() as f64, s.len())?;
    Ok(JsValue::String(s.slice_utf16(a.min(b), a.max(b))))
}

// §B.2.3
fn substr(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "substr")?;
    let len = s.len() as f64;
    let start = relative_index(interp.to_integer(&arg(args, 0))?, len);
    let count = match arg(args, 1) {
        JsValue::Undefined => f64::INFINITY,
        c => interp.to_integer(&c)?,
    };
    let count = count.clamp(0.0, len - start);
    Ok(JsValue::String(s.slice_utf16(start as usize, (start + count) as usize)))
}

/// Case mapping that leaves unpaired surrogates in place.
fn map_case(s: &JsString, upper: bool) -> JsString {
    let mut code_units = Vec::with_capacity(s.len());
    let mut buf = [0u16; 2];
    for decoded in char::decode_utf16(s.code_units.iter().copied()) {
        match decoded {
            Ok(c) if upper => {
                for m in c.to_uppercase() {
                    code_units.extend_from_slice(m.encode_utf16(&mut buf));
                }
            }
            Ok(c) => {
                for m in c.to_lowercase() {
                    code_units.extend_from_slice(m.encode_utf16(&mut buf));
                }
            }
            Err(e) => code_units.push(e.unpaired_surrogate()),
        }
    }
    JsString { code_units }
}

fn to_lower_case(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "toLowerCase")?;
    Ok(JsValue::String(map_case(&s, false)))
}

fn to_upper_case(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "toUpperCase")?;
    Ok(JsValue::String(map_case(&s, true)))
}

fn is_space_unit(unit: &u16) -> bool {
    char::from_u32(u32::from(*unit)).is_some_and(is_js_whitespace)
}

fn trim(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "trim")?;
    let start = s.code_units.iter().position(|u| !is_space_unit(u)).unwrap_or(s.len());
    let end = s.code_units.iter().rposition(|u| !is_space_unit(u)).map_or(start, |i| i + 1);
    Ok(units(&s.code_units[start..end]))
}

// §15.5.4.14, string separators only
fn split(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "split")?;
    let limit = match arg(args, 1) {
        JsValue::Undefined => u32::MAX as usize,
        l => interp.to_uint32(&l)? as usize,
    };
    let separator = arg(args, 0);
    if separator.is_undefined() {
        let parts = if limit == 0 { Vec::new() } else { vec![JsValue::String(s)] };
        return Ok(interp.create_array(parts));
    }
    let sep = interp.to_js_string(&separator)?;
    let mut parts = Vec::new();
    if limit == 0 {
        return Ok(interp.create_array(parts));
    }
    if s.is_empty() {
        if !sep.is_empty() {
            parts.push(JsValue::String(s));
        }
        return Ok(interp.create_array(parts));
    }
    if sep.is_empty() {
        parts.extend(s.code_units.iter().take(limit).map(|u| units(&[*u])));
        return Ok(interp.create_array(parts));
    }
    let mut from = 0;
    while let Some(found) = s.index_of(&sep, from) {
        parts.push(units(&s.code_units[from..found]));
        if parts.len() == limit {
            return Ok(interp.create_array(parts));
        }
        from = found + sep.len();
    }
    parts.push(units(&s.code_units[from..]));
    Ok(interp.create_array(parts))
}

fn starts_with(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "startsWith")?;
    let search = interp.to_js_string(&arg(args, 0))?;
    let start = clamped(interp, &arg(args, 1), 0.0, s.len())?;
    Ok(JsValue::Boolean(s.code_units[start..].starts_with(&search.code_units)))
}

fn pad(interp: &mut Interpreter, this: &JsValue, args: &[JsValue], at_start: bool) -> Result<JsValue, JsValue> {
    let method = if at_start { "padStart" } else { "padEnd" };
    let s = this_str(interp, this, method)?;
    let max_len = interp.to_integer(&arg(args, 0))?;
    if max_len <= s.len() as f64 {
        return Ok(JsValue::String(s));
    }
    let filler = match arg(args, 1) {
        JsValue::Undefined => JsString::from_str(" "),
        f => interp.to_js_string(&f)?,
    };
    if filler.is_empty() {
        return Ok(JsValue::String(s));
    }
    if max_len > MAX_STRING_LENGTH {
        return Err(interp.create_range_error("Invalid string length"));
    }
    let fill_len = max_len as usize - s.len();
    let fill: Vec<u16> = filler.code_units.iter().copied().cycle().take(fill_len).collect();
    let code_units = if at_start {
        [fill.as_slice(), &s.code_units].concat()
    } else {
        [s.code_units.as_slice(), &fill].concat()
    };
    Ok(JsValue::String(JsString { code_units }))
}

fn pad_start(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    pad(interp, this, args, true)
}

fn pad_end(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    pad(interp, this, args, false)
}

fn to_locale_lower_case(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "toLocaleLowerCase")?;
    Ok(JsValue::String(map_case(&s, false)))
}

fn to_locale_upper_case(interp: &mut Interpreter, this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "toLocaleUpperCase")?;
    Ok(JsValue::String(map_case(&s, true)))
}

// §15.5.4.9, ordinal comparison of code units
fn locale_compare(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "localeCompare")?;
    let that = interp.to_js_string(&arg(args, 0))?;
    let order = s.code_units.cmp(&that.code_units) as i8;
    Ok(JsValue::Number(f64::from(order)))
}

/// Pattern argument of `search`/`replace` as a literal string.
fn pattern_string(interp: &mut Interpreter, pattern: &JsValue) -> Result<JsString, JsValue> {
    match pattern {
        JsValue::Undefined => Ok(JsString::default()),
        p => interp.to_js_string(p),
    }
}

fn search(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "search")?;
    let pattern = pattern_string(interp, &arg(args, 0))?;
    Ok(JsValue::Number(s.index_of(&pattern, 0).map_or(-1.0, |i| i as f64)))
}

/// Expands `$$`, `$&`, `` $` `` and `$'` in a replacement template. Other
/// `$` sequences are kept as written.
fn expand_replacement(template: &[u16], subject: &[u16], start: usize, end: usize) -> Vec<u16> {
    const DOLLAR: u16 = b'$' as u16;
    let mut out = Vec::with_capacity(template.len());
    let mut i = 0;
    while i < template.len() {
        let c = template[i];
        if c != DOLLAR || i + 1 == template.len() {
            out.push(c);
            i += 1;
            continue;
        }
        match template[i + 1] {
            DOLLAR => out.push(DOLLAR),
            0x26 => out.extend_from_slice(&subject[start..end]),
            0x60 => out.extend_from_slice(&subject[..start]),
            0x27 => out.extend_from_slice(&subject[end..]),
            other => out.extend_from_slice(&[DOLLAR, other]),
        }
        i += 2;
    }
    out
}

// §15.5.4.11 with a string search value: only the first occurrence is replaced
fn replace(interp: &mut Interpreter, this: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let s = this_str(interp, this, "replace")?;
    let search = interp.to_js_string(&arg(args, 0))?;
    let replacement = arg(args, 1);
    let Some(start) = s.index_of(&search, 0) else {
        return Ok(JsValue::String(s));
    };
    let end = start + search.len();
    let inserted = if replacement.is_callable() {
        let call_args = [
            JsValue::String(search),
            JsValue::Number(start as f64),
            JsValue::String(s.clone()),
        ];
        let result = interp.call(&replacement, &JsValue::Undefined, &call_args)?;
        interp.to_js_string(&result)?.code_units
    } else {
        let template = interp.to_js_string(&replacement)?;
        expand_replacement(&template.code_units, &s.code_units, start, end)
    };
    let code_units = [&s.code_units[..start], inserted.as_slice(), &s.code_units[end..]].concat();
    Ok(JsValue::String(JsString { code_units }))
}

impl Interpreter {
    pub(super) fn setup_string_prototype(&mut self) {
        let proto = self.realm.string_prototype.clone();
        let ctor = self.install_constructor("String", 1, string_call, string_construct, &proto);
        self.install_methods(&ctor, &[("fromCharCode", 1, from_char_code)]);
        self.install_methods(
            &proto,
            &[
                ("toString", 0, to_string),
                ("valueOf", 0, value_of),
                ("charAt", 1, char_at),
                ("charCodeAt", 1, char_code_at),
                ("concat", 1, concat),
                ("indexOf", 1, index_of),
                ("lastIndexOf", 1, last_index_of),
                ("slice", 2, slice),
                ("substring", 2, substring),
                ("substr", 2, substr),
                ("toLowerCase", 0, to_lower_case),
                ("toUpperCase", 0, to_upper_case),
                ("toLocaleLowerCase", 0, to_locale_lower_case),
                ("toLocaleUpperCase", 0, to_locale_upper_case),
                ("localeCompare", 1, locale_compare),
                ("search", 1, search),
                ("replace", 2, replace),
                ("trim", 0, trim),
                ("split", 2, split),
                ("startsWith", 1, starts_with),
                ("padStart", 1, pad_start),
                ("padEnd", 1, pad_end),
            ],
        );
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

    fn error_of(src: &str) -> String {
        let mut interp = Interpreter::new();
        match interp.execute(src) {
            Ok(v) => panic!("expected an error, got {v}"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn constructor_and_wrappers() {
        assert_eq!(run("String(12) + String()"), JsValue::string("12"));
        assert_eq!(run("var s = new String('ab'); [typeof s, s.length, s[1]].join()"), JsValue::string("object,2,b"));
        assert_eq!(run("String(Symbol('d'))"), JsValue::string("Symbol(d)"));
        assert_eq!(run("String.fromCharCode(104, 105, 65536 + 33)"), JsValue::string("hi!"));
        assert!(error_of("String.prototype.valueOf.call({})").starts_with("TypeError"));
    }

    #[test]
    fn character_access() {
        assert_eq!(run("'abc'.charAt(1) + 'abc'.charAt(5)"), JsValue::string("b"));
        assert_eq!(run("'A'.charCodeAt(0)"), JsValue::Number(65.0));
        assert!(run("'A'.charCodeAt(3)").is_nan());
        assert_eq!(run("'\\ud83d\\ude00'.length"), JsValue::Number(2.0));
    }

    #[test]
    fn searching() {
        assert_eq!(run("'banana'.indexOf('an', 2)"), JsValue::Number(3.0));
        assert_eq!(run("'banana'.lastIndexOf('an')"), JsValue::Number(3.0));
        assert_eq!(run("'banana'.lastIndexOf('an', 2)"), JsValue::Number(1.0));
        assert_eq!(run("'abc'.indexOf('')"), JsValue::Number(0.0));
        assert_eq!(run("'abc'.startsWith('bc', 1) && !'abc'.startsWith('a', 1)"), JsValue::Boolean(true));
    }

    #[test]
    fn extracting() {
        assert_eq!(run("'hello'.slice(1, -1)"), JsValue::string("ell"));
        assert_eq!(run("'hello'.substring(4, 1)"), JsValue::string("ell"));
        assert_eq!(run("'hello'.substr(-3, 2)"), JsValue::string("ll"));
        assert_eq!(run("'hello'.substr(1)"), JsValue::string("ello"));
        assert_eq!(run("'a'.concat(1, null)"), JsValue::string("a1null"));
    }

    #[test]
    fn case_and_whitespace() {
        assert_eq!(run("'MiXeD'.toLowerCase() + 'straße'.toUpperCase()"), JsValue::string("mixedSTRASSE"));
        assert_eq!(run("'\\u00a0\\t x \\n\\ufeff'.trim()"), JsValue::string("x"));
    }

    #[test]
    fn splitting() {
        assert_eq!(run("'a,b,,c'.split(',').length"), JsValue::Number(4.0));
        assert_eq!(run("'a,b,c'.split(',', 2).join('|')"), JsValue::string("a|b"));
        assert_eq!(run("'abc'.split('').join('|')"), JsValue::string("a|b|c"));
        assert_eq!(run("''.split('').length + ''.split(',').length"), JsValue::Number(1.0));
        assert_eq!(run("'abc'.split()[0]"), JsValue::string("abc"));
    }

    #[test]
    fn padding() {
        assert_eq!(run("'5'.padStart(3, '0')"), JsValue::string("005"));
        assert_eq!(run("'ab'.padEnd(5, 'xy')"), JsValue::string("abxyx"));
        assert_eq!(run("'abc'.padStart(2)"), JsValue::string("abc"));
        assert_eq!(run("'a'.padEnd(3)"), JsValue::string("a  "));
    }

    #[test]
    fn padding_beyond_max_length_is_range_error() {
        assert_eq!(error_of("'a'.padStart(Infinity)"), "RangeError: Invalid string length");
        assert_eq!(error_of("'a'.padEnd(1e300, 'x')"), "RangeError: Invalid string length");
        assert_eq!(
            run("try { 'a'.padStart(Infinity) } catch (e) { e instanceof RangeError }"),
            JsValue::Boolean(true)
        );
        assert_eq!(run("'a'.padStart(Infinity, '')"), JsValue::string("a"));
    }

    #[test]
    fn locale_variants() {
        assert_eq!(run("'MiX'.toLocaleLowerCase() + 'MiX'.toLocaleUpperCase()"), JsValue::string("mixMIX"));
        assert_eq!(run("'a'.localeCompare('b')"), JsValue::Number(-1.0));
        assert_eq!(run("'b'.localeCompare('a')"), JsValue::Number(1.0));
        assert_eq!(run("'same'.localeCompare('same')"), JsValue::Number(0.0));
        assert_eq!(run("'B'.localeCompare('a')"), JsValue::Number(-1.0));
        assert!(error_of("String.prototype.localeCompare.call(null, 'a')").starts_with("TypeError"));
    }

    #[test]
    fn search_with_string_pattern() {
        assert_eq!(run("'banana'.search('nan')"), JsValue::Number(2.0));
        assert_eq!(run("'banana'.search('x')"), JsValue::Number(-1.0));
        assert_eq!(run("'abc'.search()"), JsValue::Number(0.0));
        assert_eq!(run("'a null'.search(null)"), JsValue::Number(2.0));
    }

    #[test]
    fn replace_first_occurrence() {
        assert_eq!(run("'aXbXc'.replace('X', '-')"), JsValue::string("a-bXc"));
        assert_eq!(run("'abc'.replace('z', '-')"), JsValue::string("abc"));
        assert_eq!(run("'abc'.replace('b', '[$&|$`|$\'|$$|$1]')"), JsValue::string("a[b|a|c|$|$1]c"));
        assert_eq!(
            run("'abcb'.replace('b', function (m, i, s) { return m.toUpperCase() + i + s.length; })"),
            JsValue::string("aB14cb")
        );
        assert_eq!(run("'x'.replace('x', 5)"), JsValue::string("5"));
    }

    #[test]
    fn methods_reject_null_this() {
        assert_eq!(
            error_of("String.prototype.trim.call(null)"),
            "TypeError: String.prototype.trim called on null or undefined"
        );
        assert_eq!(run("String.prototype.charAt.call(12, 0)"), JsValue::string("1"));
    }
}
