//! Typed operator catalog.
//!
//! Every operator declares its input types, its output type and a WGSL
//! template with positional placeholders (`{0}`, `{1}`, ...). Templates are
//! parsed once at registration, so emitting code later is plain segment
//! concatenation. The registry is indexed by output type because that is the
//! only question the generator ever asks.
//!
//! Templates must be self-delimiting (wrapped in parentheses, a function call,
//! or a member access on an input) so any formula can be nested in any slot.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, FractalError, Result};
use crate::types::ValueType;

use ValueType::{Complex as C, Float as F};

/// The standard catalog: name, inputs, output, template.
const STANDARD: &[(&str, &[ValueType], ValueType, &str)] = &[
    ("create_cx", &[F, F], C, "vec2f({0}, {1})"),
    ("real", &[C], F, "{0}.x"),
    ("imag", &[C], F, "{0}.y"),
    ("mag", &[C], F, "length({0})"),
    ("abs_f", &[F], F, "abs({0})"),
    ("abs_cx", &[C], C, "abs({0})"),
    ("neg_f", &[F], F, "(-({0}))"),
    ("neg_cx", &[C], C, "(-({0}))"),
    ("add_f", &[F, F], F, "({0} + {1})"),
    ("add_cx", &[C, C], C, "({0} + {1})"),
    ("sub_f", &[F, F], F, "({0} - {1})"),
    ("sub_cx", &[C, C], C, "({0} - {1})"),
    ("mul_f", &[F, F], F, "({0} * {1})"),
    ("mul_cx", &[C, C], C, "cx_mul({0}, {1})"),
    ("div_f", &[F, F], F, "({0} / {1})"),
    ("div_cx", &[C, C], C, "cx_div({0}, {1})"),
    ("sqr_f", &[F], F, "({0} * {0})"),
    ("sqr_cx", &[C], C, "cx_sqr({0})"),
    ("cube_f", &[F], F, "({0} * {0} * {0})"),
    ("cube_cx", &[C], C, "cx_cube({0})"),
    ("exp_f", &[F], F, "exp({0})"),
    ("exp_cx", &[C], C, "cx_exp({0})"),
    ("dot", &[C, C], F, "dot({0}, {1})"),
    ("element_mul", &[C, C], C, "({0} * {1})"),
    ("sin_f", &[F], F, "sin({0})"),
    ("sin_cx", &[C], C, "cx_sin({0})"),
    ("cos_f", &[F], F, "cos({0})"),
    ("cos_cx", &[C], C, "cx_cos({0})"),
    ("tan_f", &[F], F, "tan({0})"),
];

// ── Templates ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Slot(usize),
}

/// A pre-parsed code template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source` for an operator of the given arity.
    ///
    /// Rejects out-of-range or malformed placeholders, inputs that are never
    /// referenced, and unbalanced parentheses.
    pub fn parse(op: &str, source: &str, arity: usize) -> Result<Self> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut used = vec![false; arity];
        let mut depth = 0i32;
        let mut chars = source.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '{' => {
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(d) if d.is_ascii_digit() => digits.push(d),
                            Some(other) => {
                                return Err(FractalError::bad_template(
                                    op,
                                    format!("unexpected '{other}' inside placeholder"),
                                ))
                            }
                            None => {
                                return Err(FractalError::bad_template(op, "unterminated placeholder"))
                            }
                        }
                    }
                    let index: usize = digits
                        .parse()
                        .map_err(|_| FractalError::bad_template(op, "empty placeholder"))?;
                    if index >= arity {
                        return Err(FractalError::bad_template(
                            op,
                            format!("placeholder {{{index}}} exceeds arity {arity}"),
                        ));
                    }
                    used[index] = true;
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Slot(index));
                }
                '}' => return Err(FractalError::bad_template(op, "unmatched '}'")),
                '(' => {
                    depth += 1;
                    text.push(ch);
                }
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(FractalError::bad_template(op, "unbalanced parentheses"));
                    }
                    text.push(ch);
                }
                _ => text.push(ch),
            }
        }

        if depth != 0 {
            return Err(FractalError::bad_template(op, "unbalanced parentheses"));
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        if let Some(unused) = used.iter().position(|u| !u) {
            return Err(FractalError::bad_template(
                op,
                format!("input {{{unused}}} is never used"),
            ));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Substitute rendered inputs into the template.
    pub fn apply(&self, inputs: &[String]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Slot(i) => out.push_str(&inputs[*i]),
            }
        }
        out
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

// ── Operators ──────────────────────────────────────────────────────────

/// A typed operator. Owned by the [`Registry`]; expression nodes borrow it.
#[derive(Debug)]
pub struct Operator {
    name: String,
    inputs: Vec<ValueType>,
    output: ValueType,
    template: Template,
}

impl Operator {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[ValueType] {
        &self.inputs
    }

    pub fn output(&self) -> ValueType {
        self.output
    }

    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Instantiate the template with one rendered string per input.
    pub fn apply(&self, inputs: &[String]) -> String {
        debug_assert_eq!(inputs.len(), self.arity());
        self.template.apply(inputs)
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<String> = self.inputs.iter().map(|t| t.to_string()).collect();
        write!(f, "{}({}) -> {}", self.name, inputs.join(", "), self.output)
    }
}

/// Serializable operator declaration, used for config-supplied catalogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    pub name: String,
    pub inputs: Vec<ValueType>,
    pub output: ValueType,
    pub template: String,
}

// ── Registry ───────────────────────────────────────────────────────────

/// Operator catalog indexed by output type.
#[derive(Debug)]
pub struct Registry {
    by_output: BTreeMap<ValueType, Vec<Operator>>,
    by_name: HashMap<String, (ValueType, usize)>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The built-in catalog.
    pub fn standard() -> Result<Self> {
        Self::builder().with_standard()?.build()
    }

    /// All operators whose output type is `output`. Never empty for a built registry.
    pub fn lookup(&self, output: ValueType) -> &[Operator] {
        self.by_output.get(&output).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, name: &str) -> Option<&Operator> {
        let (output, index) = self.by_name.get(name)?;
        self.by_output.get(output)?.get(*index)
    }

    /// Operators grouped by output type, in registration order within a group.
    pub fn iter(&self) -> impl Iterator<Item = &Operator> {
        self.by_output.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    by_output: BTreeMap<ValueType, Vec<Operator>>,
    by_name: HashMap<String, (ValueType, usize)>,
}

impl RegistryBuilder {
    /// Register one operator.
    pub fn op(
        mut self,
        name: &str,
        inputs: &[ValueType],
        output: ValueType,
        template: &str,
    ) -> Result<Self> {
        self.add(name, inputs, output, template)?;
        Ok(self)
    }

    pub fn add(
        &mut self,
        name: &str,
        inputs: &[ValueType],
        output: ValueType,
        template: &str,
    ) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(ErrorKind::DuplicateOperator(name.to_string()).into());
        }
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FractalError::bad_template(
                name,
                "operator names must be non-empty identifiers",
            ));
        }
        let template = Template::parse(name, template, inputs.len())?;
        let group = self.by_output.entry(output).or_default();
        self.by_name.insert(name.to_string(), (output, group.len()));
        group.push(Operator {
            name: name.to_string(),
            inputs: inputs.to_vec(),
            output,
            template,
        });
        Ok(())
    }

    pub fn add_spec(&mut self, spec: &OperatorSpec) -> Result<()> {
        self.add(&spec.name, &spec.inputs, spec.output, &spec.template)
    }

    pub fn with_standard(mut self) -> Result<Self> {
        for (name, inputs, output, template) in STANDARD {
            self.add(name, inputs, *output, template)?;
        }
        Ok(self)
    }

    /// Finish the catalog. Every value type must have at least one producer.
    pub fn build(self) -> Result<Registry> {
        for ty in ValueType::ALL {
            if self.by_output.get(&ty).map_or(true, Vec::is_empty) {
                return Err(ErrorKind::MissingOperator(ty).into());
            }
        }
        Ok(Registry {
            by_output: self.by_output,
            by_name: self.by_name,
        })
    }
}
