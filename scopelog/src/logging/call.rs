//! Arguments of a single log call and message interpolation.

use serde_json::{Map, Value};

/// The arguments passed to one logging call.
///
/// An optional metadata object, an optional template and the values
/// interpolated into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogCall {
    /// Structured fields merged into the entry.
    pub metadata: Map<String, Value>,
    /// Message template.
    pub template: Option<String>,
    /// Interpolation arguments.
    pub args: Vec<Value>,
}

impl LogCall {
    /// Creates a call with a message template.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: Some(template.into()),
            ..Self::default()
        }
    }

    /// Normalizes positional arguments.
    ///
    /// A leading object becomes metadata, the next string becomes the
    /// template, and everything after it is an interpolation argument.
    #[must_use]
    pub fn from_values(values: Vec<Value>) -> Self {
        let mut values = values.into_iter().peekable();
        let mut call = Self::default();

        if let Some(Value::Object(_)) = values.peek() {
            if let Some(Value::Object(map)) = values.next() {
                call.metadata = map;
            }
        }
        if let Some(Value::String(_)) = values.peek() {
            if let Some(Value::String(template)) = values.next() {
                call.template = Some(template);
            }
        }
        call.args = values.collect();
        call
    }

    /// Adds one metadata field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Merges a metadata object.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Adds an interpolation argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Renders the message.
    ///
    /// Supports `%s`, `%d`, `%i`, `%f`, `%j`, `%o`, `%O` and `%%`. A
    /// placeholder without a matching argument is left as written; surplus
    /// arguments are appended separated by spaces.
    #[must_use]
    pub fn format_message(&self) -> String {
        let mut args = self.args.iter();
        let mut out = String::new();

        if let Some(template) = &self.template {
            let mut chars = template.chars().peekable();
            while let Some(c) = chars.next() {
                if c != '%' {
                    out.push(c);
                    continue;
                }
                match chars.peek().copied() {
                    Some('%') => {
                        chars.next();
                        out.push('%');
                    }
                    Some(spec @ ('s' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O')) => {
                        chars.next();
                        match args.next() {
                            Some(arg) => out.push_str(&render(spec, arg)),
                            None => {
                                out.push('%');
                                out.push(spec);
                            }
                        }
                    }
                    _ => out.push('%'),
                }
            }
        }

        for arg in args {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&render('s', arg));
        }
        out
    }
}

impl From<&str> for LogCall {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for LogCall {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}

fn render(spec: char, arg: &Value) -> String {
    match spec {
        's' => match arg {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        'd' => as_number(arg).map_or_else(|| "NaN".to_string(), format_number),
        'i' => as_number(arg).map_or_else(
            || "NaN".to_string(),
            |n| format!("{}", n.trunc() as i64),
        ),
        'f' => as_number(arg).map_or_else(|| "NaN".to_string(), |n| n.to_string()),
        'O' => serde_json::to_string_pretty(arg).unwrap_or_default(),
        _ => arg.to_string(),
    }
}

fn as_number(arg: &Value) -> Option<f64> {
    match arg {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
