use std::fmt;

/// A value as it crosses the boundary with the scripting environment
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    #[default]
    Nil,
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<HostValue>),
}

impl HostValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Nil => "nil",
            HostValue::Int(_) => "Integer",
            HostValue::Float(_) => "Float",
            HostValue::Str(_) => "String",
            HostValue::Array(_) => "Array",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil)
    }

    /// Source-like rendering, with strings quoted
    pub fn inspect(&self) -> String {
        match self {
            HostValue::Nil => "nil".to_string(),
            HostValue::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Nil => Ok(()),
            HostValue::Int(n) => write!(f, "{n}"),
            // Debug keeps the trailing ".0" that marks a float
            HostValue::Float(x) => write!(f, "{x:?}"),
            HostValue::Str(s) => f.write_str(s),
            HostValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.inspect())?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<()> for HostValue {
    fn from(_: ()) -> Self {
        HostValue::Nil
    }
}

impl From<i64> for HostValue {
    fn from(n: i64) -> Self {
        HostValue::Int(n)
    }
}

impl From<u32> for HostValue {
    fn from(n: u32) -> Self {
        HostValue::Int(n.into())
    }
}

impl From<u64> for HostValue {
    fn from(n: u64) -> Self {
        HostValue::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for HostValue {
    fn from(x: f64) -> Self {
        HostValue::Float(x)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Str(s.to_string())
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Str(s)
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        HostValue::Array(items.into_iter().map(Into::into).collect())
    }
}
