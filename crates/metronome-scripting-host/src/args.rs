use crate::{HostError, HostErrorKind, HostValue};

/// Positional arguments of one host call, with script-style coercion
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    function: &'a str,
    values: &'a [HostValue],
}

impl<'a> Args<'a> {
    pub fn new(function: &'a str, values: &'a [HostValue]) -> Self {
        Self { function, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn all(&self) -> &'a [HostValue] {
        self.values
    }

    pub fn expect_len(&self, expected: usize) -> Result<(), HostError> {
        if self.values.len() == expected {
            Ok(())
        } else {
            Err(HostError::new(
                HostErrorKind::ArgumentError,
                format!(
                    "{}: wrong number of arguments (given {}, expected {})",
                    self.function,
                    self.values.len(),
                    expected
                ),
            ))
        }
    }

    fn get(&self, index: usize) -> Result<&'a HostValue, HostError> {
        self.values.get(index).ok_or_else(|| {
            HostError::new(
                HostErrorKind::ArgumentError,
                format!("{}: missing argument {}", self.function, index + 1),
            )
        })
    }

    /// Integer argument; floats are truncated toward zero
    pub fn int(&self, index: usize) -> Result<i64, HostError> {
        match self.get(index)? {
            HostValue::Int(n) => Ok(*n),
            HostValue::Float(x) => {
                let truncated = x.trunc();
                if truncated.is_finite()
                    && truncated >= i64::MIN as f64
                    && truncated < i64::MAX as f64
                {
                    Ok(truncated as i64)
                } else {
                    Err(self.type_error(index, "Integer", &HostValue::Float(*x)))
                }
            }
            other => Err(self.type_error(index, "Integer", other)),
        }
    }

    /// Real argument; integers are widened
    pub fn float(&self, index: usize) -> Result<f64, HostError> {
        match self.get(index)? {
            HostValue::Float(x) => Ok(*x),
            HostValue::Int(n) => Ok(*n as f64),
            other => Err(self.type_error(index, "Float", other)),
        }
    }

    fn type_error(&self, index: usize, expected: &str, got: &HostValue) -> HostError {
        HostError::new(
            HostErrorKind::TypeError,
            format!(
                "{}: argument {} can't be converted from {} ({}) into {}",
                self.function,
                index + 1,
                got.type_name(),
                got.inspect(),
                expected
            ),
        )
    }
}
