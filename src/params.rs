//! Node parameters: typed records, named controls and kernel parameter blocks.
//!
//! Every node kind keeps its parameters in a plain Rust struct implementing
//! [`Kernel`]. The struct names the kernel it drives and lists its [`Control`]s,
//! which allow parameters to be read and written by name:
//!
//! ```
//! use noisegraph::{Generator, SoftwareBackend, Value, nodes::Simplex};
//!
//! let backend = SoftwareBackend::new();
//! let noise = Generator::new(&backend, Simplex::default())?;
//! noise.set("octaves", 3)?;
//! noise.set("frequency", 4.0)?;
//! assert_eq!(noise.get("octaves")?, Value::Int(3));
//! # Ok::<(), noisegraph::NoiseError>(())
//! ```
//!
//! When a node recomputes, its parameters are packed into a [`ParamBlock`]: one
//! byte buffer per kernel binding, in binding order.

use bytemuck::Pod;

use crate::error::NoiseError;

/// A dynamically typed parameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Float(f32),
    Int(i32),
    Bool(bool),
}

/// The type a [`Control`] accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Int,
    Bool,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// Read as a float. Integers are widened.
    pub fn as_float(self, name: &'static str) -> Result<f32, NoiseError> {
        match self {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f32),
            Value::Bool(_) => Err(NoiseError::ParameterType {
                name,
                expected: "float",
            }),
        }
    }

    pub fn as_int(self, name: &'static str) -> Result<i32, NoiseError> {
        match self {
            Value::Int(v) => Ok(v),
            _ => Err(NoiseError::ParameterType {
                name,
                expected: "integer",
            }),
        }
    }

    pub fn as_bool(self, name: &'static str) -> Result<bool, NoiseError> {
        match self {
            Value::Bool(v) => Ok(v),
            _ => Err(NoiseError::ParameterType {
                name,
                expected: "boolean",
            }),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v as f32)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// A named accessor for one field of a parameter record.
pub struct Control<P> {
    pub name: &'static str,
    pub kind: ValueKind,
    pub(crate) get: fn(&P) -> Value,
    pub(crate) set: fn(&mut P, Value) -> Result<(), NoiseError>,
}

impl<P> Control<P> {
    pub fn get(&self, params: &P) -> Value {
        (self.get)(params)
    }

    pub fn set(&self, params: &mut P, value: Value) -> Result<(), NoiseError> {
        (self.set)(params, value)
    }
}

/// Look up `name` in `controls`.
pub fn find_control<'a, P>(
    controls: &'a [Control<P>],
    name: &str,
) -> Result<&'a Control<P>, NoiseError> {
    controls
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| NoiseError::UnknownParameter(name.to_string()))
}

/// Declares a [`Control`] over a field of `Self`.
///
/// ```ignore
/// const CONTROLS: &'static [Control<Self>] = &[
///     control!("frequency", frequency: f32),
///     control!("octaves", octaves: i32),
///     control!("seamless", seamless: bool),
/// ];
/// ```
macro_rules! control {
    ($name:literal, $($field:ident).+ : f32) => {
        $crate::params::Control {
            name: $name,
            kind: $crate::params::ValueKind::Float,
            get: |p: &Self| $crate::params::Value::Float(p.$($field).+),
            set: |p: &mut Self, v: $crate::params::Value| {
                p.$($field).+ = v.as_float($name)?;
                Ok(())
            },
        }
    };
    ($name:literal, $($field:ident).+ : i32) => {
        $crate::params::Control {
            name: $name,
            kind: $crate::params::ValueKind::Int,
            get: |p: &Self| $crate::params::Value::Int(p.$($field).+),
            set: |p: &mut Self, v: $crate::params::Value| {
                p.$($field).+ = v.as_int($name)?;
                Ok(())
            },
        }
    };
    ($name:literal, $($field:ident).+ : bool) => {
        $crate::params::Control {
            name: $name,
            kind: $crate::params::ValueKind::Bool,
            get: |p: &Self| $crate::params::Value::Bool(p.$($field).+),
            set: |p: &mut Self, v: $crate::params::Value| {
                p.$($field).+ = v.as_bool($name)?;
                Ok(())
            },
        }
    };
}
pub(crate) use control;

/// A parameter record bound to a catalogue kernel.
pub trait Kernel: Clone + 'static {
    /// Catalogue name of the kernel this record drives.
    const NAME: &'static str;
    /// Named accessors for every user-facing field.
    const CONTROLS: &'static [Control<Self>];
}

/// Raw parameter buffers for one dispatch, in binding order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamBlock {
    buffers: Vec<Vec<u8>>,
}

impl ParamBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A block holding a single uniform record.
    pub fn uniform<T: Pod>(record: &T) -> Self {
        Self::new().with(record)
    }

    /// Append a buffer holding `record`.
    pub fn with<T: Pod>(mut self, record: &T) -> Self {
        self.buffers.push(bytemuck::bytes_of(record).to_vec());
        self
    }

    /// Append a buffer holding a tightly packed array.
    pub fn with_slice<T: Pod>(mut self, data: &[T]) -> Self {
        self.buffers.push(bytemuck::cast_slice(data).to_vec());
        self
    }

    pub fn buffers(&self) -> &[Vec<u8>] {
        &self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Knobs {
        gain: f32,
        taps: i32,
        wrap: bool,
    }

    impl Kernel for Knobs {
        const NAME: &'static str = "knobs";
        const CONTROLS: &'static [Control<Self>] = &[
            control!("gain", gain: f32),
            control!("taps", taps: i32),
            control!("wrap", wrap: bool),
        ];
    }

    #[test]
    fn controls_read_and_write_fields() {
        let mut knobs = Knobs::default();
        find_control(Knobs::CONTROLS, "gain")
            .unwrap()
            .set(&mut knobs, Value::Int(2))
            .unwrap();
        find_control(Knobs::CONTROLS, "wrap")
            .unwrap()
            .set(&mut knobs, true.into())
            .unwrap();
        assert_eq!(knobs.gain, 2.0);
        assert!(knobs.wrap);
        assert_eq!(Knobs::CONTROLS[1].get(&knobs), Value::Int(0));
    }

    #[test]
    fn controls_reject_wrong_types_and_names() {
        let mut knobs = Knobs::default();
        let taps = find_control(Knobs::CONTROLS, "taps").unwrap();
        assert!(matches!(
            taps.set(&mut knobs, Value::Float(1.5)),
            Err(NoiseError::ParameterType { name: "taps", .. })
        ));
        assert!(matches!(
            find_control(Knobs::CONTROLS, "volume"),
            Err(NoiseError::UnknownParameter(_))
        ));
    }

    #[test]
    fn param_block_keeps_binding_order() {
        let block = ParamBlock::new().with_slice(&[1.0f32, 2.0]).with(&7u32);
        assert_eq!(block.len(), 2);
        assert_eq!(block.buffers()[0].len(), 8);
        assert_eq!(block.buffers()[1], 7u32.to_ne_bytes().to_vec());
    }
}
