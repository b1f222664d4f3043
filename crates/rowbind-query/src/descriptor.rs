//! Query descriptors and return type resolution.
//!
//! A method on a declared query interface is described by a
//! [`MethodSignature`]: which interface and method it is, the optional
//! [`QueryDescriptor`] carrying its SQL template, and a [`DeclaredType`]
//! describing what it returns. [`resolve`] turns a signature into the
//! template plus the type every result row is mapped into.

use crate::error::{MapperError, MapperResult};
use crate::mapper::Entity;
use std::collections::VecDeque;
use std::fmt;

/// SQL template attached to an interface method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDescriptor {
    template: &'static str,
}

impl QueryDescriptor {
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &'static str {
        self.template
    }
}

/// Name of a Rust type taking part in a declared return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
        }
    }

    pub const fn named(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How a parameterized return type holds its type arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Ordered collection of any length (`Vec`, `VecDeque`)
    Sequence,
    /// Zero-or-one container (`Option`)
    Optional,
    /// Any other generic wrapper
    Other,
}

impl ContainerKind {
    pub fn is_sequence_like(&self) -> bool {
        matches!(self, ContainerKind::Sequence | ContainerKind::Optional)
    }
}

/// Declared return type of an interface method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    /// A concrete, non-generic type
    Plain(TypeInfo),
    /// A generic type applied to type arguments
    Parameterized {
        raw: TypeInfo,
        args: Vec<DeclaredType>,
        kind: ContainerKind,
    },
}

impl DeclaredType {
    pub fn plain<T: ?Sized>() -> Self {
        DeclaredType::Plain(TypeInfo::of::<T>())
    }

    /// `raw<T>` with a single plain type argument
    pub fn container_of<T: ?Sized>(raw: &'static str, kind: ContainerKind) -> Self {
        DeclaredType::Parameterized {
            raw: TypeInfo::named(raw),
            args: vec![DeclaredType::plain::<T>()],
            kind,
        }
    }

    /// The outermost type, without its arguments
    pub fn raw(&self) -> TypeInfo {
        match self {
            DeclaredType::Plain(info) => *info,
            DeclaredType::Parameterized { raw, .. } => *raw,
        }
    }

    /// The type each result row maps into.
    ///
    /// Plain types map to themselves. Sequence-like containers map to their
    /// first type argument. Any other parameterized type maps to its raw type.
    pub fn target(&self) -> TypeInfo {
        match self {
            DeclaredType::Plain(info) => *info,
            DeclaredType::Parameterized { raw, args, kind } if kind.is_sequence_like() => {
                args.first().map(DeclaredType::raw).unwrap_or(*raw)
            }
            DeclaredType::Parameterized { raw, .. } => *raw,
        }
    }

    pub fn shape(&self) -> ReturnShape {
        match self {
            DeclaredType::Parameterized {
                kind: ContainerKind::Sequence,
                ..
            } => ReturnShape::Sequence,
            DeclaredType::Parameterized {
                kind: ContainerKind::Optional,
                ..
            } => ReturnShape::Optional,
            _ => ReturnShape::Single,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Plain(info) => write!(f, "{}", info),
            DeclaredType::Parameterized { raw, args, .. } => {
                write!(f, "{}<", raw)?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
        }
    }
}

/// How mapped rows are handed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Every mapped row
    Sequence,
    /// The first mapped row, if any
    Optional,
    /// The first mapped row; no rows is an error
    Single,
}

/// Stable identity and metadata of one method on a declared interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub interface: &'static str,
    pub method: &'static str,
    pub descriptor: Option<QueryDescriptor>,
    pub return_type: DeclaredType,
}

impl MethodSignature {
    pub fn new(
        interface: &'static str,
        method: &'static str,
        descriptor: Option<QueryDescriptor>,
        return_type: DeclaredType,
    ) -> Self {
        Self {
            interface,
            method,
            descriptor,
            return_type,
        }
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.interface, self.method)
    }
}

/// Template and target type of a queryable method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub template: &'static str,
    pub target: TypeInfo,
    pub shape: ReturnShape,
}

/// Resolve the query behind a method.
///
/// `None` means the method carries no descriptor and is not queryable; that
/// is an expected outcome, not a failure.
pub fn resolve(method: &MethodSignature) -> Option<ResolvedQuery> {
    let descriptor = method.descriptor?;

    Some(ResolvedQuery {
        template: descriptor.template(),
        target: method.return_type.target(),
        shape: method.return_type.shape(),
    })
}

/// Return types a query interface method may declare.
///
/// Implemented for `Vec<T>`, `VecDeque<T>` and `Option<T>` over any
/// [`Entity`], and for every type declared with [`entity!`](crate::entity).
pub trait QueryReturn: Sized + Send {
    /// Type each result row is mapped into
    type Target: Entity;

    fn declared_type() -> DeclaredType;

    /// Value returned by a method that carries no query descriptor
    fn empty() -> Self;

    /// Coerce mapped rows into the declared shape
    fn from_rows(method: &MethodSignature, rows: Vec<Self::Target>) -> MapperResult<Self>;
}

impl<T: Entity> QueryReturn for Vec<T> {
    type Target = T;

    fn declared_type() -> DeclaredType {
        DeclaredType::container_of::<T>("Vec", ContainerKind::Sequence)
    }

    fn empty() -> Self {
        Vec::new()
    }

    fn from_rows(_method: &MethodSignature, rows: Vec<T>) -> MapperResult<Self> {
        Ok(rows)
    }
}

impl<T: Entity> QueryReturn for VecDeque<T> {
    type Target = T;

    fn declared_type() -> DeclaredType {
        DeclaredType::container_of::<T>("VecDeque", ContainerKind::Sequence)
    }

    fn empty() -> Self {
        VecDeque::new()
    }

    fn from_rows(_method: &MethodSignature, rows: Vec<T>) -> MapperResult<Self> {
        Ok(rows.into())
    }
}

impl<T: Entity> QueryReturn for Option<T> {
    type Target = T;

    fn declared_type() -> DeclaredType {
        DeclaredType::container_of::<T>("Option", ContainerKind::Optional)
    }

    fn empty() -> Self {
        None
    }

    fn from_rows(_method: &MethodSignature, rows: Vec<T>) -> MapperResult<Self> {
        Ok(rows.into_iter().next())
    }
}

/// First mapped row of a method declared to return a single entity
pub fn first_row<T>(method: &MethodSignature, rows: Vec<T>) -> MapperResult<T> {
    rows.into_iter().next().ok_or_else(|| MapperError::EmptyResult {
        method: method.to_string(),
    })
}
