//! Operands: the right-hand-side values instructions read, and the optional
//! assignment target ("lvalue") a read operand was produced from (§3, §4.1).

use crate::ids::{ConstId, TempId};

/// An operand to an instruction (§3 "RValue").
#[derive(Debug, Clone, PartialEq)]
pub struct RValue {
    pub kind: RValueKind,
    /// Stamped by the builder when this read came from a variable or a
    /// `get(container, key)` expression, so `mkAssignment` knows how to
    /// write back through it (§4.1 "Assignment lvalues").
    pub lvalue: Option<LValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RValueKind {
    Undef,
    Temporary(TempId),
    Constant(ConstId),
    Param(u32),
    GlobalRef(u32),
}

impl RValue {
    pub fn new(kind: RValueKind) -> Self {
        Self { kind, lvalue: None }
    }

    pub fn with_lvalue(kind: RValueKind, lvalue: LValue) -> Self {
        Self { kind, lvalue: Some(lvalue) }
    }

    pub fn undef() -> Self {
        Self::new(RValueKind::Undef)
    }

    pub fn temp(id: TempId) -> Self {
        Self::new(RValueKind::Temporary(id))
    }

    pub fn constant(id: ConstId) -> Self {
        Self::new(RValueKind::Constant(id))
    }

    pub fn param(index: u32) -> Self {
        Self::new(RValueKind::Param(index))
    }

    pub fn global(id: u32) -> Self {
        Self::new(RValueKind::GlobalRef(id))
    }

    pub fn as_temp(&self) -> Option<TempId> {
        match self.kind {
            RValueKind::Temporary(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<ConstId> {
        match self.kind {
            RValueKind::Constant(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_undef(&self) -> bool {
        matches!(self.kind, RValueKind::Undef)
    }
}

/// The assignable location an `RValue` read was produced from (§4.1).
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    Variable(String),
    Member { container: Box<RValue>, key: Box<RValue> },
}

impl LValue {
    pub fn variable(name: impl Into<String>) -> Self {
        LValue::Variable(name.into())
    }

    pub fn member(container: RValue, key: RValue) -> Self {
        LValue::Member { container: Box::new(container), key: Box::new(key) }
    }
}
