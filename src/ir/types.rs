//! The small, fixed universe of integer types this IR ever materializes.
//!
//! Unlike Cranelift's `ir::Type`, which also covers vectors and floats, the lifter only ever
//! needs the widths x86-64 general-purpose registers and EFLAGS bits come in.

use core::fmt;

/// An integer width used by a register cell, a memory access, or an IR value.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Type {
    /// A single EFLAGS bit.
    I1,
    I8,
    I16,
    I32,
    I64,
}

impl Type {
    /// Width of this type in bits.
    pub const fn bits(self) -> u32 {
        match self {
            Type::I1 => 1,
            Type::I8 => 8,
            Type::I16 => 16,
            Type::I32 => 32,
            Type::I64 => 64,
        }
    }

    /// Unsigned truncation mask for this width (`2^bits - 1`), used throughout the flag and
    /// sub-register formulas in §4.1.
    pub const fn mask(self) -> u64 {
        let bits = self.bits();
        if bits >= 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        }
    }

    /// Index of the most-significant bit of this width, used for `SF`/sign-extension.
    pub const fn msb_index(self) -> u32 {
        self.bits() - 1
    }

    pub const fn from_operand_width(w: crate::machine::Width) -> Self {
        match w {
            crate::machine::Width::W8 => Type::I8,
            crate::machine::Width::W16 => Type::I16,
            crate::machine::Width::W32 => Type::I32,
            crate::machine::Width::W64 => Type::I64,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Type::I1 => "i1",
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_match_bit_widths() {
        assert_eq!(Type::I8.mask(), 0xff);
        assert_eq!(Type::I32.mask(), 0xffff_ffff);
        assert_eq!(Type::I64.mask(), u64::MAX);
    }
}
