//! The fixed keyword table.
//!
//! Every statement introducer and expression keyword the language
//! recognizes is a literal word matched against this table. The table is
//! built once per process (not once per [`crate::Config`] instance) since
//! it never changes at runtime.

use lazy_static::lazy_static;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // structural results, never looked up in the table
    Invalid,
    String,
    Number,

    // structural keywords
    Comment,
    Eof,
    Escape,
    Filler,
    Join,

    // statement introducers
    VarDeclaration,
    EnumDeclaration,
    VarAppend,
    VarPrepend,
    VarMerge,
    VarInjection,
    SectionBegin,
    SectionAdd,
    SectionDel,
    Include,
    ForBegin,
    ForEnd,
    Seed,
    Print,
    Restrict,

    // conditional expressions
    IfLt,
    IfLe,
    IfGt,
    IfGe,
    IfEq,
    IfNe,

    // math constants (arity 0)
    ConstTimestamp,
    ConstPi,
    ConstEuler,
    ConstTrue,
    ConstFalse,

    // unary math (arity 1)
    OpSqrt,
    OpCbrt,
    OpAbs,
    OpCeiling,
    OpFloor,
    OpRound,
    OpCos,
    OpSin,
    OpTan,
    OpAcos,
    OpAsin,
    OpAtan,
    OpCosh,
    OpSinh,
    OpLn,
    OpLog,

    // binary math (arity 2)
    OpAdd,
    OpSubtract,
    OpMultiply,
    OpDivide,
    OpMod,
    OpPow,
    OpBiggest,
    OpSmallest,
    OpRandom,

    // ternary math (arity 3)
    OpInterpolate,
    OpLimit,

    // color (arity 3 / 4)
    ClRgb,
    ClRgba,
    ClInterpolate,
}

impl TokenKind {
    /// Number of further tokens the evaluator must read as operands for
    /// this keyword. Used both by the real evaluator and by the structural
    /// skip path that discards a conditional's unchosen branch.
    pub fn arity(self) -> usize {
        use TokenKind::*;
        match self {
            ConstTimestamp | ConstPi | ConstEuler | ConstTrue | ConstFalse => 0,
            OpSqrt | OpCbrt | OpAbs | OpCeiling | OpFloor | OpRound | OpCos | OpSin | OpTan
            | OpAcos | OpAsin | OpAtan | OpCosh | OpSinh | OpLn | OpLog => 1,
            OpAdd | OpSubtract | OpMultiply | OpDivide | OpMod | OpPow | OpBiggest
            | OpSmallest | OpRandom => 2,
            OpInterpolate | OpLimit | ClRgb | ClInterpolate => 3,
            ClRgba => 4,
            _ => 0,
        }
    }

    pub fn is_math(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            ConstTimestamp
                | ConstPi
                | ConstEuler
                | ConstTrue
                | ConstFalse
                | OpSqrt
                | OpCbrt
                | OpAbs
                | OpCeiling
                | OpFloor
                | OpRound
                | OpCos
                | OpSin
                | OpTan
                | OpAcos
                | OpAsin
                | OpAtan
                | OpCosh
                | OpSinh
                | OpLn
                | OpLog
                | OpAdd
                | OpSubtract
                | OpMultiply
                | OpDivide
                | OpMod
                | OpPow
                | OpBiggest
                | OpSmallest
                | OpRandom
                | OpInterpolate
                | OpLimit
        )
    }

    pub fn is_color(self) -> bool {
        matches!(self, TokenKind::ClRgb | TokenKind::ClRgba | TokenKind::ClInterpolate)
    }

    pub fn is_conditional(self) -> bool {
        use TokenKind::*;
        matches!(self, IfLt | IfLe | IfGt | IfGe | IfEq | IfNe)
    }
}

lazy_static! {
    pub static ref TOKEN_TABLE: HashMap<&'static str, TokenKind> = {
        use TokenKind::*;
        let mut m = HashMap::new();
        m.insert("#", Comment);
        m.insert("\\", Escape);
        m.insert("LAZY", Filler);
        m.insert("JOIN", Join);
        m.insert("%", VarInjection);

        m.insert("LET", VarDeclaration);
        m.insert("LET_ENUM", EnumDeclaration);
        m.insert("VAR", VarAppend);
        m.insert("PREPEND", VarPrepend);
        m.insert("MERGE", VarMerge);
        m.insert("SECTION", SectionBegin);
        m.insert("SECTION_ADD", SectionAdd);
        m.insert("SECTION_DEL", SectionDel);
        m.insert("INCLUDE", Include);
        m.insert("FOR_EACH", ForBegin);
        m.insert("FOR_END", ForEnd);
        m.insert("SEED", Seed);
        m.insert("PRINT", Print);
        m.insert("RESTRICT", Restrict);

        m.insert("<", IfLt);
        m.insert("<=", IfLe);
        m.insert(">", IfGt);
        m.insert(">=", IfGe);
        m.insert("==", IfEq);
        m.insert("!=", IfNe);

        m.insert("TIMESTAMP", ConstTimestamp);
        m.insert("PI", ConstPi);
        m.insert("EULER", ConstEuler);
        m.insert("TRUE", ConstTrue);
        m.insert("FALSE", ConstFalse);

        m.insert("SQRT", OpSqrt);
        m.insert("CBRT", OpCbrt);
        m.insert("ABS", OpAbs);
        m.insert("CEIL", OpCeiling);
        m.insert("FLOOR", OpFloor);
        m.insert("ROUND", OpRound);
        m.insert("COS", OpCos);
        m.insert("SIN", OpSin);
        m.insert("TAN", OpTan);
        m.insert("ACOS", OpAcos);
        m.insert("ASIN", OpAsin);
        m.insert("ATAN", OpAtan);
        m.insert("COSH", OpCosh);
        m.insert("SINH", OpSinh);
        m.insert("LN", OpLn);
        m.insert("LOG", OpLog);

        m.insert("+", OpAdd);
        m.insert("-", OpSubtract);
        m.insert("*", OpMultiply);
        m.insert("/", OpDivide);
        m.insert("MOD", OpMod);
        m.insert("POW", OpPow);
        m.insert("MAX", OpBiggest);
        m.insert("MIN", OpSmallest);
        m.insert("RANDOM", OpRandom);

        m.insert("ITP", OpInterpolate);
        m.insert("LIMIT", OpLimit);

        m.insert("RGB", ClRgb);
        m.insert("RGBA", ClRgba);
        m.insert("CLITP", ClInterpolate);

        m
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_round_trips_every_statement_introducer() {
        assert_eq!(TOKEN_TABLE.get("LET"), Some(&TokenKind::VarDeclaration));
        assert_eq!(TOKEN_TABLE.get("FOR_EACH"), Some(&TokenKind::ForBegin));
        assert_eq!(TOKEN_TABLE.get("RESTRICT"), Some(&TokenKind::Restrict));
    }

    #[test]
    fn arity_matches_operator_family() {
        assert_eq!(TokenKind::ConstPi.arity(), 0);
        assert_eq!(TokenKind::OpSqrt.arity(), 1);
        assert_eq!(TokenKind::OpAdd.arity(), 2);
        assert_eq!(TokenKind::OpLimit.arity(), 3);
        assert_eq!(TokenKind::ClRgba.arity(), 4);
    }

    #[test]
    fn unknown_word_is_absent() {
        assert!(TOKEN_TABLE.get("not_a_keyword").is_none());
    }
}
