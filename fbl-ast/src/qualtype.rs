use std::{fmt::Display, str::FromStr};

use ustr::Ustr;

use crate::{error::Error, sanitize_name};
type Result<T, E = Error> = std::result::Result<T, E>;

/// The C++ fundamental types we know how to spell
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BuiltinKind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    SizeT,
}

impl BuiltinKind {
    pub fn spelling(&self) -> &'static str {
        use BuiltinKind::*;
        match self {
            Void => "void",
            Bool => "bool",
            Char => "char",
            SChar => "signed char",
            UChar => "unsigned char",
            Short => "short",
            UShort => "unsigned short",
            Int => "int",
            UInt => "unsigned int",
            Long => "long",
            ULong => "unsigned long",
            LongLong => "long long",
            ULongLong => "unsigned long long",
            Float => "float",
            Double => "double",
            LongDouble => "long double",
            SizeT => "size_t",
        }
    }

    pub fn all() -> &'static [BuiltinKind] {
        use BuiltinKind::*;
        &[
            Void, Bool, Char, SChar, UChar, Short, UShort, Int, UInt, Long, ULong, LongLong, ULongLong, Float,
            Double, LongDouble, SizeT,
        ]
    }

    /// Build a builtin from the words making up its spelling, e.g. `["unsigned", "long", "long"]`
    fn from_words(words: &[&str]) -> Option<BuiltinKind> {
        let mut unsigned = false;
        let mut signed = false;
        let mut longs = 0;
        let mut short = false;
        let mut int = false;
        let mut base = None;

        for w in words {
            match *w {
                "unsigned" => unsigned = true,
                "signed" => signed = true,
                "long" => longs += 1,
                "short" => short = true,
                "int" if int => return None,
                "int" => int = true,
                "void" | "bool" | "char" | "float" | "double" | "size_t" | "std::size_t" => {
                    if base.is_some() {
                        return None;
                    }
                    base = Some(*w);
                }
                _ => return None,
            }
        }

        use BuiltinKind::*;
        let kind = match base {
            Some("void") => Void,
            Some("bool") => Bool,
            Some("float") => Float,
            Some("double") if longs == 1 => LongDouble,
            Some("double") => Double,
            Some("size_t") | Some("std::size_t") => SizeT,
            Some("char") if unsigned => UChar,
            Some("char") if signed => SChar,
            Some("char") => Char,
            Some(_) => return None,
            None if short && unsigned => UShort,
            None if short => Short,
            None if longs >= 2 && unsigned => ULongLong,
            None if longs >= 2 => LongLong,
            None if longs == 1 && unsigned => ULong,
            None if longs == 1 => Long,
            None if unsigned => UInt,
            None if int || signed => Int,
            None => return None,
        };

        Some(kind)
    }
}

impl Display for BuiltinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.spelling())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Builtin(BuiltinKind),
    /// A named type: a class, an enum or a typedef, looked up by qualified name in the [`AST`](crate::ast::AST)
    Ref(Ustr),
    /// A name spelled with the `enum` keyword. It is an enum whether or not the AST declares it.
    Enum(Ustr),
    Pointer(Box<QualType>),
    LValueReference(Box<QualType>),
    RValueReference(Box<QualType>),
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QualType {
    pub is_const: bool,
    pub type_ref: TypeRef,
}

impl std::fmt::Debug for QualType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Formats the canonical signature used as the typemap lookup key, e.g. `const Foo &`, `double *`
impl Display for QualType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.type_ref {
            TypeRef::Builtin(tk) => {
                write!(f, "{}{tk}", if self.is_const { "const " } else { "" })
            }
            TypeRef::Ref(name) => {
                write!(f, "{}{name}", if self.is_const { "const " } else { "" })
            }
            TypeRef::Enum(name) => {
                write!(f, "{}enum {name}", if self.is_const { "const " } else { "" })
            }
            TypeRef::Pointer(pointee) => {
                write!(f, "{pointee} *{}", if self.is_const { "const" } else { "" })
            }
            TypeRef::LValueReference(pointee) => write!(f, "{pointee} &"),
            TypeRef::RValueReference(pointee) => write!(f, "{pointee} &&"),
        }
    }
}

impl QualType {
    pub fn builtin(kind: BuiltinKind) -> QualType {
        QualType {
            is_const: false,
            type_ref: TypeRef::Builtin(kind),
        }
    }

    pub fn void() -> QualType {
        QualType::builtin(BuiltinKind::Void)
    }

    pub fn int() -> QualType {
        QualType::builtin(BuiltinKind::Int)
    }

    pub fn named(name: &str) -> QualType {
        QualType {
            is_const: false,
            type_ref: TypeRef::Ref(name.into()),
        }
    }

    pub fn pointer(pointee: QualType) -> QualType {
        QualType {
            is_const: false,
            type_ref: TypeRef::Pointer(Box::new(pointee)),
        }
    }

    pub fn lvalue_reference(pointee: QualType) -> QualType {
        QualType {
            is_const: false,
            type_ref: TypeRef::LValueReference(Box::new(pointee)),
        }
    }

    pub fn with_const(mut self, is_const: bool) -> QualType {
        self.is_const = is_const;
        self
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn is_void(&self) -> bool {
        matches!(self.type_ref, TypeRef::Builtin(BuiltinKind::Void))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.type_ref, TypeRef::Pointer(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self.type_ref,
            TypeRef::LValueReference(_) | TypeRef::RValueReference(_)
        )
    }

    /// The pointee of a pointer or reference
    pub fn pointee(&self) -> Option<&QualType> {
        match &self.type_ref {
            TypeRef::Pointer(p) | TypeRef::LValueReference(p) | TypeRef::RValueReference(p) => Some(p),
            _ => None,
        }
    }

    /// The innermost type with all pointers and references peeled off (qualifiers are kept)
    pub fn base(&self) -> &QualType {
        match self.pointee() {
            Some(p) => p.base(),
            None => self,
        }
    }

    /// Name of the innermost named type, if it is neither a builtin nor spelled with `enum`
    pub fn base_name(&self) -> Option<Ustr> {
        match self.base().type_ref {
            TypeRef::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// Copy of this type with the top-level `const` removed
    pub fn strip_qualifiers(&self) -> QualType {
        QualType {
            is_const: false,
            type_ref: self.type_ref.clone(),
        }
    }

    /// Copy of this type with all qualifiers, pointers and references removed
    pub fn strip_all(&self) -> QualType {
        self.base().strip_qualifiers()
    }

    /// Rebuild this type with its innermost type replaced by `new_base`, keeping the pointer/reference shape and the
    /// `const`ness of every level. The `const` of `new_base` itself is or'ed with the base it replaces.
    pub fn replace_base(&self, new_base: &QualType) -> QualType {
        match &self.type_ref {
            TypeRef::Pointer(p) => QualType {
                is_const: self.is_const,
                type_ref: TypeRef::Pointer(Box::new(p.replace_base(new_base))),
            },
            TypeRef::LValueReference(p) => QualType {
                is_const: self.is_const,
                type_ref: TypeRef::LValueReference(Box::new(p.replace_base(new_base))),
            },
            TypeRef::RValueReference(p) => QualType {
                is_const: self.is_const,
                type_ref: TypeRef::RValueReference(Box::new(p.replace_base(new_base))),
            },
            _ => QualType {
                is_const: self.is_const || new_base.is_const,
                type_ref: new_base.type_ref.clone(),
            },
        }
    }

    /// Structural mangling used to build placeholder names, e.g. `const Foo &` -> `r_q_const__Foo`
    pub fn mangle(&self) -> String {
        let inner = match &self.type_ref {
            TypeRef::Builtin(tk) => sanitize_name(tk.spelling()),
            TypeRef::Ref(name) => sanitize_name(name),
            TypeRef::Enum(name) => format!("enum_{}", sanitize_name(name)),
            TypeRef::Pointer(p) => format!("p_{}", p.mangle()),
            TypeRef::LValueReference(p) => format!("r_{}", p.mangle()),
            TypeRef::RValueReference(p) => format!("rr_{}", p.mangle()),
        };

        if self.is_const {
            format!("q_const__{inner}")
        } else {
            inner
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Star,
    Amp,
    AmpAmp,
}

fn tokenize(spelling: &str) -> Result<Vec<Token<'_>>> {
    let bytes = spelling.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c == b'*' {
            tokens.push(Token::Star);
            i += 1;
        } else if c == b'&' {
            if bytes.get(i + 1) == Some(&b'&') {
                tokens.push(Token::AmpAmp);
                i += 2;
            } else {
                tokens.push(Token::Amp);
                i += 1;
            }
        } else if c.is_ascii_alphanumeric() || c == b'_' || c == b':' {
            let start = i;
            let mut depth = 0;
            while i < bytes.len() {
                let c = bytes[i];
                if c == b'<' {
                    depth += 1;
                } else if c == b'>' {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                } else if depth == 0 && !(c.is_ascii_alphanumeric() || c == b'_' || c == b':') {
                    break;
                }
                i += 1;
            }
            if depth != 0 {
                return Err(Error::FailedToParseType {
                    spelling: spelling.to_string(),
                    reason: "unbalanced template brackets".to_string(),
                });
            }
            tokens.push(Token::Word(&spelling[start..i]));
        } else {
            return Err(Error::FailedToParseType {
                spelling: spelling.to_string(),
                reason: format!("unexpected character '{}'", c as char),
            });
        }
    }

    Ok(tokens)
}

impl FromStr for QualType {
    type Err = Error;

    /// Parse a C++ type spelling such as `const std::vector<double> &` or `unsigned long long *const`
    fn from_str(spelling: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(spelling)?;
        let fail = |reason: &str| Error::FailedToParseType {
            spelling: spelling.to_string(),
            reason: reason.to_string(),
        };

        let mut is_const = false;
        let mut is_enum = false;
        let mut words = Vec::new();
        let mut rest = tokens.len();
        for (i, tok) in tokens.iter().enumerate() {
            match tok {
                Token::Word("const") => is_const = true,
                Token::Word("enum") => is_enum = true,
                Token::Word("volatile") | Token::Word("struct") | Token::Word("class") => {}
                Token::Word(w) => words.push(*w),
                _ => {
                    rest = i;
                    break;
                }
            }
        }

        let base_ref = if words.is_empty() {
            return Err(fail("no base type"));
        } else if is_enum {
            match words.as_slice() {
                [name] => TypeRef::Enum((*name).into()),
                _ => return Err(fail("expected a single name after \"enum\"")),
            }
        } else if let Some(kind) = BuiltinKind::from_words(&words) {
            TypeRef::Builtin(kind)
        } else if words.len() == 1 {
            TypeRef::Ref(words[0].into())
        } else {
            return Err(fail("could not make sense of the base type"));
        };

        let mut current = QualType {
            is_const,
            type_ref: base_ref,
        };

        for tok in &tokens[rest..] {
            current = match tok {
                Token::Star => QualType::pointer(current),
                Token::Amp => QualType::lvalue_reference(current),
                Token::AmpAmp => QualType {
                    is_const: false,
                    type_ref: TypeRef::RValueReference(Box::new(current)),
                },
                Token::Word("const") if current.is_pointer() => current.with_const(true),
                Token::Word("const") | Token::Word("volatile") => current,
                Token::Word(_) => return Err(fail("unexpected name after declarator")),
            };
        }

        Ok(current)
    }
}

impl TryFrom<String> for QualType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualType> for String {
    fn from(qt: QualType) -> Self {
        qt.to_string()
    }
}

impl serde::Serialize for QualType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for QualType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_builtins() -> Result<(), Error> {
        assert_eq!("int".parse::<QualType>()?, QualType::int());
        assert_eq!(
            "unsigned long long".parse::<QualType>()?,
            QualType::builtin(BuiltinKind::ULongLong)
        );
        assert_eq!("long double".parse::<QualType>()?, QualType::builtin(BuiltinKind::LongDouble));
        assert_eq!("unsigned".parse::<QualType>()?, QualType::builtin(BuiltinKind::UInt));
        assert_eq!("std::size_t".parse::<QualType>()?, QualType::builtin(BuiltinKind::SizeT));
        Ok(())
    }

    #[test]
    fn parse_declarators() -> Result<(), Error> {
        let qt: QualType = "const SimpleClass&".parse()?;
        assert_eq!(qt, QualType::lvalue_reference(QualType::named("SimpleClass").with_const(true)));
        assert_eq!(qt.to_string(), "const SimpleClass &");

        let qt: QualType = "double const * const".parse()?;
        assert!(qt.is_const);
        assert_eq!(qt.to_string(), "const double *const");

        let qt: QualType = "std::pair<const double*, size_t>".parse()?;
        assert_eq!(qt.base_name().as_deref(), Some("std::pair<const double*, size_t>"));

        assert!("int int".parse::<QualType>().is_err());
        assert!("* int".parse::<QualType>().is_err());
        Ok(())
    }

    #[test]
    fn replace_base_keeps_shape() -> Result<(), Error> {
        let qt: QualType = "const Foo *&".parse()?;
        let generic = qt.replace_base(&QualType::named("SWIGTYPE"));
        assert_eq!(generic.to_string(), "const SWIGTYPE * &");

        let td: QualType = "const storage_type &".parse()?;
        assert_eq!(td.replace_base(&QualType::int()).to_string(), "const int &");
        Ok(())
    }

    #[test]
    fn enum_keyword_is_kept() -> Result<(), Error> {
        let qt: QualType = "const enum Color &".parse()?;
        assert_eq!(
            qt,
            QualType::lvalue_reference(QualType {
                is_const: true,
                type_ref: TypeRef::Enum("Color".into()),
            })
        );
        assert_eq!(qt.to_string(), "const enum Color &");
        assert_eq!(qt.to_string().parse::<QualType>()?, qt);
        assert_eq!(qt.mangle(), "r_q_const__enum_Color");
        assert!(qt.base_name().is_none());
        assert!("enum unsigned int".parse::<QualType>().is_err());
        Ok(())
    }

    #[test]
    fn mangle_is_structural() -> Result<(), Error> {
        assert_eq!("double *".parse::<QualType>()?.mangle(), "p_double");
        assert_eq!("const ns::Foo &".parse::<QualType>()?.mangle(), "r_q_const__ns_Foo");
        assert_eq!("unsigned int **".parse::<QualType>()?.mangle(), "p_p_unsigned_int");
        Ok(())
    }
}
