use bitflags::bitflags;

use crate::error::{EngineError, EngineResult};

bitflags! {
    /// Which numeric interpretations of an 8-byte cell are plausible.
    ///
    /// A needle sets the subset of these that losslessly represent the
    /// parsed value; a value freshly read from memory sets the subset its
    /// read window was wide enough to fill. `INEQ_FORWARD`/`INEQ_REVERSE`
    /// are reserved for ordered-chain heuristics and are not produced by
    /// anything in this crate yet.
    pub struct MatchFlags: u16 {
        const I8           = 0b0000_0001;
        const I16          = 0b0000_0010;
        const I32          = 0b0000_0100;
        const I64          = 0b0000_1000;
        const F32          = 0b0001_0000;
        const F64          = 0b0010_0000;
        const INEQ_FORWARD = 0b0100_0000;
        const INEQ_REVERSE = 0b1000_0000;
    }
}

/// An 8-byte cell viewable under any of the widths its flags admit.
#[derive(Copy, Clone, Debug)]
pub struct TypedValue {
    bytes: [u8; 8],
    pub flags: MatchFlags,
}

impl TypedValue {
    pub fn zeroed() -> TypedValue {
        TypedValue {
            bytes: [0; 8],
            flags: MatchFlags::empty(),
        }
    }

    pub fn from_bytes(bytes: [u8; 8], flags: MatchFlags) -> TypedValue {
        TypedValue { bytes, flags }
    }

    pub fn bytes(&self) -> [u8; 8] {
        self.bytes
    }

    pub fn as_u8(&self) -> u8 {
        self.bytes[0]
    }
    pub fn as_i8(&self) -> i8 {
        self.bytes[0] as i8
    }
    pub fn as_u16(&self) -> u16 {
        u16::from_ne_bytes([self.bytes[0], self.bytes[1]])
    }
    pub fn as_i16(&self) -> i16 {
        self.as_u16() as i16
    }
    pub fn as_u32(&self) -> u32 {
        u32::from_ne_bytes(self.bytes[0..4].try_into().unwrap())
    }
    pub fn as_i32(&self) -> i32 {
        self.as_u32() as i32
    }
    pub fn as_u64(&self) -> u64 {
        u64::from_ne_bytes(self.bytes)
    }
    pub fn as_i64(&self) -> i64 {
        self.as_u64() as i64
    }
    pub fn as_f32(&self) -> f32 {
        f32::from_ne_bytes(self.bytes[0..4].try_into().unwrap())
    }
    pub fn as_f64(&self) -> f64 {
        f64::from_ne_bytes(self.bytes)
    }

    /// The largest active width, per the ≻ ordering `i64|f64 ≻ i32|f32 ≻
    /// i16 ≻ i8`. Within a tier that has both an integer and a float flag
    /// set, the integer accessor is preferred; a single `MatchFlags` value
    /// is always returned, never a combined bitset, so `eq_at`/`ordered_at`
    /// can dispatch on it directly. `None` if no flag is set at all.
    pub fn largest_flag(&self) -> Option<MatchFlags> {
        if self.flags.contains(MatchFlags::I64) {
            Some(MatchFlags::I64)
        } else if self.flags.contains(MatchFlags::F64) {
            Some(MatchFlags::F64)
        } else if self.flags.contains(MatchFlags::I32) {
            Some(MatchFlags::I32)
        } else if self.flags.contains(MatchFlags::F32) {
            Some(MatchFlags::F32)
        } else if self.flags.contains(MatchFlags::I16) {
            Some(MatchFlags::I16)
        } else if self.flags.contains(MatchFlags::I8) {
            Some(MatchFlags::I8)
        } else {
            None
        }
    }

    /// All active width flags, ordered smallest to largest; used by the
    /// `increased`/`decreased` predicates, which OR across every
    /// interpretation rather than picking just the largest.
    pub fn ascending_flags(&self) -> Vec<MatchFlags> {
        let mut out = Vec::new();
        if self.flags.contains(MatchFlags::I8) {
            out.push(MatchFlags::I8);
        }
        if self.flags.contains(MatchFlags::I16) {
            out.push(MatchFlags::I16);
        }
        if self.flags.contains(MatchFlags::I32) {
            out.push(MatchFlags::I32);
        }
        if self.flags.contains(MatchFlags::F32) {
            out.push(MatchFlags::F32);
        }
        if self.flags.contains(MatchFlags::I64) {
            out.push(MatchFlags::I64);
        }
        if self.flags.contains(MatchFlags::F64) {
            out.push(MatchFlags::F64);
        }
        out
    }
}

/// Which widths a read window of `available` bytes can fit. Used both for
/// a fresh read during search and a re-read during filtering: flags always
/// reflect window width here, never the value itself (narrowing a needle's
/// flags by the value it actually holds only happens in [`Needle::parse`]).
pub fn flags_for_width(available: usize) -> MatchFlags {
    let available = if available == 0 { 8 } else { available };
    let mut flags = MatchFlags::empty();
    if available >= 1 {
        flags |= MatchFlags::I8;
    }
    if available >= 2 {
        flags |= MatchFlags::I16;
    }
    if available >= 4 {
        flags |= MatchFlags::I32 | MatchFlags::F32;
    }
    if available >= 8 {
        flags |= MatchFlags::I64 | MatchFlags::F64;
    }
    flags
}

/// A `MatchObject`: a `(addr, value, flags)` triple produced by a search or
/// carried through the match store.
#[derive(Copy, Clone, Debug)]
pub struct MatchObject {
    pub addr: u64,
    pub value: TypedValue,
}

impl MatchObject {
    pub fn new(addr: u64, value: TypedValue) -> MatchObject {
        MatchObject { addr, value }
    }
}

/// A parsed user value: an integer or a double, with the flag set
/// describing which numeric widths fit it losslessly. Byte-array and
/// string needles are reserved for future work.
#[derive(Copy, Clone, Debug)]
pub struct Needle {
    pub value: TypedValue,
}

impl Needle {
    /// Parses an ASCII value the way `strtoull`/`strtod` would: integer
    /// first (auto-base: `0x`/`0X` selects base 16, a leading `0` selects
    /// base 8, otherwise base 10), falling back to a float parse.
    pub fn parse(s: &str) -> EngineResult<Needle> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidNeedle);
        }

        if let Some(value) = parse_integer(trimmed) {
            return Ok(Needle { value });
        }

        if let Some(value) = parse_float(trimmed) {
            return Ok(Needle { value });
        }

        Err(EngineError::InvalidNeedle)
    }
}

fn parse_integer(s: &str) -> Option<TypedValue> {
    let (sign, unsigned_part) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };

    let (radix, digits) = if let Some(rest) = unsigned_part
        .strip_prefix("0x")
        .or_else(|| unsigned_part.strip_prefix("0X"))
    {
        (16, rest)
    } else if unsigned_part.len() > 1 && unsigned_part.starts_with('0') {
        (8, &unsigned_part[1..])
    } else {
        (10, unsigned_part)
    };

    if digits.is_empty() {
        return None;
    }

    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    let signed = if sign < 0 {
        // Two's-complement negation; wrapping is intentional since the
        // caller may legitimately type e.g. "-1" meaning all-bits-set.
        (magnitude as i64).wrapping_neg()
    } else {
        magnitude as i64
    };

    let bytes = (signed as u64).to_ne_bytes();

    let mut flags = MatchFlags::I64;
    if signed >= i32::MIN as i64 && signed <= i32::MAX as i64 {
        flags |= MatchFlags::I32;
    }
    if signed >= i16::MIN as i64 && signed <= i16::MAX as i64 {
        flags |= MatchFlags::I16;
    }
    if signed >= i8::MIN as i64 && signed <= i8::MAX as i64 {
        flags |= MatchFlags::I8;
    }

    Some(TypedValue::from_bytes(bytes, flags))
}

/// True if `s`'s significant digits (sign, decimal point and exponent
/// stripped) hold anything but zeroes — i.e. the literal value isn't zero,
/// regardless of what magnitude its exponent asks for.
fn mantissa_is_nonzero(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').or_else(|| s.strip_prefix('+')).unwrap_or(s);
    let mantissa = match unsigned.find(|c| c == 'e' || c == 'E') {
        Some(pos) => &unsigned[..pos],
        None => unsigned,
    };
    mantissa.bytes().any(|b| b != b'0' && b != b'.')
}

fn parse_float(s: &str) -> Option<TypedValue> {
    let as_f64: f64 = s.parse().ok()?;
    if as_f64.is_nan() {
        return None;
    }

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&as_f64.to_ne_bytes());

    let mut flags = MatchFlags::F64;
    if let Ok(as_f32) = s.parse::<f32>() {
        // `str::parse` has no ERANGE signal: a magnitude too small for f32
        // silently rounds to 0.0 instead of failing, so a genuine nonzero
        // needle would otherwise be misreported as exactly representable in
        // f32. Treat a zero result as underflow unless the source digits
        // were themselves zero.
        let underflowed = as_f32 == 0.0 && mantissa_is_nonzero(s);
        if as_f32.is_finite() && !underflowed {
            flags |= MatchFlags::F32;
            // Store the f64 representation regardless; predicate evaluation
            // always reads through the flag-selected accessor, and f32
            // comparisons read the low 4 bytes via `as_f32`, so the f32
            // view below must independently hold the narrowed value.
            bytes[0..4].copy_from_slice(&as_f32.to_ne_bytes());
            bytes[4..8].copy_from_slice(&as_f32.to_ne_bytes());
        }
    }

    Some(TypedValue::from_bytes(bytes, flags))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer() {
        let n = Needle::parse("42").unwrap();
        assert_eq!(n.value.as_i64(), 42);
        assert!(n.value.flags.contains(MatchFlags::I8));
        assert!(n.value.flags.contains(MatchFlags::I16));
        assert!(n.value.flags.contains(MatchFlags::I32));
        assert!(n.value.flags.contains(MatchFlags::I64));
    }

    #[test]
    fn parses_negative_one_as_all_bits_set() {
        let n = Needle::parse("-1").unwrap();
        assert_eq!(n.value.as_u64(), u64::MAX);
        assert!(n.value.flags.contains(MatchFlags::I8));
    }

    #[test]
    fn two_fifty_six_clears_i8() {
        let n = Needle::parse("256").unwrap();
        assert!(!n.value.flags.contains(MatchFlags::I8));
        assert!(n.value.flags.contains(MatchFlags::I16));
    }

    #[test]
    fn parses_hex_with_prefix() {
        let n = Needle::parse("0x2A").unwrap();
        assert_eq!(n.value.as_i64(), 42);
    }

    #[test]
    fn parses_float() {
        let n = Needle::parse("3.14").unwrap();
        assert!(n.value.flags.contains(MatchFlags::F32));
        assert!(n.value.flags.contains(MatchFlags::F64));
        assert!((n.value.as_f64() - 3.14).abs() < 1e-9);
    }

    #[test]
    fn huge_exponent_is_f64_only() {
        let n = Needle::parse("1e-400").unwrap();
        assert!(!n.value.flags.contains(MatchFlags::F32));
        assert!(n.value.flags.contains(MatchFlags::F64));
    }

    #[test]
    fn literal_zero_still_sets_f32() {
        // Unlike `1e-400`, a literal zero is exactly representable in f32;
        // the underflow guard must not treat it as underflow too.
        let n = Needle::parse("0.0").unwrap();
        assert!(n.value.flags.contains(MatchFlags::F32));
        assert!(n.value.flags.contains(MatchFlags::F64));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(Needle::parse("not-a-number").is_err());
    }

    #[test]
    fn flags_for_width_gates_on_available_bytes() {
        assert_eq!(flags_for_width(1), MatchFlags::I8);
        assert_eq!(flags_for_width(3), MatchFlags::I8 | MatchFlags::I16);
        assert_eq!(
            flags_for_width(4),
            MatchFlags::I8 | MatchFlags::I16 | MatchFlags::I32 | MatchFlags::F32
        );
        assert_eq!(flags_for_width(0), flags_for_width(8));
    }
}
