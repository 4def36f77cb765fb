use super::value::{MatchFlags, Needle, TypedValue};

/// `range(lower, upper, bound_flags)`'s bound combinator.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RangeBounds {
    GtLt,
    GeLt,
    GtLe,
    GeLe,
}

fn eq_at(width: MatchFlags, a: &TypedValue, b: &TypedValue) -> bool {
    match width {
        MatchFlags::I8 => a.as_u8() == b.as_u8(),
        MatchFlags::I16 => a.as_u16() == b.as_u16(),
        MatchFlags::I32 => a.as_u32() == b.as_u32(),
        MatchFlags::F32 => a.as_f32() == b.as_f32(),
        MatchFlags::I64 => a.as_u64() == b.as_u64(),
        MatchFlags::F64 => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

/// Ordered comparison at `width`. For integer widths, both the signed and
/// unsigned interpretations of the stored bytes are probed with OR
/// semantics: the caller typed an ASCII number without specifying
/// signedness, so a match must fire when any consistent interpretation
/// satisfies the relation.
fn ordered_at(width: MatchFlags, a: &TypedValue, b: &TypedValue, op: fn(i128, i128) -> bool) -> bool {
    match width {
        MatchFlags::I8 => {
            op(a.as_u8() as i128, b.as_u8() as i128) || op(a.as_i8() as i128, b.as_i8() as i128)
        }
        MatchFlags::I16 => {
            op(a.as_u16() as i128, b.as_u16() as i128)
                || op(a.as_i16() as i128, b.as_i16() as i128)
        }
        MatchFlags::I32 => {
            op(a.as_u32() as i128, b.as_u32() as i128)
                || op(a.as_i32() as i128, b.as_i32() as i128)
        }
        MatchFlags::I64 => {
            op(a.as_u64() as i128, b.as_u64() as i128)
                || op(a.as_i64() as i128, b.as_i64() as i128)
        }
        MatchFlags::F32 => (a.as_f32() as f64)
            .partial_cmp(&(b.as_f32() as f64))
            .map(|o| op(ordering_as_i128(o), 0))
            .unwrap_or(false),
        MatchFlags::F64 => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .map(|o| op(ordering_as_i128(o), 0))
            .unwrap_or(false),
        _ => false,
    }
}

fn ordering_as_i128(o: std::cmp::Ordering) -> i128 {
    match o {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }
}

fn lt_op(a: i128, b: i128) -> bool {
    a < b
}
fn le_op(a: i128, b: i128) -> bool {
    a <= b
}
fn gt_op(a: i128, b: i128) -> bool {
    a > b
}
fn ge_op(a: i128, b: i128) -> bool {
    a >= b
}

/// Compares `new` against `needle` at the needle's largest active width.
pub fn match_eq(needle: &Needle, new: &TypedValue) -> bool {
    match needle.value.largest_flag() {
        Some(w) => eq_at(w, &needle.value, new),
        None => false,
    }
}

pub fn match_ne(needle: &Needle, new: &TypedValue) -> bool {
    !match_eq(needle, new)
}

pub fn match_lt(needle: &Needle, new: &TypedValue) -> bool {
    width_cmp(needle, new, lt_op)
}

pub fn match_le(needle: &Needle, new: &TypedValue) -> bool {
    width_cmp(needle, new, le_op)
}

pub fn match_gt(needle: &Needle, new: &TypedValue) -> bool {
    width_cmp(needle, new, gt_op)
}

pub fn match_ge(needle: &Needle, new: &TypedValue) -> bool {
    width_cmp(needle, new, ge_op)
}

fn width_cmp(needle: &Needle, new: &TypedValue, op: fn(i128, i128) -> bool) -> bool {
    match needle.value.largest_flag() {
        // ordered_at(width, a, b) checks `op(a, b)`; here a = needle value,
        // b = newly read value, matching "needle OP new" (e.g. lt means
        // needle < new).
        Some(w) => ordered_at(w, &needle.value, new, op),
        None => false,
    }
}

pub fn match_range(lower: &Needle, upper: &Needle, new: &TypedValue, bounds: RangeBounds) -> bool {
    let lower_ok = match bounds {
        RangeBounds::GtLt | RangeBounds::GtLe => match_lt(lower, new),
        RangeBounds::GeLt | RangeBounds::GeLe => match_le(lower, new),
    };
    let upper_ok = match bounds {
        RangeBounds::GtLt | RangeBounds::GeLt => match_gt(upper, new),
        RangeBounds::GtLe | RangeBounds::GeLe => match_ge(upper, new),
    };
    lower_ok && upper_ok
}

/// Compares `orig` and `new` at the largest type flag set in `orig`.
pub fn match_changed(orig: &TypedValue, new: &TypedValue) -> bool {
    match orig.largest_flag() {
        Some(w) => !eq_at(w, orig, new),
        None => false,
    }
}

pub fn match_unchanged(orig: &TypedValue, new: &TypedValue) -> bool {
    !match_changed(orig, new)
}

/// Scans all flags set in `orig` from smallest to largest; holds if any
/// interpretation strictly decreased (resp. increased). `orig`'s flag set
/// encodes "all ways this cell could be typed", so a value whose u8 view
/// decreased is a legitimate "decreased by one step" even if its u64 view
/// wrapped.
pub fn match_decreased(orig: &TypedValue, new: &TypedValue) -> bool {
    orig.ascending_flags()
        .into_iter()
        .any(|w| ordered_at(w, new, orig, lt_op))
}

pub fn match_increased(orig: &TypedValue, new: &TypedValue) -> bool {
    orig.ascending_flags()
        .into_iter()
        .any(|w| ordered_at(w, new, orig, gt_op))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn val_i32(v: i32) -> TypedValue {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&v.to_ne_bytes());
        TypedValue::from_bytes(bytes, MatchFlags::I8 | MatchFlags::I16 | MatchFlags::I32)
    }

    #[test]
    fn eq_and_ne_are_complementary() {
        let needle = Needle::parse("1234").unwrap();
        let hit = val_i32(1234);
        let miss = val_i32(1235);
        assert!(match_eq(&needle, &hit));
        assert!(!match_eq(&needle, &miss));
        assert!(match_ne(&needle, &miss));
        assert!(!match_ne(&needle, &hit));
    }

    #[test]
    fn range_ge_le_is_inclusive() {
        let lower = Needle::parse("1").unwrap();
        let upper = Needle::parse("100").unwrap();
        assert!(match_range(&lower, &upper, &val_i32(100), RangeBounds::GeLe));
        assert!(!match_range(&lower, &upper, &val_i32(100), RangeBounds::GtLt));
    }

    #[test]
    fn changed_and_unchanged_use_largest_orig_flag() {
        let orig = val_i32(50);
        let same = val_i32(50);
        let different = val_i32(100);
        assert!(match_unchanged(&orig, &same));
        assert!(match_changed(&orig, &different));
    }

    #[test]
    fn changed_and_unchanged_handle_a_fresh_read_with_combined_width_flags() {
        // A real read via `flags_for_width(8)` sets I64 and F64 together,
        // the case that used to fall through eq_at's match to `_ => false`.
        use super::super::value::flags_for_width;

        let mut same_bytes = [0u8; 8];
        same_bytes[0..4].copy_from_slice(&123i32.to_ne_bytes());
        let orig = TypedValue::from_bytes(same_bytes, flags_for_width(8));
        let same = TypedValue::from_bytes(same_bytes, flags_for_width(8));

        let mut different_bytes = [0u8; 8];
        different_bytes[0..4].copy_from_slice(&456i32.to_ne_bytes());
        let different = TypedValue::from_bytes(different_bytes, flags_for_width(8));

        assert!(match_unchanged(&orig, &same));
        assert!(!match_unchanged(&orig, &different));
        assert!(match_changed(&orig, &different));
        assert!(!match_changed(&orig, &same));
    }

    #[test]
    fn decreased_fires_if_any_width_view_decreased() {
        // u8 view of 255 -> 0 wraps upward, but the i8 view of 255 (as -1)
        // to 0 increased; meanwhile a genuine byte-level decrease at a
        // different width should still register as decreased.
        let mut orig_bytes = [0u8; 8];
        orig_bytes[0] = 10;
        let orig = TypedValue::from_bytes(orig_bytes, MatchFlags::I8);

        let mut new_bytes = [0u8; 8];
        new_bytes[0] = 5;
        let new = TypedValue::from_bytes(new_bytes, MatchFlags::I8);

        assert!(match_decreased(&orig, &new));
        assert!(!match_increased(&orig, &new));
    }
}
