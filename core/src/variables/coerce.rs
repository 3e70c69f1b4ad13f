//! Coercion table
//!
//! Each function converts a stored value into one requested type, returning
//! `None` when the pair is not in the table. The table is deliberately
//! narrow: numeric strings never become numbers and maps never become lists.
//!
//! | Target     | Accepted sources                                   |
//! |------------|----------------------------------------------------|
//! | String     | Str, Uuid                                          |
//! | Number     | Num, Int, Long                                     |
//! | Boolean    | Bool, Str `"true"`/`"false"` (case-insensitive)    |
//! | Int        | Int, Long in range, whole Num in range             |
//! | Long       | Long, Int, whole Num in range                      |
//! | UUID       | Uuid, Str parsing as a UUID                        |
//! | Collection | List, Set                                          |
//! | Map        | Map                                                |
//! | List       | List                                               |

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::values::Val;

pub fn to_string(val: &Val) -> Option<String> {
    match val {
        Val::Str(s) => Some(s.clone()),
        Val::Uuid(u) => Some(u.to_string()),
        _ => None,
    }
}

pub fn to_number(val: &Val) -> Option<f64> {
    match val {
        Val::Num(_) | Val::Int(_) | Val::Long(_) => val.as_f64(),
        _ => None,
    }
}

pub fn to_boolean(val: &Val) -> Option<bool> {
    match val {
        Val::Bool(b) => Some(*b),
        Val::Str(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Val::Str(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

pub fn to_int(val: &Val) -> Option<i32> {
    match val {
        Val::Int(i) => Some(*i),
        Val::Long(l) => i32::try_from(*l).ok(),
        Val::Num(n) if is_whole(*n) && *n >= i32::MIN as f64 && *n <= i32::MAX as f64 => {
            Some(*n as i32)
        }
        _ => None,
    }
}

pub fn to_long(val: &Val) -> Option<i64> {
    match val {
        Val::Long(l) => Some(*l),
        Val::Int(i) => Some(i64::from(*i)),
        // i64::MAX is not representable as f64; 2^63 itself is out of range
        Val::Num(n) if is_whole(*n) && *n >= i64::MIN as f64 && *n < i64::MAX as f64 => {
            Some(*n as i64)
        }
        _ => None,
    }
}

pub fn to_uuid(val: &Val) -> Option<Uuid> {
    match val {
        Val::Uuid(u) => Some(*u),
        Val::Str(s) => Uuid::parse_str(s).ok(),
        _ => None,
    }
}

pub fn to_collection(val: &Val) -> Option<Vec<Val>> {
    match val {
        Val::List(items) | Val::Set(items) => Some(items.clone()),
        _ => None,
    }
}

pub fn to_map(val: &Val) -> Option<BTreeMap<String, Val>> {
    match val {
        Val::Map(map) => Some(map.clone()),
        _ => None,
    }
}

pub fn to_list(val: &Val) -> Option<Vec<Val>> {
    match val {
        Val::List(items) => Some(items.clone()),
        _ => None,
    }
}

fn is_whole(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}
