use crate::error::JvmError;
use smallvec::SmallVec;

/// How a parameter occupies local-variable slots when marshalled into a
/// callee frame: one slot, or two for `J`/`D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Single,
    Wide,
}

pub type ParamKinds = SmallVec<[ParamKind; 8]>;

fn malformed(desc: &str) -> JvmError {
    JvmError::ClassFormat(format!("malformed method descriptor: {}", desc))
}

/// Scans the parameter list between `(` and `)`. Array markers `[` are
/// skipped, `L...;` counts once, every primitive counts once; wideness is
/// recorded for `J` and `D`. The receiver is never part of a descriptor
/// and must be accounted for by the caller, exactly once.
pub fn parse_params(desc: &str) -> Result<ParamKinds, JvmError> {
    let mut kinds = ParamKinds::new();
    let mut chars = desc.chars();

    if chars.next() != Some('(') {
        return Err(malformed(desc));
    }

    loop {
        let mut c = chars.next().ok_or_else(|| malformed(desc))?;
        if c == ')' {
            break;
        }
        while c == '[' {
            c = chars.next().ok_or_else(|| malformed(desc))?;
        }
        match c {
            'L' => {
                loop {
                    match chars.next() {
                        Some(';') => break,
                        Some(_) => {}
                        None => return Err(malformed(desc)),
                    }
                }
                kinds.push(ParamKind::Single);
            }
            'J' | 'D' => kinds.push(ParamKind::Wide),
            'B' | 'C' | 'F' | 'I' | 'S' | 'Z' => kinds.push(ParamKind::Single),
            _ => return Err(malformed(desc)),
        }
    }

    Ok(kinds)
}

/// Number of argument values popped off the operand stack (the stack holds
/// one slot per value regardless of width).
pub fn param_value_count(kinds: &[ParamKind]) -> usize {
    kinds.len()
}

/// Number of local-variable slots the parameters occupy, with wide
/// doublings.
pub fn param_slot_count(kinds: &[ParamKind]) -> usize {
    kinds
        .iter()
        .map(|k| match k {
            ParamKind::Single => 1,
            ParamKind::Wide => 2,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("()V", 0, 0)]
    #[case("(II)I", 2, 2)]
    #[case("(JD)V", 2, 4)]
    #[case("(Ljava/lang/String;I)V", 2, 2)]
    #[case("([[IJ[Ljava/lang/Object;)V", 3, 4)]
    #[case("(BCSZF)V", 5, 5)]
    fn counts_values_and_slots(
        #[case] desc: &str,
        #[case] values: usize,
        #[case] slots: usize,
    ) {
        let kinds = parse_params(desc).unwrap();
        assert_eq!(param_value_count(&kinds), values);
        assert_eq!(param_slot_count(&kinds), slots);
    }

    #[test]
    fn rejects_unterminated_class_marker() {
        assert!(parse_params("(Ljava/lang/String)V").is_err());
        assert!(parse_params("II)V").is_err());
    }

}
