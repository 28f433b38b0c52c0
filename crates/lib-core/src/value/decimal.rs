use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Exact fixed-point decimal: an integer mantissa and a base-10 scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Decimal {
    unscaled: i128,
    scale: u32,
}

impl Decimal {
    pub fn new(unscaled: i128, scale: u32) -> Decimal {
        Decimal { unscaled, scale }
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Strip trailing fractional zeros so that `1.50` and `1.5` share one
    /// representation.
    pub fn normalized(&self) -> Decimal {
        let mut unscaled = self.unscaled;
        let mut scale = self.scale;
        while scale > 0 && unscaled % 10 == 0 {
            unscaled /= 10;
            scale -= 1;
        }
        Decimal { unscaled, scale }
    }

    fn compare(&self, other: &Decimal) -> Ordering {
        let a = self.normalized();
        let b = other.normalized();
        if a.scale == b.scale {
            return a.unscaled.cmp(&b.unscaled);
        }
        // Align the shorter fraction when it fits in i128, otherwise fall
        // back to exact digit comparison.
        let (short, long, flip) = if a.scale < b.scale {
            (a, b, false)
        } else {
            (b, a, true)
        };
        let ordering = match 10_i128
            .checked_pow(long.scale - short.scale)
            .and_then(|f| short.unscaled.checked_mul(f))
        {
            Some(aligned) => aligned.cmp(&long.unscaled),
            None => compare_digits(&short, &long),
        };
        if flip { ordering.reverse() } else { ordering }
    }
}

/// Exact comparison through sign, integer-digit count and digit strings.
fn compare_digits(a: &Decimal, b: &Decimal) -> Ordering {
    let sign = |d: &Decimal| d.unscaled.signum();
    match sign(a).cmp(&sign(b)) {
        Ordering::Equal => {}
        unequal => return unequal,
    }
    let negative = sign(a) < 0;

    let digits = |d: &Decimal| {
        let text = d.unscaled.unsigned_abs().to_string();
        let scale = d.scale as usize;
        let (int_part, frac_part) = if text.len() > scale {
            (text[..text.len() - scale].to_string(), text[text.len() - scale..].to_string())
        } else {
            (String::from("0"), format!("{:0>width$}", text, width = scale))
        };
        (int_part, frac_part)
    };

    let (ai, af) = digits(a);
    let (bi, bf) = digits(b);
    let ordering = ai
        .len()
        .cmp(&bi.len())
        .then_with(|| ai.cmp(&bi))
        .then_with(|| {
            let width = af.len().max(bf.len());
            let af = format!("{af:0<width$}");
            let bf = format!("{bf:0<width$}");
            af.cmp(&bf)
        });
    if negative { ordering.reverse() } else { ordering }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Decimal) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Decimal) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Decimal) -> Ordering {
        self.compare(other)
    }
}

impl std::hash::Hash for Decimal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        let normalized = self.normalized();
        normalized.unscaled.hash(state);
        normalized.scale.hash(state);
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let text = self.unscaled.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let sign = if self.unscaled < 0 { "-" } else { "" };
        if text.len() > scale {
            write!(f, "{sign}{}.{}", &text[..text.len() - scale], &text[text.len() - scale..])
        } else {
            write!(f, "{sign}0.{:0>width$}", text, width = scale)
        }
    }
}

impl FromStr for Decimal {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Decimal, Self::Err> {
        match s.split_once('.') {
            None => Ok(Decimal::new(s.parse()?, 0)),
            Some((int_part, frac_part)) => {
                let digits: String = format!("{int_part}{frac_part}");
                Ok(Decimal::new(digits.parse()?, frac_part.len() as u32))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_aligns_scales() {
        let a: Decimal = "1.5".parse().unwrap();
        let b: Decimal = "1.50".parse().unwrap();
        let c: Decimal = "1.51".parse().unwrap();
        let d: Decimal = "-2.4".parse().unwrap();

        assert_eq!(a, b);
        assert!(a < c);
        assert!(d < a);
        assert_eq!(c.to_string(), "1.51");
        assert_eq!(d.to_string(), "-2.4");
    }

    #[test]
    fn extreme_mantissas_compare_exactly() {
        let big = Decimal::new(i128::MAX, 2);
        let small = Decimal::new(1, 30);
        assert!(small < big);
        assert!(big > small);
        assert_eq!(big.cmp(&big), Ordering::Equal);
    }
}
