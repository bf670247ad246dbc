//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 17.14 定点数运算
//!
//! 内核不使用浮点，MLFQS 的 load_avg 与 recent_cpu 以定点数表示：
//! 低 14 位为小数部分，缩放因子 F = 2^14 = 16384。
//!
//! 乘除法先扩展到 i64 再截断回 i32，除法向零截断。

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};

/// 小数位数
pub const FRACTION_BITS: u32 = 14;

/// 缩放因子 F
pub const F: i32 = 1 << FRACTION_BITS;

/// 17.14 定点数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(F);

    #[inline]
    pub const fn from_int(n: i32) -> Self {
        Fixed(n * F)
    }

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Fixed(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// 向零截断取整
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 / F
    }

    /// 四舍五入取整（.5 远离零）
    #[inline]
    pub const fn to_int_round(self) -> i32 {
        if self.0 >= 0 {
            (self.0 + F / 2) / F
        } else {
            (self.0 - F / 2) / F
        }
    }
}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 - rhs.0)
    }
}

impl Mul for Fixed {
    type Output = Fixed;

    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i64) * (rhs.0 as i64) / F as i64) as i32)
    }
}

impl Div for Fixed {
    type Output = Fixed;

    fn div(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i64) * F as i64 / rhs.0 as i64) as i32)
    }
}

impl Add<i32> for Fixed {
    type Output = Fixed;

    fn add(self, n: i32) -> Fixed {
        Fixed(self.0 + n * F)
    }
}

impl Sub<i32> for Fixed {
    type Output = Fixed;

    fn sub(self, n: i32) -> Fixed {
        Fixed(self.0 - n * F)
    }
}

impl Mul<i32> for Fixed {
    type Output = Fixed;

    fn mul(self, n: i32) -> Fixed {
        Fixed(self.0 * n)
    }
}

impl Div<i32> for Fixed {
    type Output = Fixed;

    fn div(self, n: i32) -> Fixed {
        Fixed(self.0 / n)
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Fixed {
        Fixed(-self.0)
    }
}

impl fmt::Display for Fixed {
    /// 以两位小数显示（四舍五入）
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hundredths = (*self * 100).to_int_round();
        let sign = if hundredths < 0 { "-" } else { "" };
        let abs = hundredths.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_int_conversion() {
        assert_eq!(Fixed::from_int(5).raw(), 5 * 16384);
        assert_eq!(Fixed::from_int(-3).to_int(), -3);
        assert_eq!(Fixed::ONE, Fixed::from_int(1));
    }

    #[test]
    fn test_round_half_away_from_zero() {
        let half = Fixed::from_raw(F / 2);
        assert_eq!(half.to_int_round(), 1);
        assert_eq!((-half).to_int_round(), -1);
        assert_eq!(Fixed::from_raw(F / 2 - 1).to_int_round(), 0);
        // 2.75 -> 截断 2，四舍五入 3
        let x = Fixed::from_int(11) / 4;
        assert_eq!(x.to_int(), 2);
        assert_eq!(x.to_int_round(), 3);
        assert_eq!((-x).to_int(), -2);
        assert_eq!((-x).to_int_round(), -3);
    }

    #[test]
    fn test_mixed_ops() {
        let x = Fixed::from_int(3);
        assert_eq!((x + 2).to_int(), 5);
        assert_eq!((x - 5).to_int(), -2);
        assert_eq!((x * 4).to_int(), 12);
        assert_eq!((x / 2).raw(), 3 * F / 2);
    }

    #[test]
    fn test_mul_div_widen() {
        // 100 * 100 的原始值乘积超出 i32，必须扩展到 i64
        let x = Fixed::from_int(100);
        assert_eq!((x * x).to_int(), 10_000);
        assert_eq!((x / Fixed::from_int(8)).raw(), Fixed::from_int(25).raw() / 2);
        assert_eq!((Fixed::from_int(-7) / Fixed::from_int(2)).to_int(), -3);
    }

    #[test]
    fn test_load_avg_coefficients() {
        // 59/60 与 1/60 是 MLFQS 中的常用系数
        let one_sixtieth = Fixed::from_int(1) / 60;
        assert_eq!(one_sixtieth.raw(), 273);
        let fifty_nine = Fixed::from_int(59) / 60;
        assert_eq!(fifty_nine.raw(), 16110);
    }

    #[test]
    fn test_display() {
        assert_eq!(Fixed::from_int(1).to_string(), "1.00");
        assert_eq!((Fixed::from_int(-1) / 4).to_string(), "-0.25");
        assert_eq!(Fixed::from_raw(273).to_string(), "0.02");
    }
}
