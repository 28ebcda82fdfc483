//! Raw sample <-> temperature conversion.
//!
//! The THS reports a raw code that falls as the die warms. Each silicon
//! family maps it to millidegrees Celsius with a fixed linear relation:
//!
//! ```text
//! mC  = offset_mc - raw * scale_num / scale_den
//! raw = offset_mc * scale_den / scale_num - mC * scale_den / scale_num
//! ```
//!
//! Integer division truncates toward zero at every step, so the inverse
//! recovers a raw code to within one count.

/// Linear conversion constants for one sensor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// Temperature at raw code zero, in millidegrees Celsius.
    pub offset_mc: i32,
    pub scale_num: i32,
    pub scale_den: i32,
}

impl Conversion {
    /// H6 constants. Formula and parameters from the Allwinner 3.4 kernel.
    pub const H6: Self = Self {
        offset_mc: 187_744,
        scale_num: 1_000_000,
        scale_den: 14_882,
    };

    /// Convert a raw sample to millidegrees Celsius.
    pub fn raw_to_millidegrees(&self, raw: u32) -> i32 {
        let drop = i64::from(raw) * i64::from(self.scale_num) / i64::from(self.scale_den);
        saturate(i64::from(self.offset_mc) - drop)
    }

    /// Raw code the sensor reports at 0 mC.
    pub fn raw_intercept(&self) -> i32 {
        saturate(i64::from(self.offset_mc) * i64::from(self.scale_den) / i64::from(self.scale_num))
    }

    /// Raw code an uncalibrated sensor would report at `millidegrees`.
    pub fn millidegrees_to_raw(&self, millidegrees: i32) -> i32 {
        let rise = i64::from(millidegrees) * i64::from(self.scale_den) / i64::from(self.scale_num);
        saturate(i64::from(self.raw_intercept()) - rise)
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
