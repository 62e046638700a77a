use std::fs::File;
use std::io::Write;
use std::ops::{Add, Neg, Sub};

use num::traits::{Num, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub type Real = f64;

/// Propagation speed assumed by the Doppler relation.
pub const SPEED_OF_LIGHT: Real = 3.0e8;

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Decibel(Real);

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Ratio(Real);

impl Decibel {
    /// Level of a power (not amplitude) ratio.
    pub fn from_power_ratio(ratio: Real) -> Self {
        Self(10.0 * Real::log10(ratio))
    }
}

impl Add for Decibel {
    type Output = Decibel;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Decibel {
    type Output = Decibel;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Decibel {
    type Output = Decibel;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl From<Decibel> for Ratio {
    fn from(db: Decibel) -> Self {
        Self(Real::powf(10.0, db.0 / 20.0))
    }
}

impl From<Ratio> for Decibel {
    fn from(ratio: Ratio) -> Self {
        Self(20.0 * Real::log10(ratio.0))
    }
}

macro_rules! impl_from_primitive_for {
    ($DR: ty) => {
        impl<T: Num + ToPrimitive> From<T> for $DR {
            #[inline]
            fn from(value: T) -> Self {
                Self(value.to_f64().unwrap_or(Real::NAN))
            }
        }
    };
}

impl_from_primitive_for!(Decibel);
impl_from_primitive_for!(Ratio);

impl From<Decibel> for Real {
    fn from(db: Decibel) -> Self {
        db.0
    }
}

impl From<Ratio> for Real {
    fn from(ratio: Ratio) -> Self {
        ratio.0
    }
}

pub trait Units {
    fn db(self) -> Decibel;

    fn ratio(self) -> Ratio;

    fn value(self) -> Real;
}

impl<T: Into<Decibel> + Into<Ratio> + Into<Real>> Units for T {
    fn db(self) -> Decibel {
        self.into()
    }

    fn ratio(self) -> Ratio {
        self.into()
    }

    fn value(self) -> Real {
        self.into()
    }
}

pub trait Storable: Serialize {
    fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let mut file = File::create(&path)?;
        let s = serde_json::to_string(self)?;
        file.write_all(s.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplitude_and_power_levels() {
        assert!((Ratio::from(20.0.db()).value() - 10.0).abs() < 1e-12);
        assert!((Decibel::from_power_ratio(100.0).value() - 20.0).abs() < 1e-12);
        assert!(10.db() > 3.db());
        assert!((-6.0.db()).value() < 0.0);
    }
}
