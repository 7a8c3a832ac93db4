// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Standard normal distribution.

use std::f64::consts::SQRT_2;

/// Complementary error function. Chebyshev fit with a fractional error below
/// `1.2e-7` everywhere.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);

    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));

    let ans = t * poly.exp();

    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Cumulative distribution function of the standard normal distribution.
pub fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Two-sided tail probability of a standard normal test statistic,
/// `2 · (1 − Φ(|t|))`.
pub fn two_sided_p(t: f64) -> f64 {
    erfc(t.abs() / SQRT_2)
}
