//! UNESCO 1983 seawater formulas
//!
//! - Practical salinity (PSS-78) from conductivity, pressure and temperature
//! - Speed of sound (Chen & Millero) from salinity, pressure and temperature
//!
//! Units: conductivity in mS/cm, pressure in dbar, temperature in °C.

/// Conductivity of standard seawater C(35, 15, 0) in mS/cm
pub const STANDARD_CONDUCTIVITY: f64 = 42.914;

fn poly(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Practical salinity (PSU).
///
/// May be slightly negative for fresh water and is NaN for negative
/// conductivity; callers decide how to clamp.
pub fn compute_salinity(conductivity: f64, pressure: f64, temperature: f64) -> f64 {
    const A: [f64; 6] = [0.0080, -0.1692, 25.3851, 14.0941, -7.0261, 2.7081];
    const B: [f64; 6] = [0.0005, -0.0056, -0.0066, -0.0375, 0.0636, -0.0144];
    const C: [f64; 5] = [0.6766097, 2.00564e-2, 1.104259e-4, -6.9698e-7, 1.0031e-9];
    const D: [f64; 4] = [3.426e-2, 4.464e-4, 4.215e-1, -3.107e-3];
    const E: [f64; 3] = [2.070e-5, -6.370e-10, 3.989e-15];
    const K: f64 = 0.0162;

    let t = temperature;
    let p = pressure;
    let r = conductivity / STANDARD_CONDUCTIVITY;

    let rt_t = poly(&C, t);
    let rp = 1.0 + p * poly(&E, p) / (1.0 + D[0] * t + D[1] * t * t + (D[2] + D[3] * t) * r);
    let rt = r / (rp * rt_t);

    let sqrt_rt = rt.sqrt();
    let dt = t - 15.0;
    poly(&A, sqrt_rt) + dt / (1.0 + K * dt) * poly(&B, sqrt_rt)
}

/// Speed of sound in seawater (m/s)
pub fn compute_sound_speed(salinity: f64, pressure: f64, temperature: f64) -> f64 {
    const C0: [f64; 6] = [1402.388, 5.03711, -5.80852e-2, 3.3420e-4, -1.47800e-6, 3.1464e-9];
    const C1: [f64; 5] = [0.153563, 6.8982e-4, -8.1788e-6, 1.3621e-7, -6.1185e-10];
    const C2: [f64; 5] = [3.1260e-5, -1.7107e-6, 2.5974e-8, -2.5335e-10, 1.0405e-12];
    const C3: [f64; 3] = [-9.7729e-9, 3.8504e-10, -2.3643e-12];
    const A0: [f64; 5] = [1.389, -1.262e-2, 7.164e-5, 2.006e-6, -3.21e-8];
    const A1: [f64; 5] = [9.4742e-5, -1.2580e-5, -6.4885e-8, 1.0507e-8, -2.0122e-10];
    const A2: [f64; 4] = [-3.9064e-7, 9.1041e-9, -1.6002e-10, 7.988e-12];
    const A3: [f64; 3] = [1.100e-10, 6.649e-12, -3.389e-13];
    const B0: [f64; 2] = [-1.922e-2, -4.42e-5];
    const B1: [f64; 2] = [7.3637e-5, 1.7945e-7];
    const D0: f64 = 1.727e-3;
    const D1: f64 = -7.9836e-6;

    let s = salinity;
    let t = temperature;
    // The fit is expressed in bar
    let p = pressure / 10.0;

    let cw = poly(&[poly(&C0, t), poly(&C1, t), poly(&C2, t), poly(&C3, t)], p);
    let a = poly(&[poly(&A0, t), poly(&A1, t), poly(&A2, t), poly(&A3, t)], p);
    let b = poly(&B0, t) + poly(&B1, t) * p;
    let d = D0 + D1 * p;

    cw + a * s + b * s * s.sqrt() + d * s * s
}
