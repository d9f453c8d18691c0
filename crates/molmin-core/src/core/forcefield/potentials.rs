const SINGULARITY_DISTANCE: f64 = 1e-6;
const SINGULARITY_ENERGY: f64 = 1e10;

#[inline]
pub fn lennard_jones_12_6(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < SINGULARITY_DISTANCE {
        return SINGULARITY_ENERGY;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    well_depth * (rho12 - 2.0 * rho6)
}

/// dE/dr of [`lennard_jones_12_6`].
#[inline]
pub fn lennard_jones_12_6_derivative(dist: f64, r_min: f64, well_depth: f64) -> f64 {
    if dist < SINGULARITY_DISTANCE {
        return 0.0;
    }
    let rho = r_min / dist;
    let rho6 = rho.powi(6);
    let rho12 = rho6 * rho6;
    12.0 * well_depth * (rho6 - rho12) / dist
}

#[inline]
pub fn buckingham_exp_6(dist: f64, r_min: f64, well_depth: f64, gamma: f64) -> f64 {
    if dist < SINGULARITY_DISTANCE {
        return SINGULARITY_ENERGY;
    }
    let rho = dist / r_min;
    if rho < 0.1 {
        return SINGULARITY_ENERGY;
    }

    let factor = gamma / (gamma - 6.0);
    well_depth * (6.0 / (gamma - 6.0) * (gamma * (1.0 - rho)).exp() - factor * rho.powi(-6))
}

/// dE/dr of [`buckingham_exp_6`].
///
/// Zero inside the short-range cap where the energy is held constant.
#[inline]
pub fn buckingham_exp_6_derivative(dist: f64, r_min: f64, well_depth: f64, gamma: f64) -> f64 {
    if dist < SINGULARITY_DISTANCE {
        return 0.0;
    }
    let rho = dist / r_min;
    if rho < 0.1 {
        return 0.0;
    }

    let g6 = gamma - 6.0;
    let repulsive = -6.0 * gamma / g6 * (gamma * (1.0 - rho)).exp();
    let attractive = 6.0 * gamma / g6 * rho.powi(-7);
    well_depth * (repulsive + attractive) / r_min
}

#[inline]
pub fn harmonic_stretch(dist: f64, rest_length: f64, force_constant: f64) -> f64 {
    let dr = dist - rest_length;
    0.5 * force_constant * dr * dr
}

#[inline]
pub fn harmonic_stretch_derivative(dist: f64, rest_length: f64, force_constant: f64) -> f64 {
    force_constant * (dist - rest_length)
}
