use super::params::{ForcefieldParams, PotentialFunction};
use super::potentials;
use super::registry::ForcefieldError;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, HashSet};

const UFF_BOND_ORDER_CORRECTION: f64 = 0.1332;

#[derive(Debug, Clone, Copy, PartialEq)]
struct BondTerm {
    i: usize,
    j: usize,
    rest_length: f64,
    force_constant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PairTerm {
    i: usize,
    j: usize,
    r_min: f64,
    well_depth: f64,
    scale: f64,
}

/// A force field bound to one molecular topology.
///
/// Atoms are addressed by their index in [`EnergyModel::atom_ids`], so the model
/// works on plain position slices and never touches the system while evaluating.
#[derive(Debug, Clone)]
pub struct EnergyModel {
    atom_ids: Vec<AtomId>,
    bonds: Vec<BondTerm>,
    pairs: Vec<PairTerm>,
    potential: PotentialFunction,
    cutoff: f64,
}

impl EnergyModel {
    /// Assigns parameters to every atom, bond and non-bonded pair of `system`.
    ///
    /// Bond rest lengths are the sum of covalent radii with the UFF bond-order
    /// correction. Non-bonded pairs exclude 1-2 and 1-3 neighbours.
    ///
    /// # Errors
    ///
    /// Returns [`ForcefieldError::MissingVdwParam`] if an element present in
    /// the system has no van der Waals parameters in `params`.
    pub fn build(system: &MolecularSystem, params: &ForcefieldParams) -> Result<Self, ForcefieldError> {
        let atom_ids: Vec<AtomId> = system.atoms_iter().map(|(id, _)| id).collect();
        let index_of: HashMap<AtomId, usize> = atom_ids
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let mut vdw = Vec::with_capacity(atom_ids.len());
        let mut radii = Vec::with_capacity(atom_ids.len());
        for (_, atom) in system.atoms_iter() {
            let param = params
                .vdw_for(atom.element)
                .ok_or_else(|| ForcefieldError::MissingVdwParam {
                    forcefield: params.name.clone(),
                    element: atom.element,
                })?;
            vdw.push(param.clone());
            radii.push(atom.element.covalent_radius());
        }

        let bonds: Vec<BondTerm> = system
            .bonds()
            .iter()
            .filter_map(|bond| {
                let i = *index_of.get(&bond.atom1_id)?;
                let j = *index_of.get(&bond.atom2_id)?;
                let correction = 1.0 - UFF_BOND_ORDER_CORRECTION * bond.order.value().ln();
                Some(BondTerm {
                    i,
                    j,
                    rest_length: (radii[i] + radii[j]) * correction,
                    force_constant: params.globals.bond_force_constant,
                })
            })
            .collect();

        let excluded = Self::excluded_pairs(system, &index_of);

        let mut pairs = Vec::new();
        for i in 0..atom_ids.len() {
            for j in (i + 1)..atom_ids.len() {
                if excluded.contains(&(i, j)) {
                    continue;
                }
                pairs.push(PairTerm {
                    i,
                    j,
                    r_min: (vdw[i].radius() + vdw[j].radius()) / 2.0,
                    well_depth: (vdw[i].well_depth() * vdw[j].well_depth()).sqrt(),
                    scale: (vdw[i].scale() + vdw[j].scale()) / 2.0,
                });
            }
        }

        Ok(Self {
            atom_ids,
            bonds,
            pairs,
            potential: params.globals.potential_function,
            cutoff: params.globals.nonbonded_cutoff,
        })
    }

    fn excluded_pairs(
        system: &MolecularSystem,
        index_of: &HashMap<AtomId, usize>,
    ) -> HashSet<(usize, usize)> {
        let ordered = |a: usize, b: usize| if a < b { (a, b) } else { (b, a) };
        let mut excluded = HashSet::new();

        for (&center_id, &center) in index_of {
            let neighbors: Vec<usize> = system
                .get_bonded_neighbors(center_id)
                .unwrap_or(&[])
                .iter()
                .filter_map(|id| index_of.get(id).copied())
                .collect();

            for (k, &n1) in neighbors.iter().enumerate() {
                excluded.insert(ordered(center, n1));
                for &n2 in &neighbors[k + 1..] {
                    excluded.insert(ordered(n1, n2));
                }
            }
        }
        excluded
    }

    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atom_ids
    }

    pub fn atom_count(&self) -> usize {
        self.atom_ids.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Reads the current coordinates of the model's atoms from `system`.
    ///
    /// Returns `None` if any atom has been removed since the model was built.
    pub fn gather_positions(&self, system: &MolecularSystem) -> Option<Vec<Point3<f64>>> {
        self.atom_ids
            .iter()
            .map(|&id| system.atom(id).map(|atom| atom.position))
            .collect()
    }

    /// Writes `positions` back into `system`, skipping atoms that no longer exist.
    pub fn scatter_positions(&self, system: &mut MolecularSystem, positions: &[Point3<f64>]) {
        for (&id, position) in self.atom_ids.iter().zip(positions) {
            if let Some(atom) = system.atom_mut(id) {
                atom.position = *position;
            }
        }
    }

    fn pair_energy(&self, pair: &PairTerm, dist: f64) -> f64 {
        match self.potential {
            PotentialFunction::LennardJones => {
                potentials::lennard_jones_12_6(dist, pair.r_min, pair.well_depth)
            }
            PotentialFunction::Buckingham => {
                potentials::buckingham_exp_6(dist, pair.r_min, pair.well_depth, pair.scale)
            }
        }
    }

    fn pair_derivative(&self, pair: &PairTerm, dist: f64) -> f64 {
        match self.potential {
            PotentialFunction::LennardJones => {
                potentials::lennard_jones_12_6_derivative(dist, pair.r_min, pair.well_depth)
            }
            PotentialFunction::Buckingham => potentials::buckingham_exp_6_derivative(
                dist,
                pair.r_min,
                pair.well_depth,
                pair.scale,
            ),
        }
    }

    pub fn energy(&self, positions: &[Point3<f64>]) -> f64 {
        let bonded: f64 = self
            .bonds
            .iter()
            .map(|b| {
                let dist = (positions[b.i] - positions[b.j]).norm();
                potentials::harmonic_stretch(dist, b.rest_length, b.force_constant)
            })
            .sum();

        let non_bonded: f64 = self
            .pairs
            .iter()
            .filter_map(|p| {
                let dist = (positions[p.i] - positions[p.j]).norm();
                (dist <= self.cutoff).then(|| self.pair_energy(p, dist))
            })
            .sum();

        bonded + non_bonded
    }

    /// Total energy (kcal/mol) and its gradient with respect to each position.
    pub fn energy_and_gradient(&self, positions: &[Point3<f64>]) -> (f64, Vec<Vector3<f64>>) {
        let mut energy = 0.0;
        let mut gradient = vec![Vector3::zeros(); positions.len()];

        let mut accumulate = |i: usize, j: usize, dist: f64, d_energy: f64| {
            if dist < 1e-12 {
                return;
            }
            let direction = (positions[i] - positions[j]) / dist;
            gradient[i] += direction * d_energy;
            gradient[j] -= direction * d_energy;
        };

        for b in &self.bonds {
            let dist = (positions[b.i] - positions[b.j]).norm();
            energy += potentials::harmonic_stretch(dist, b.rest_length, b.force_constant);
            let d_energy = potentials::harmonic_stretch_derivative(dist, b.rest_length, b.force_constant);
            accumulate(b.i, b.j, dist, d_energy);
        }

        for p in &self.pairs {
            let dist = (positions[p.i] - positions[p.j]).norm();
            if dist > self.cutoff {
                continue;
            }
            energy += self.pair_energy(p, dist);
            accumulate(p.i, p.j, dist, self.pair_derivative(p, dist));
        }

        (energy, gradient)
    }
}
