use super::atom::Atom;
use super::ids::AtomId;
use super::topology::{Bond, BondOrder};
use nalgebra::Point3;
use slotmap::{SecondaryMap, SlotMap};
use std::sync::{Arc, RwLock};

/// A molecular system shared between its owner (typically a builder UI) and
/// the minimizer, which rewrites coordinates in place.
pub type SharedSystem = Arc<RwLock<MolecularSystem>>;

/// Represents a molecular structure as a set of atoms and the bonds between them.
///
/// Atoms are stored in a slot map so that their IDs stay valid while other
/// atoms are added or removed. A bond adjacency cache is kept in sync with the
/// bond list for fast neighbour queries.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// List of all bonds in the system.
    bonds: Vec<Bond>,
    /// Cached adjacency list for bond connectivity, indexed by atom ID.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl MolecularSystem {
    /// Creates a new, empty molecular system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the system in a [`SharedSystem`] handle.
    pub fn into_shared(self) -> SharedSystem {
        Arc::new(RwLock::new(self))
    }

    /// Retrieves an immutable reference to an atom by its ID.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms in the system.
    ///
    /// # Return
    ///
    /// An iterator yielding `(AtomId, &Atom)` pairs in insertion order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    /// Returns a mutable iterator over all atoms in the system.
    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = (AtomId, &mut Atom)> {
        self.atoms.iter_mut()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Returns `true` if the system contains no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns a slice of all bonds in the system.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Adds an atom to the system and returns its new ID.
    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let atom_id = self.atoms.insert(atom);
        self.bond_adjacency.insert(atom_id, Vec::new());
        atom_id
    }

    /// Adds a bond between two atoms.
    ///
    /// This method is idempotent; adding an existing bond succeeds without
    /// creating a duplicate.
    ///
    /// # Arguments
    ///
    /// * `atom1_id` - ID of the first atom.
    /// * `atom2_id` - ID of the second atom.
    /// * `order` - The order of the bond.
    ///
    /// # Return
    ///
    /// Returns `Some(())` if successful, otherwise `None` (e.g., if either atom
    /// does not exist or both IDs refer to the same atom).
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }

        if let Some(neighbors) = self.bond_adjacency.get(atom1_id) {
            if neighbors.contains(&atom2_id) {
                return Some(());
            }
        }

        self.bonds.push(Bond::new(atom1_id, atom2_id, order));
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    /// Removes an atom together with every bond that references it.
    ///
    /// # Return
    ///
    /// Returns `Some(Atom)` if the atom existed and was removed, otherwise `None`.
    pub fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;

        self.bonds.retain(|bond| !bond.contains(atom_id));

        let neighbors = self.bond_adjacency.remove(atom_id).unwrap_or_default();
        for neighbor_id in neighbors {
            if let Some(adjacency) = self.bond_adjacency.get_mut(neighbor_id) {
                adjacency.retain(|&id| id != atom_id);
            }
        }

        Some(atom)
    }

    /// Retrieves the bonded neighbors of an atom.
    ///
    /// # Return
    ///
    /// Returns `Some(&[AtomId])` if the atom exists, otherwise `None`.
    pub fn get_bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Infers single bonds from interatomic distances.
    ///
    /// Two atoms are bonded when their distance is at most the sum of their
    /// covalent radii scaled by `tolerance` (1.2 is a common choice). Existing
    /// bonds are kept.
    ///
    /// # Return
    ///
    /// The number of bonds that were added.
    pub fn perceive_bonds(&mut self, tolerance: f64) -> usize {
        let atoms: Vec<(AtomId, Point3<f64>, f64)> = self
            .atoms
            .iter()
            .map(|(id, atom)| (id, atom.position, atom.element.covalent_radius()))
            .collect();

        let mut added = 0;
        for (i, &(id1, pos1, r1)) in atoms.iter().enumerate() {
            for &(id2, pos2, r2) in &atoms[i + 1..] {
                let limit = (r1 + r2) * tolerance;
                if (pos1 - pos2).norm_squared() > limit * limit {
                    continue;
                }
                let already_bonded = self
                    .get_bonded_neighbors(id1)
                    .is_some_and(|n| n.contains(&id2));
                if !already_bonded && self.add_bond(id1, id2, BondOrder::Single).is_some() {
                    added += 1;
                }
            }
        }
        added
    }

    /// Geometric center of all atoms, or `None` for an empty system.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.atoms.is_empty() {
            return None;
        }
        let sum = self
            .atoms
            .values()
            .fold(nalgebra::Vector3::zeros(), |acc, atom| acc + atom.position.coords);
        Some(Point3::from(sum / self.atoms.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Element;

    struct TestRefs {
        o_id: AtomId,
        h1_id: AtomId,
        h2_id: AtomId,
    }

    fn create_water() -> (MolecularSystem, TestRefs) {
        let mut system = MolecularSystem::new();
        let o_id = system.add_atom(Atom::new(Element::O, Point3::new(0.0, 0.0, 0.0)));
        let h1_id = system.add_atom(Atom::new(Element::H, Point3::new(0.96, 0.0, 0.0)));
        let h2_id = system.add_atom(Atom::new(Element::H, Point3::new(-0.24, 0.93, 0.0)));
        system.add_bond(o_id, h1_id, BondOrder::Single).unwrap();
        system.add_bond(o_id, h2_id, BondOrder::Single).unwrap();
        (system, TestRefs { o_id, h1_id, h2_id })
    }

    #[test]
    fn system_creation_and_access() {
        let (system, refs) = create_water();

        assert_eq!(system.atom_count(), 3);
        assert!(!system.is_empty());
        assert_eq!(system.bonds().len(), 2);
        assert_eq!(system.atom(refs.o_id).unwrap().element, Element::O);
        assert_eq!(system.get_bonded_neighbors(refs.o_id).unwrap().len(), 2);
    }

    #[test]
    fn new_system_is_empty() {
        let system = MolecularSystem::new();
        assert!(system.is_empty());
        assert_eq!(system.atom_count(), 0);
        assert!(system.centroid().is_none());
    }

    #[test]
    fn atom_removal_updates_bonds_and_adjacency() {
        let (mut system, refs) = create_water();

        let removed = system.remove_atom(refs.h1_id).unwrap();

        assert_eq!(removed.element, Element::H);
        assert_eq!(system.atom_count(), 2);
        assert_eq!(system.bonds().len(), 1);
        assert!(!system.bond_adjacency.contains_key(refs.h1_id));
        assert_eq!(
            system.get_bonded_neighbors(refs.o_id).unwrap(),
            &[refs.h2_id]
        );
        assert!(system.remove_atom(refs.h1_id).is_none());
    }

    #[test]
    fn idempotent_add_bond_does_not_create_duplicates() {
        let (mut system, refs) = create_water();

        assert!(system.add_bond(refs.h1_id, refs.o_id, BondOrder::Single).is_some());
        assert!(system.add_bond(refs.o_id, refs.h1_id, BondOrder::Double).is_some());

        assert_eq!(system.bonds().len(), 2);
        assert_eq!(system.get_bonded_neighbors(refs.h1_id).unwrap().len(), 1);
    }

    #[test]
    fn add_bond_rejects_self_bonds_and_missing_atoms() {
        let (mut system, refs) = create_water();
        let removed_id = system.add_atom(Atom::new(Element::C, Point3::origin()));
        system.remove_atom(removed_id);

        assert!(system.add_bond(refs.o_id, refs.o_id, BondOrder::Single).is_none());
        assert!(system.add_bond(refs.o_id, removed_id, BondOrder::Single).is_none());
    }

    #[test]
    fn perceive_bonds_connects_atoms_within_covalent_distance() {
        let mut system = MolecularSystem::new();
        let c1 = system.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        let c2 = system.add_atom(Atom::new(Element::C, Point3::new(1.54, 0.0, 0.0)));
        let far = system.add_atom(Atom::new(Element::C, Point3::new(10.0, 0.0, 0.0)));

        let added = system.perceive_bonds(1.2);

        assert_eq!(added, 1);
        assert_eq!(system.get_bonded_neighbors(c1).unwrap(), &[c2]);
        assert!(system.get_bonded_neighbors(far).unwrap().is_empty());
        assert_eq!(system.perceive_bonds(1.2), 0);
    }

    #[test]
    fn centroid_is_mean_position() {
        let mut system = MolecularSystem::new();
        system.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        system.add_atom(Atom::new(Element::C, Point3::new(2.0, 4.0, -2.0)));

        assert_eq!(system.centroid(), Some(Point3::new(1.0, 2.0, -1.0)));
    }

    #[test]
    fn into_shared_preserves_contents() {
        let (system, refs) = create_water();
        let shared = system.into_shared();
        let guard = shared.read().unwrap();
        assert_eq!(guard.atom(refs.h2_id).unwrap().element, Element::H);
    }
}
