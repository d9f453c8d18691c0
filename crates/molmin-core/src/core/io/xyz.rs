use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::{Atom, Element};
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Covalent-radius scale factor used to perceive bonds from XYZ coordinates.
pub const BOND_PERCEPTION_TOLERANCE: f64 = 1.2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XyzMetadata {
    /// The free-form comment line (second line of the file).
    pub comment: String,
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Header declares {expected} atoms but {found} atom lines were found")]
    AtomCountMismatch { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count (value: '{0}')")]
    InvalidAtomCount(String),
    #[error("Missing {0} field")]
    MissingField(&'static str),
    #[error("Invalid float format (value: '{0}')")]
    InvalidFloat(String),
    #[error("Unknown element in label '{0}'")]
    UnknownElement(String),
}

/// Splits a label such as `C12` or `Cl3` into its element symbol.
fn element_from_label(label: &str) -> Option<Element> {
    let symbol: String = label.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    symbol.parse().ok()
}

fn parse_coordinate(field: Option<&str>, name: &'static str, line: usize) -> Result<f64, XyzError> {
    let value = field.ok_or(XyzError::Parse {
        line,
        kind: XyzParseErrorKind::MissingField(name),
    })?;
    value.parse().map_err(|_| XyzError::Parse {
        line,
        kind: XyzParseErrorKind::InvalidFloat(value.to_string()),
    })
}

pub struct XyzFile;

impl MolecularFile for XyzFile {
    type Metadata = XyzMetadata;
    type Error = XyzError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut lines = reader.lines().enumerate();

        let expected = match lines.next() {
            Some((_, line)) => {
                let line = line?;
                let trimmed = line.trim();
                trimmed.parse::<usize>().map_err(|_| XyzError::Parse {
                    line: 1,
                    kind: XyzParseErrorKind::InvalidAtomCount(trimmed.to_string()),
                })?
            }
            None => {
                return Err(XyzError::Parse {
                    line: 1,
                    kind: XyzParseErrorKind::InvalidAtomCount(String::new()),
                });
            }
        };

        let comment = match lines.next() {
            Some((_, line)) => line?.trim_end().to_string(),
            None => String::new(),
        };

        let mut system = MolecularSystem::new();
        for (idx, line) in lines {
            let line = line?;
            let line_num = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            if system.atom_count() == expected {
                return Err(XyzError::AtomCountMismatch {
                    expected,
                    found: expected + 1,
                });
            }

            let mut fields = line.split_whitespace();
            let label = fields.next().ok_or(XyzError::Parse {
                line: line_num,
                kind: XyzParseErrorKind::MissingField("element"),
            })?;
            let element = element_from_label(label).ok_or_else(|| XyzError::Parse {
                line: line_num,
                kind: XyzParseErrorKind::UnknownElement(label.to_string()),
            })?;
            let x = parse_coordinate(fields.next(), "x", line_num)?;
            let y = parse_coordinate(fields.next(), "y", line_num)?;
            let z = parse_coordinate(fields.next(), "z", line_num)?;

            system.add_atom(Atom::new(element, Point3::new(x, y, z)).with_label(label));
        }

        if system.atom_count() != expected {
            return Err(XyzError::AtomCountMismatch {
                expected,
                found: system.atom_count(),
            });
        }

        system.perceive_bonds(BOND_PERCEPTION_TOLERANCE);
        Ok((system, XyzMetadata { comment }))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", system.atom_count())?;
        writeln!(writer, "{}", metadata.comment.replace('\n', " "))?;
        for (_, atom) in system.atoms_iter() {
            writeln!(
                writer,
                "{:<4} {:>14.6} {:>14.6} {:>14.6}",
                atom.element.symbol(),
                atom.position.x,
                atom.position.y,
                atom.position.z
            )?;
        }
        Ok(())
    }
}
