//! Guest placement onto host anchor sites.
//!
//! For every site the guest is moved so its attachment atom sits on the
//! anchor and its attachment axis points along the site normal. The guest
//! is then spun about that axis in ascending steps from 0°, and the first
//! torsion whose atoms all stay farther than `min_distance` from every
//! obstacle is accepted. Obstacles are the surviving host atoms (minus the
//! site's own leaving atoms) and the copies placed at earlier sites. The
//! attachment atom and the site's link atom are the one pair not screened
//! unless `screen_attachment` is set.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use nalgebra::{Rotation3, Unit, Vector3};
use serde::Serialize;

use super::error::Error;
use super::spatial::SpatialGrid;
use crate::model::structure::{Bond, Structure, StructureParts};

/// One place to attach a guest copy.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorSite {
    /// Target position of the guest attachment atom.
    pub anchor: [f64; 3],
    /// Outward direction the guest axis is aligned with.
    pub normal: [f64; 3],
    /// Host atoms deleted when the site is accepted.
    pub remove: Vec<usize>,
    /// Host atom bonded to the guest attachment atom on acceptance.
    pub link: Option<usize>,
}

impl AnchorSite {
    /// Site that swaps the terminal atom `leaving` for the guest: the anchor
    /// is `leaving`'s position, the normal runs from `base` to `leaving`, and
    /// the guest is bonded to `base`.
    pub fn replacing(host: &Structure, base: usize, leaving: usize) -> Result<Self, Error> {
        let atoms = host.atoms();
        let (Some(b), Some(l)) = (atoms.get(base), atoms.get(leaving)) else {
            return Err(Error::invalid_argument(
                "site",
                format!("atoms {base}/{leaving} are out of range ({} atoms)", atoms.len()),
            ));
        };
        if !(b.has_position() && l.has_position()) {
            return Err(Error::invalid_argument("site", "anchor atoms need coordinates"));
        }
        let normal = [0, 1, 2].map(|k| l.position[k] - b.position[k]);
        Ok(Self {
            anchor: l.position,
            normal,
            remove: vec![leaving],
            link: Some(base),
        })
    }
}

/// Guest atoms defining the attachment direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraftAxis {
    /// Guest atom placed on the anchor.
    pub attach: usize,
    /// Guest atom that ends up along the site normal from `attach`.
    pub toward: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraftParams {
    pub axis: GraftAxis,
    /// Collision threshold in Å; accepted placements keep every screened
    /// pair strictly farther apart.
    pub min_distance: f64,
    /// Torsion scan resolution in degrees.
    pub torsion_step_deg: f64,
    /// Also screen the attachment atom against the linked host atom. Off by
    /// default, since the two are meant to sit at bonding distance; every
    /// other pair is always screened.
    pub screen_attachment: bool,
}

impl GraftParams {
    pub fn new(axis: GraftAxis) -> Self {
        Self {
            axis,
            min_distance: 2.0,
            torsion_step_deg: 10.0,
            screen_attachment: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedSite {
    /// Index into the input site list.
    pub site: usize,
    pub torsion_deg: f64,
    /// `aid` of the copy's first atom in the output structure.
    pub first_aid: usize,
    pub mol_index: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraftReport {
    pub placed: Vec<PlacedSite>,
    /// Indices of sites where no torsion cleared the threshold.
    pub unplaced: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Grafted {
    pub structure: Structure,
    pub report: GraftReport,
}

/// Places one copy of `guest` per site in `sites`, in order.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for bad parameters, out-of-range atom
/// references, or guest/host atoms that lack the coordinates placement
/// needs.
pub fn graft(
    host: &Structure,
    guest: &Structure,
    sites: &[AnchorSite],
    params: &GraftParams,
) -> Result<Grafted, Error> {
    validate(host, guest, sites, params)?;

    let axis = params.axis;
    let origin = guest.atoms()[axis.attach].position;
    let local: Vec<Vector3<f64>> = guest
        .atoms()
        .iter()
        .map(|a| Vector3::from(a.position) - Vector3::from(origin))
        .collect();
    let guest_axis = local[axis.toward];

    let steps = (360.0 / params.torsion_step_deg).ceil() as usize;
    let angles: Vec<f64> = (0..steps)
        .map(|k| k as f64 * params.torsion_step_deg)
        .filter(|deg| *deg < 360.0)
        .collect();

    let mut removed = BTreeSet::new();
    let mut placed_positions: Vec<Vec<[f64; 3]>> = Vec::new();
    let mut report = GraftReport::default();

    for (index, site) in sites.iter().enumerate() {
        let normal = Unit::new_normalize(Vector3::from(site.normal));
        let align = align_rotation(&guest_axis, &normal);

        let exempt_link = site.link.filter(|_| !params.screen_attachment);
        let mut link_position = None;
        let mut obstacles = Vec::new();
        for atom in host.atoms() {
            let gone = removed.contains(&atom.aid) || site.remove.contains(&atom.aid);
            if gone || !atom.has_position() {
                continue;
            }
            if exempt_link == Some(atom.aid) {
                link_position = Some(atom.position);
            } else {
                obstacles.push(atom.position);
            }
        }
        obstacles.extend(placed_positions.iter().flatten().copied());
        let grid = SpatialGrid::from_positions(obstacles, params.min_distance);
        let link_grid =
            link_position.map(|p| SpatialGrid::from_positions(vec![p], params.min_distance));

        let anchor = Vector3::from(site.anchor);
        let accepted = angles.iter().find_map(|&deg| {
            let spin = Rotation3::from_axis_angle(&normal, deg.to_radians());
            let rotation = spin * align;
            let positions: Vec<[f64; 3]> = local
                .iter()
                .map(|v| {
                    let p = rotation * v + anchor;
                    [p.x, p.y, p.z]
                })
                .collect();
            let clash = grid.any_within(&positions, params.min_distance)
                || link_grid.as_ref().is_some_and(|link| {
                    let others: Vec<[f64; 3]> = positions
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != axis.attach)
                        .map(|(_, p)| *p)
                        .collect();
                    link.any_within(&others, params.min_distance)
                });
            (!clash).then_some((deg, positions))
        });

        match accepted {
            Some((deg, positions)) => {
                log::debug!("graft: site {index} placed at torsion {deg}°");
                removed.extend(site.remove.iter().copied());
                report.placed.push(PlacedSite {
                    site: index,
                    torsion_deg: deg,
                    first_aid: 0,
                    mol_index: 0,
                });
                placed_positions.push(positions);
            }
            None => {
                log::warn!("graft: site {index} unplaced, no torsion clears {} Å", params.min_distance);
                report.unplaced.push(index);
            }
        }
    }

    let structure = assemble(host, guest, sites, params, &removed, &placed_positions, &mut report)?;
    Ok(Grafted { structure, report })
}

fn assemble(
    host: &Structure,
    guest: &Structure,
    sites: &[AnchorSite],
    params: &GraftParams,
    removed: &BTreeSet<usize>,
    placed_positions: &[Vec<[f64; 3]>],
    report: &mut GraftReport,
) -> Result<Structure, Error> {
    // Host atoms whose bond list changes lose their raw MDF connections.
    let mut rewired: BTreeSet<usize> = report
        .placed
        .iter()
        .filter_map(|p| sites[p.site].link)
        .collect();
    for bond in host.bonds() {
        if removed.contains(&bond.a1) {
            rewired.insert(bond.a2);
        }
        if removed.contains(&bond.a2) {
            rewired.insert(bond.a1);
        }
    }

    let mut remap = vec![None; host.atom_count()];
    let mut atoms = Vec::with_capacity(
        host.atom_count() - removed.len() + guest.atom_count() * placed_positions.len(),
    );
    for atom in host.atoms() {
        if !removed.contains(&atom.aid) {
            remap[atom.aid] = Some(atoms.len());
            let mut kept = atom.clone();
            if rewired.contains(&atom.aid) {
                kept.extras.connections_raw = None;
            }
            atoms.push(kept);
        }
    }

    let mut bonds: Vec<Bond> = host
        .bonds()
        .iter()
        .filter_map(|b| {
            let (a1, a2) = (remap[b.a1]?, remap[b.a2]?);
            Some(Bond::periodic(a1, a2, b.order, b.image).with_source(b.source))
        })
        .collect();

    let base_index = host
        .atoms()
        .iter()
        .filter_map(|a| a.mol_index)
        .max()
        .unwrap_or(0);

    for (n, (placed, positions)) in report.placed.iter_mut().zip(placed_positions).enumerate() {
        let offset = atoms.len();
        let mol_index = base_index + 1 + n as i64;
        placed.first_aid = offset;
        placed.mol_index = mol_index;

        for (atom, &position) in guest.atoms().iter().zip(positions) {
            let mut copy = atom.clone();
            copy.position = position;
            copy.mol_index = Some(mol_index);
            copy.extras.connections_raw = None;
            atoms.push(copy);
        }
        bonds.extend(guest.bonds().iter().map(|b| {
            Bond::periodic(b.a1 + offset, b.a2 + offset, b.order, b.image).with_source(b.source)
        }));
        if let Some(link) = sites[placed.site].link.and_then(|l| remap[l]) {
            bonds.push(Bond::new(link, offset + params.axis.attach, 1.0));
        }
    }

    let has_table = host.has_bonds() || guest.has_bonds() || !bonds.is_empty();
    Ok(Structure::from_parts(StructureParts {
        atoms,
        bonds: has_table.then_some(bonds),
        cell: host.cell().clone(),
        provenance: host.provenance().clone(),
        preserved: host.preserved().clone(),
    })?)
}

/// Rotation taking `from` onto `to`; a half turn about a perpendicular axis
/// when the two are antiparallel.
fn align_rotation(from: &Vector3<f64>, to: &Unit<Vector3<f64>>) -> Rotation3<f64> {
    if let Some(rotation) = Rotation3::rotation_between(from, to.as_ref()) {
        return rotation;
    }
    let helper = if from.x.abs() < 0.9 * from.norm() {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let perpendicular = Unit::new_normalize(from.cross(&helper));
    Rotation3::from_axis_angle(&perpendicular, PI)
}

fn validate(
    host: &Structure,
    guest: &Structure,
    sites: &[AnchorSite],
    params: &GraftParams,
) -> Result<(), Error> {
    if !(params.min_distance.is_finite() && params.min_distance > 0.0) {
        return Err(Error::invalid_argument(
            "min_distance",
            format!("must be positive and finite (got {})", params.min_distance),
        ));
    }
    let step = params.torsion_step_deg;
    if !(step.is_finite() && step > 0.0 && step <= 360.0) {
        return Err(Error::invalid_argument(
            "torsion_step_deg",
            format!("must lie in (0, 360] (got {step})"),
        ));
    }

    let GraftAxis { attach, toward } = params.axis;
    let n_guest = guest.atom_count();
    if attach >= n_guest || toward >= n_guest || attach == toward {
        return Err(Error::invalid_argument(
            "axis",
            format!("attach {attach} and toward {toward} must be distinct guest atoms (guest has {n_guest})"),
        ));
    }
    if let Some(atom) = guest.atoms().iter().find(|a| !a.has_position()) {
        return Err(Error::invalid_argument(
            "guest",
            format!("guest atom {} has no coordinates", atom.aid),
        ));
    }
    let (a, t) = (guest.atoms()[attach].position, guest.atoms()[toward].position);
    if Vector3::from(t) - Vector3::from(a) == Vector3::zeros() {
        return Err(Error::invalid_argument("axis", "attach and toward atoms coincide"));
    }

    let n_host = host.atom_count();
    for (index, site) in sites.iter().enumerate() {
        let finite = |v: [f64; 3]| v.iter().all(|c| c.is_finite());
        if !finite(site.anchor) || !finite(site.normal) || site.normal == [0.0; 3] {
            return Err(Error::invalid_argument(
                "site",
                format!("site {index} needs a finite anchor and a non-zero normal"),
            ));
        }
        if let Some(&aid) = site.remove.iter().chain(site.link.iter()).find(|&&aid| aid >= n_host) {
            return Err(Error::invalid_argument(
                "site",
                format!("site {index} references host atom {aid} of {n_host}"),
            ));
        }
        if site.link.is_some_and(|l| site.remove.contains(&l)) {
            return Err(Error::invalid_argument(
                "site",
                format!("site {index} links to an atom it removes"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{atom::Atom, cell::Cell};

    fn assert_close(a: [f64; 3], b: [f64; 3]) {
        for k in 0..3 {
            assert!((a[k] - b[k]).abs() < 1e-9, "{a:?} vs {b:?}");
        }
    }

    fn methyl_host() -> Structure {
        let atoms = vec![
            Atom::new("HOST", 1, "C1").with_element("C").with_position([0.0, 0.0, 0.0]),
            Atom::new("HOST", 1, "H1").with_element("H").with_position([1.0, 0.0, 0.0]),
        ];
        Structure::new(atoms, Some(vec![Bond::new(0, 1, 1.0)]), Cell::none()).unwrap()
    }

    fn rod_guest() -> Structure {
        let atoms = vec![
            Atom::new("GST", 1, "X").with_element("C").with_position([0.0, 0.0, 0.0]),
            Atom::new("GST", 1, "Y").with_element("C").with_position([0.0, 0.0, 1.5]),
        ];
        Structure::new(atoms, Some(vec![Bond::new(0, 1, 1.0)]), Cell::none()).unwrap()
    }

    fn bent_guest() -> Structure {
        let atoms = vec![
            Atom::new("GST", 1, "X").with_position([0.0, 0.0, 0.0]),
            Atom::new("GST", 1, "Y").with_position([0.0, 0.0, 1.0]),
            Atom::new("GST", 1, "Z").with_position([1.0, 0.0, 1.0]),
        ];
        Structure::new(atoms, None, Cell::none()).unwrap()
    }

    fn params(min_distance: f64, step: f64) -> GraftParams {
        GraftParams {
            min_distance,
            torsion_step_deg: step,
            ..GraftParams::new(GraftAxis { attach: 0, toward: 1 })
        }
    }

    fn open_site() -> AnchorSite {
        AnchorSite {
            anchor: [0.0, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
            remove: Vec::new(),
            link: None,
        }
    }

    #[test]
    fn replaces_leaving_atom_and_links_base() {
        let host = methyl_host();
        let site = AnchorSite::replacing(&host, 0, 1).unwrap();
        let out = graft(&host, &rod_guest(), &[site], &params(1.0, 30.0)).unwrap();

        assert_eq!(out.report.unplaced, Vec::<usize>::new());
        assert_eq!(
            out.report.placed,
            [PlacedSite { site: 0, torsion_deg: 0.0, first_aid: 1, mol_index: 2 }]
        );

        let s = &out.structure;
        let names: Vec<_> = s.atoms().iter().map(|a| a.name.as_deref().unwrap()).collect();
        assert_eq!(names, ["C1", "X", "Y"]);
        assert_close(s.atoms()[1].position, [1.0, 0.0, 0.0]);
        assert_close(s.atoms()[2].position, [2.5, 0.0, 0.0]);
        assert_eq!(s.atoms()[2].mol_index, Some(2));

        let keys: Vec<_> = s.bonds().iter().map(|b| (b.a1, b.a2)).collect();
        assert_eq!(keys, [(1, 2), (0, 1)]);
    }

    #[test]
    fn first_clearing_torsion_wins() {
        let host = Structure::new(
            vec![Atom::new("HOST", 1, "B").with_position([1.0, 0.0, 1.0])],
            None,
            Cell::none(),
        )
        .unwrap();
        let out = graft(&host, &bent_guest(), &[open_site()], &params(0.9, 45.0)).unwrap();
        assert_eq!(out.report.placed.len(), 1);
        assert_eq!(out.report.placed[0].torsion_deg, 90.0);
        assert_close(out.structure.atoms()[3].position, [0.0, 1.0, 1.0]);
        assert!(!out.structure.has_bonds());
    }

    #[test]
    fn blocked_site_is_reported_unplaced() {
        let host = Structure::new(
            vec![
                Atom::new("HOST", 1, "B").with_position([0.0, 0.0, 1.2]),
                Atom::new("HOST", 1, "H").with_position([0.0, 0.0, 0.5]),
            ],
            None,
            Cell::none(),
        )
        .unwrap();
        let mut site = open_site();
        site.remove = vec![1];
        let out = graft(&host, &bent_guest(), &[site], &params(0.5, 90.0)).unwrap();
        assert_eq!(out.report.unplaced, [0]);
        assert!(out.report.placed.is_empty());
        assert_eq!(out.structure.atom_count(), 2);
    }

    #[test]
    fn later_sites_screen_against_earlier_copies() {
        let host = Structure::new(Vec::new(), None, Cell::none()).unwrap();
        let sites = [open_site(), open_site(), {
            let mut far = open_site();
            far.anchor = [10.0, 0.0, 0.0];
            far
        }];
        let out = graft(&host, &rod_guest(), &sites, &params(1.0, 90.0)).unwrap();
        assert_eq!(out.report.unplaced, [1]);
        let placed: Vec<_> = out.report.placed.iter().map(|p| (p.site, p.mol_index)).collect();
        assert_eq!(placed, [(0, 1), (2, 2)]);
        assert_eq!(out.structure.atom_count(), 4);
        assert_eq!(out.structure.bond_count(), 2);
    }

    #[test]
    fn attachment_atom_on_host_atom_is_unplaced() {
        let host = Structure::new(
            vec![Atom::new("HOST", 1, "B").with_position([0.0, 0.0, 0.0])],
            None,
            Cell::none(),
        )
        .unwrap();
        let out = graft(&host, &rod_guest(), &[open_site()], &params(1.0, 90.0)).unwrap();
        assert_eq!(out.report.unplaced, [0]);
        assert!(out.report.placed.is_empty());
    }

    #[test]
    fn only_the_link_pair_skips_screening() {
        let host = methyl_host();
        let mut site = AnchorSite::replacing(&host, 0, 1).unwrap();
        // Guest tail pointing back at the linked carbon must still clash
        site.normal = [-1.0, 0.0, 0.0];
        let out = graft(&host, &rod_guest(), &[site.clone()], &params(1.0, 90.0)).unwrap();
        assert_eq!(out.report.unplaced, [0]);

        let mut strict = params(1.0, 90.0);
        strict.screen_attachment = true;
        site.normal = [1.0, 0.0, 0.0];
        let out = graft(&host, &rod_guest(), &[site], &strict).unwrap();
        assert_eq!(out.report.unplaced, [0]);
    }

    #[test]
    fn rewired_host_atoms_drop_raw_connections() {
        let mut atoms = vec![
            Atom::new("HOST", 1, "C1").with_element("C").with_position([0.0, 0.0, 0.0]),
            Atom::new("HOST", 1, "H1").with_element("H").with_position([1.0, 0.0, 0.0]),
            Atom::new("HOST", 1, "H2").with_element("H").with_position([-0.5, 0.9, 0.0]),
        ];
        atoms[0].extras.connections_raw = Some("H1 H2".into());
        atoms[1].extras.connections_raw = Some("C1".into());
        atoms[2].extras.connections_raw = Some("C1".into());
        let bonds = vec![Bond::new(0, 1, 1.0), Bond::new(0, 2, 1.0)];
        let host = Structure::new(atoms, Some(bonds), Cell::none()).unwrap();

        let site = AnchorSite::replacing(&host, 0, 1).unwrap();
        let out = graft(&host, &rod_guest(), &[site], &params(1.0, 30.0)).unwrap();
        assert_eq!(out.report.placed.len(), 1);
        assert_eq!(out.structure.atoms()[0].extras.connections_raw, None);
        assert_eq!(out.structure.atoms()[1].extras.connections_raw.as_deref(), Some("C1"));

        let text = crate::io::mdf::serialize(&out.structure, true).unwrap();
        let c1 = text.lines().find(|l| l.starts_with("HOST_1:C1")).unwrap();
        assert!(!c1.contains(" H1"), "{c1}");
        assert!(c1.contains("GST_2:X"), "{c1}");
        let x = text.lines().find(|l| l.starts_with("GST_2:X")).unwrap();
        assert!(x.contains("HOST_1:C1"), "{x}");

        let back = crate::io::mdf::parse(&text).unwrap();
        assert_eq!(back.bond_count(), out.structure.bond_count());
    }

    #[test]
    fn antiparallel_axis_is_flipped() {
        let host = Structure::new(Vec::new(), None, Cell::none()).unwrap();
        let mut site = open_site();
        site.normal = [0.0, 0.0, -2.0];
        let out = graft(&host, &rod_guest(), &[site], &params(1.0, 90.0)).unwrap();
        assert_close(out.structure.atoms()[1].position, [0.0, 0.0, -1.5]);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let host = methyl_host();
        let guest = rod_guest();
        let site = AnchorSite::replacing(&host, 0, 1).unwrap();
        for bad in [params(0.0, 10.0), params(1.0, 0.0), params(1.0, 400.0)] {
            assert!(graft(&host, &guest, &[site.clone()], &bad).is_err());
        }
        let mut same = params(1.0, 10.0);
        same.axis.toward = 0;
        assert!(graft(&host, &guest, &[site.clone()], &same).is_err());

        let mut bad_site = site;
        bad_site.remove = vec![7];
        assert!(matches!(
            graft(&host, &guest, &[bad_site], &params(1.0, 10.0)),
            Err(Error::InvalidArgument { name: "site", .. })
        ));
        assert!(AnchorSite::replacing(&host, 0, 5).is_err());
    }
}
