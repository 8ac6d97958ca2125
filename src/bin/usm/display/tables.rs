use std::collections::BTreeMap;
use std::io::{self, Write};

use usm::{ComposeReport, GraftReport, Structure, SupercellReport, TermSet};

use crate::util::text::truncate;

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();
const MAX_ROWS: usize = 15;

pub fn print_structure_info(structure: &Structure) {
    let cell = structure.cell();
    let periodic_bonds = structure.bonds().iter().filter(|b| b.is_periodic()).count();

    let mut rows = vec![
        ("Atoms", structure.atom_count().to_string()),
        (
            "Bonds",
            if structure.has_bonds() {
                structure.bond_count().to_string()
            } else {
                "none".to_string()
            },
        ),
        ("Periodic Bonds", periodic_bonds.to_string()),
        ("Molecules", structure.molecules().len().to_string()),
    ];

    if cell.pbc {
        rows.push((
            "Cell (Å)",
            format!("{:.3} × {:.3} × {:.3}", cell.a, cell.b, cell.c),
        ));
        rows.push((
            "Angles (α β γ)",
            format!("{:.2}° {:.2}° {:.2}°", cell.alpha, cell.beta, cell.gamma),
        ));
        if let Some(sg) = &cell.spacegroup {
            rows.push(("Space Group", sg.clone()));
        }
    } else {
        rows.push(("Cell", "non-periodic".to_string()));
    }

    print_kv_table(&mut io::stderr().lock(), "Structure Summary", &rows);
}

/// Atom types by frequency, falling back to elements for untyped input.
pub fn print_type_distribution(structure: &Structure) {
    let typed = structure.atoms().iter().any(|a| a.atom_type.is_some());
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for atom in structure.atoms() {
        let label = if typed {
            atom.atom_type.as_deref()
        } else {
            atom.element.as_deref()
        };
        *counts.entry(label.unwrap_or("?")).or_insert(0) += 1;
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let title = if typed {
        "Atom Type Distribution"
    } else {
        "Element Distribution"
    };
    print_distribution_table(
        &mut io::stderr().lock(),
        title,
        &sorted,
        structure.atom_count(),
    );
}

pub fn print_compose_report(report: &ComposeReport) {
    let rows = [
        ("Matched", report.matched_count.to_string()),
        ("Coordinates Only", report.left_only_count.to_string()),
        ("Topology Only", report.right_only_count.to_string()),
        ("Dropped Bonds", report.dropped_bonds.to_string()),
        ("Coverage", format!("{:.1}%", report.coverage() * 100.0)),
    ];
    print_kv_table(&mut io::stderr().lock(), "Composition", &rows);
}

pub fn print_supercell_report(report: &SupercellReport) {
    let rows = [
        ("Atoms", report.n_atoms.to_string()),
        ("Bonds", report.n_bonds.to_string()),
        ("Periodic Bonds", report.n_periodic_bonds.to_string()),
        ("Components", report.n_connected_components.to_string()),
    ];
    print_kv_table(&mut io::stderr().lock(), "Supercell Connectivity", &rows);
}

pub fn print_termset_summary(terms: &TermSet) {
    let rows = [
        ("Atom Types", terms.atom_types.len().to_string()),
        ("Bond Types", terms.bond_types.len().to_string()),
        ("Angle Types", terms.angle_types.len().to_string()),
        ("Dihedral Types", terms.dihedral_types.len().to_string()),
        ("Improper Types", terms.improper_types.len().to_string()),
    ];
    print_kv_table(&mut io::stderr().lock(), "Term Set", &rows);
}

pub fn print_graft_report(report: &GraftReport) {
    let mut rows: Vec<(&str, String)> = vec![
        ("Placed", report.placed.len().to_string()),
        ("Unplaced", report.unplaced.len().to_string()),
    ];
    if !report.unplaced.is_empty() {
        let sites = report
            .unplaced
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        rows.push(("Unplaced Sites", sites));
    }
    print_kv_table(&mut io::stderr().lock(), "Graft", &rows);
}

fn print_distribution_table(
    out: &mut impl Write,
    title: &str,
    data: &[(String, usize)],
    total: usize,
) {
    let name_w = 10usize;
    let count_w = 8usize;
    let sep_overhead = 6;
    let dist_w = SAFE_TABLE_WIDTH.saturating_sub(name_w + count_w + sep_overhead);
    let max_bar_width = dist_w.saturating_sub(8).min(20);

    let rule = |l: &str, m: &str, r: &str| {
        format!(
            "{INDENT}{l}{}{m}{}{m}{}{r}",
            "─".repeat(name_w + 2),
            "─".repeat(count_w + 2),
            "─".repeat(dist_w + 2)
        )
    };

    let _ = writeln!(
        out,
        "{INDENT}┌─ {} ─┐",
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(out, "{}", rule("┌", "┬", "┐"));
    let _ = writeln!(
        out,
        "{INDENT}│ {:<name_w$} │ {:>count_w$} │ {:<dist_w$} │",
        "Type", "Count", "Distribution"
    );
    let _ = writeln!(out, "{}", rule("├", "┼", "┤"));

    for (name, count) in data.iter().take(MAX_ROWS) {
        let pct = if total == 0 {
            0.0
        } else {
            (*count as f64 / total as f64) * 100.0
        };
        let dist_cell = format!("{}  {:>5.1}%", make_bar(pct, max_bar_width), pct);
        let _ = writeln!(
            out,
            "{INDENT}│ {:<name_w$} │ {:>count_w$} │ {:<dist_w$} │",
            truncate(name, name_w),
            count,
            dist_cell
        );
    }

    if data.len() > MAX_ROWS {
        let _ = writeln!(
            out,
            "{INDENT}│ {:<name_w$} │ {:>count_w$} │ {:<dist_w$} │",
            "...",
            "...",
            format!("({} more types)", data.len() - MAX_ROWS)
        );
    }

    let _ = writeln!(out, "{}", rule("└", "┴", "┘"));
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 16usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);

    let rule = |l: &str, m: &str, r: &str| {
        format!(
            "{INDENT}{l}{}{m}{}{r}",
            "─".repeat(key_w + 2),
            "─".repeat(val_w + 2)
        )
    };

    let _ = writeln!(
        out,
        "{INDENT}┌─ {} ─┐",
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(out, "{}", rule("┌", "┬", "┐"));
    let _ = writeln!(
        out,
        "{INDENT}│ {:<key_w$} │ {:>val_w$} │",
        "Metric", "Value"
    );
    let _ = writeln!(out, "{}", rule("├", "┼", "┤"));

    for (key, val) in rows {
        let _ = writeln!(
            out,
            "{INDENT}│ {:<key_w$} │ {:>val_w$} │",
            truncate(key, key_w),
            truncate(val, val_w)
        );
    }

    let _ = writeln!(out, "{}", rule("└", "┴", "┘"));
}

fn make_bar(pct: f64, max_width: usize) -> String {
    let filled = (((pct / 100.0) * max_width as f64).round() as usize).min(max_width);
    let empty = max_width - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}
