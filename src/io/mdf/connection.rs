//! MDF connection tokens: `[LABEL_INDEX:]NAME[%ijk][#n][/order]`.
//!
//! `%ijk` is the periodic image of the partner as three signed single-digit
//! lattice shifts (`%0-10` is `(0, -1, 0)`). `#n` is accepted and ignored;
//! it only survives through the raw connection string.

use super::reader::parse_identity;
use crate::io::util;

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub mol_label: Option<String>,
    pub mol_index: Option<i64>,
    pub name: String,
    pub image: [i32; 3],
    pub order: f64,
}

impl Connection {
    pub fn parse(token: &str) -> Option<Self> {
        let (rest, order) = match token.split_once('/') {
            Some((rest, order)) => (rest, order.parse::<f64>().ok()?),
            None => (token, 1.0),
        };
        let rest = rest.split_once('#').map_or(rest, |(head, _)| head);
        let (target, image) = match rest.split_once('%') {
            Some((target, shift)) => (target, parse_shift(shift)?),
            None => (rest, [0, 0, 0]),
        };

        if target.contains(':') {
            let (label, index, name) = parse_identity(target)?;
            Some(Self {
                mol_label: Some(label),
                mol_index: Some(index),
                name,
                image,
                order,
            })
        } else if target.is_empty() {
            None
        } else {
            Some(Self {
                mol_label: None,
                mol_index: None,
                name: target.to_string(),
                image,
                order,
            })
        }
    }

    /// Renders the token. The residue prefix is omitted when the partner sits
    /// in the owner's residue (`mol_label`/`mol_index` both `None`).
    pub fn render(&self) -> String {
        let mut out = match (&self.mol_label, self.mol_index) {
            (Some(label), Some(index)) => format!("{label}_{index}:{}", self.name),
            _ => self.name.clone(),
        };
        if self.image != [0, 0, 0] {
            out.push('%');
            for v in self.image {
                out.push_str(&v.to_string());
            }
        }
        if self.order != 1.0 {
            out.push('/');
            out.push_str(&util::format_order(self.order));
        }
        out
    }
}

fn parse_shift(text: &str) -> Option<[i32; 3]> {
    let mut out = [0i32; 3];
    let mut chars = text.chars();
    for slot in &mut out {
        let mut c = chars.next()?;
        let negative = c == '-';
        if negative || c == '+' {
            c = chars.next()?;
        }
        let digit = c.to_digit(10)? as i32;
        *slot = if negative { -digit } else { digit };
    }
    chars.next().is_none().then_some(out)
}
