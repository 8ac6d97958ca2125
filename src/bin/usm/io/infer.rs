use std::path::Path;

use usm::io::Format;

fn extension(path: &Path) -> Option<String> {
    Some(path.extension()?.to_str()?.to_lowercase())
}

pub fn input(path: &Path) -> Option<Format> {
    match extension(path)?.as_str() {
        "car" | "arc" => Some(Format::Car),
        "mdf" => Some(Format::Mdf),
        "pdb" | "ent" => Some(Format::Pdb),
        _ => None,
    }
}

pub fn output(path: &Path) -> Option<Format> {
    match extension(path)?.as_str() {
        "json" => Some(Format::Json),
        _ => input(path),
    }
}
