//! Positional argument contract between the bridge and a script.

use std::path::Path;

/// Builds `<code_file> <additional...> <input> <output> <suppl...>`.
///
/// `additional` is split on whitespace and passed through otherwise
/// untouched; quoting is not interpreted.
pub fn build_arguments<P: AsRef<Path>>(
    code_file: &Path,
    additional: &str,
    input: &Path,
    output: &Path,
    suppl: &[P],
) -> Vec<String> {
    let mut args = Vec::with_capacity(3 + suppl.len());
    args.push(lossy(code_file));
    args.extend(additional.split_whitespace().map(str::to_string));
    args.push(lossy(input));
    args.push(lossy(output));
    args.extend(suppl.iter().map(|p| lossy(p.as_ref())));
    args
}

fn lossy(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}
