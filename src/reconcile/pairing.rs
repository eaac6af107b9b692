/// Repository paths of the variation files, sorted by file name.
pub fn variation_filenames(listing: Vec<String>, prefix: &str, experiment_name: &str) -> Vec<String> {
    let mut names = listing;
    names.sort();
    names
        .into_iter()
        .map(|n| format!("{}{}/{}", prefix, experiment_name, n))
        .collect()
}

/// Pair variation ids with filenames by position.
///
/// The shorter list bounds the result; extras on either side are dropped.
/// Nothing checks that the platform orders its variation ids the way the
/// files sort, so renaming a file can silently move content to another arm.
pub fn pair_variations<'a>(variation_ids: &[u64], filenames: &'a [String]) -> Vec<(u64, &'a str)> {
    variation_ids
        .iter()
        .copied()
        .zip(filenames.iter().map(String::as_str))
        .collect()
}
