//! Retrieval result formatting.

use juno_types::index::RankedResult;

/// Separator placed between formatted results.
pub const RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// Render ranked results as one context block for a prompt or tool result.
///
/// Results keep their input order. No results yields an empty string.
pub fn format_results(results: &[RankedResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "filePath: {}\nlanguage: {}\ncontent:\n{}",
                r.metadata.file_path, r.metadata.language_id, r.metadata.text
            )
        })
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}
