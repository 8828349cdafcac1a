use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `CODEGRAPH_QUIET=1` (or `true`) silences progress bars and summaries
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("CODEGRAPH_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
