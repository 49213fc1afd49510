pub mod btree;
pub mod config;
pub mod error;

/// Install an `env_logger` with a timestamp/level/file:line format,
/// reading filters from `RUST_LOG`. Safe to call more than once —
/// callers guard it with a `std::sync::Once`.
pub fn init_log() {
    use env_logger::Builder;
    use std::io::Write;

    let mut builder = Builder::from_default_env();

    let _ = builder
        .format_timestamp_secs()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} - {}] [{}:{}] {}",
                record.level(),
                record.target(),
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init();
}
