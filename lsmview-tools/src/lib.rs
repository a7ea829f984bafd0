use getopts::Options;
use lsmview::ws::util;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter directives.
pub static LOG_FILTER_ENV: &str = "LSMVIEW_LOG";

pub fn lsm_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt(
        "H",
        "host",
        &format!(
            "engine address or ws:// / wss:// URL (default $LSMVIEW_HOST or {})",
            util::DEFAULT_HOST
        ),
        "addr",
    );
    opts.optopt(
        "",
        "log-file",
        &format!("append logs to this file, filtered by ${}", LOG_FILTER_ENV),
        "path",
    );
    opts
}

/// Parse `args` (program name first) and resolve the event socket URL.
pub fn lsm_parseopts(
    opts: &Options,
    args: &[String],
) -> Result<(getopts::Matches, String), getopts::Fail> {
    let matches = opts.parse(args.iter().skip(1))?;
    let host = matches.opt_str("host").unwrap_or_else(util::default_host);
    Ok((matches, util::endpoint_url(&host)))
}

/// Send `tracing` output to `path`. The terminal belongs to the UI, so there
/// is no console logging at all.
pub fn init_logging(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn host_option_sets_endpoint() {
        let argv = args(&["lsm-monitor", "-H", "db:9000"]);
        let (_, url) = lsm_parseopts(&lsm_opts(), &argv).unwrap();
        assert_eq!(url, "ws://db:9000/ws");

        let argv = args(&["lsm-monitor", "--host", "wss://db.example"]);
        let (_, url) = lsm_parseopts(&lsm_opts(), &argv).unwrap();
        assert_eq!(url, "wss://db.example/ws");
    }

    #[test]
    fn unknown_option_fails() {
        assert!(lsm_parseopts(&lsm_opts(), &args(&["lsm-monitor", "--bogus"])).is_err());
    }
}
