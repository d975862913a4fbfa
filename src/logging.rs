//! Logging configuration for the Vesper midend.
//!
//! The midend narrates its work on two channels: the transform modules
//! (`ir::inlining`, `ir::validation`) log per-site and per-block detail,
//! while the rest of the crate only warns. [`Verbosity`] picks how deep
//! the transform narration goes; `RUST_LOG` can always override it with
//! ordinary `env_logger` directives, e.g.
//! `RUST_LOG=vesper_compiler::ir::inlining=trace`.
//!
//! Level conventions inside the crate:
//!
//! - `warn!`  - suspicious IR shapes that were recovered from
//! - `debug!` - one line per call site (inlining decisions, splits)
//! - `trace!` - per-block and per-instruction cloning detail

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Module paths that narrate transformations. These ride above the
/// crate-wide warn floor so raising [`Verbosity`] does not drown the
/// output in unrelated chatter.
const TRANSFORM_TARGETS: &[&str] = &[
    "vesper_compiler::ir::inlining",
    "vesper_compiler::ir::validation",
];

/// How much of the midend's work gets narrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings only
    Quiet,
    /// One line per pass over a function
    Passes,
    /// Per-call-site decisions
    Sites,
    /// Per-block and per-instruction detail
    Instructions,
}

impl Verbosity {
    fn transform_level(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Warn,
            Verbosity::Passes => LevelFilter::Info,
            Verbosity::Sites => LevelFilter::Debug,
            Verbosity::Instructions => LevelFilter::Trace,
        }
    }
}

/// Initialize with warnings only.
///
/// This only initializes once; subsequent calls are no-ops.
pub fn init() {
    init_with_verbosity(Verbosity::Quiet);
}

/// Initialize, narrating the transform modules at `verbosity` while the
/// rest of the crate stays at warnings.
///
/// This only initializes once; subsequent calls are no-ops.
pub fn init_with_verbosity(verbosity: Verbosity) {
    INIT.call_once(|| {
        configured(verbosity).init();
    });
}

/// Initialize from the RUST_LOG environment variable, falling back to
/// [`Verbosity::Quiet`] when it is unset.
pub fn init_from_env() {
    INIT.call_once(|| {
        if std::env::var_os("RUST_LOG").is_some() {
            Builder::from_env(env_logger::Env::default()).init();
        } else {
            configured(Verbosity::Quiet).init();
        }
    });
}

/// Initialize logging for tests.
///
/// Quiet unless RUST_LOG says otherwise, and safe to call from every test.
pub fn init_test() {
    let _ = Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

fn configured(verbosity: Verbosity) -> Builder {
    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Warn);
    for target in TRANSFORM_TARGETS {
        builder.filter_module(target, verbosity.transform_level());
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{:>5} [{}] {}",
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder
}
