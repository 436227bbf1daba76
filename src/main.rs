#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::EnvFilter;

#[cfg(not(target_arch = "wasm32"))]
/// Log filter used when `RUST_LOG` is not set. wgpu is very chatty at info.
const DEFAULT_LOG_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn";

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    tracing_log::LogTracer::init().expect("failed to initialize LogTracer");

    let stdout_subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .finish();
    tracing::subscriber::set_global_default(stdout_subscriber)
        .expect("failed to install stdout global tracing subscriber");

    underwater::underwater_main();
}

// Web builds start from `wasm_main` in the library instead.
#[cfg(target_arch = "wasm32")]
fn main() {}
