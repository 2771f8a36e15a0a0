use medbills_server::{build_app, config::Config, init_tracing, serve, state::State};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };
    info!(?config, "Configuration loaded");

    // Blocking HTTP clients are built before the runtime exists.
    let state = State::new(build_app(&config)?);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(serve(state.clone(), config.port));

    // The runtime goes first so the last reference to the blocking clients
    // is released on this thread.
    drop(runtime);
    drop(state);
    result
}
