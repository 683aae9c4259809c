/*! Integration tests for regsettings.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - settings: Reads, writes, delayed apply and recovery from damaged values
 * - watch: Change notification, watch sharing and the watch ceiling
 * - store: Native store persistence and external edits
 * - schema: Schema files and schema registries
 * - instance: Instance configuration and event delivery
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("regsettings=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod schema;
mod settings;
mod store;
mod watch;
