use std::sync::Arc;

use prosthetic_platform_mock::MockHost;
use rstest::fixture;

/// rstest fixture: fresh mock host with an empty scene at time zero
#[fixture]
pub fn host() -> Arc<MockHost> {
    Arc::new(MockHost::new())
}
