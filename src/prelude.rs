pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, warn};

pub use crate::config::{self, Config};
pub use crate::felicity::{
    self,
    client::{Client, Endpoint, TelemetrySource, TransportSettings},
    record::{FieldValue, TelemetryRecord},
};
pub use crate::options::Options;
pub use crate::poller::{PollOutcome, Poller, Reading};
